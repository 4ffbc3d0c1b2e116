//! Response rendering.
//!
//! Turning a [`ResponsePayload`] into bytes (HTML, JSON, ...) is the host's
//! job; [`JsonRenderer`] is the reference implementation.

use crate::response::ResponsePayload;

/// Error from a renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The payload could not be serialised
    #[error("failed to serialise payload: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A view template failed
    #[error("view failed: {0}")]
    View(String),
}

/// Renders a payload into a response body.
pub trait Renderer: Send + Sync {
    /// Renders `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the payload cannot be rendered.
    fn render(&self, payload: &ResponsePayload) -> Result<Vec<u8>, RenderError>;

    /// MIME type of the rendered body.
    fn content_type(&self) -> &'static str {
        "text/html; charset=UTF-8"
    }
}

/// Renders payloads as JSON.
///
/// # Examples
///
/// ```
/// use action_pipeline::{JsonRenderer, Renderer, ResponsePayload};
///
/// let body = JsonRenderer::new()
///     .render(&ResponsePayload::new().title("X").with("n", 1))
///     .unwrap();
///
/// assert_eq!(body, br#"{"title":"X","data":{"n":1}}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Creates a compact JSON renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pretty-printing JSON renderer.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, payload: &ResponsePayload) -> Result<Vec<u8>, RenderError> {
        let body = if self.pretty {
            serde_json::to_vec_pretty(payload)?
        } else {
            serde_json::to_vec(payload)?
        };
        Ok(body)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
