use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Data produced by an action handler for the renderer.
///
/// Fields keep the order in which they were added, so rendered output is
/// stable.
///
/// # Examples
///
/// ```
/// use action_pipeline::ResponsePayload;
/// use serde_json::json;
///
/// let payload = ResponsePayload::new()
///     .title("Hosts")
///     .with("hosts", json!([{"hostid": "10084", "name": "web01"}]))
///     .with("page", 1);
///
/// assert_eq!(payload.title_str(), Some("Hosts"));
/// assert_eq!(payload.get("page"), Some(&json!(1)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponsePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    data: IndexMap<String, Value>,
}

impl ResponsePayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds a data field, replacing any previous value under `key` in place.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Returns the title.
    pub fn title_str(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns one data field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns all data fields in insertion order.
    pub fn data(&self) -> &IndexMap<String, Value> {
        &self.data
    }

    /// Builds the fixed error shape used for every terminal failure:
    /// `{"error": {"title": .., "messages": [..]}}`.
    pub(crate) fn error<I, S>(title: &str, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages: Vec<Value> = messages.into_iter().map(|m| Value::String(m.into())).collect();
        let mut error = serde_json::Map::new();
        error.insert("title".to_string(), Value::String(title.to_string()));
        error.insert("messages".to_string(), Value::Array(messages));

        Self::new().title(title).with("error", Value::Object(error))
    }
}
