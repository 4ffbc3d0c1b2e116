use std::fmt;

/// Request-scoped logger handed to action handlers.
///
/// Obtained from [`ActionContext::log`](crate::ActionContext::log). Every
/// event carries the request id and action id as structured fields, so
/// handlers never have to thread them through by hand.
///
/// Request credentials are [`Secret`](crate::Secret)s and print as
/// `[REDACTED]` even if a handler formats them here.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
    action: &'a str,
}

impl<'a> RequestLog<'a> {
    pub(crate) fn new(request_id: &'a str, action: &'a str) -> Self {
        Self { request_id, action }
    }

    /// Returns the request id stamped on every event.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Returns the action id stamped on every event.
    pub fn action(&self) -> &str {
        self.action
    }

    /// Logs an info-level message.
    ///
    /// ```no_run
    /// # use action_pipeline::RequestLog;
    /// # fn example(log: &RequestLog, hostid: u64) {
    /// log.info(format_args!("loading host {hostid}"));
    /// # }
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, action = %self.action, "{}", args);
    }

    /// Logs a warning-level message.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, action = %self.action, "{}", args);
    }

    /// Logs an error-level message.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, action = %self.action, "{}", args);
    }

    /// Logs a debug-level message.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, action = %self.action, "{}", args);
    }
}
