//! Tool invocation bridge.
//!
//! Sits between the orchestrator and the tool host: parses the raw argument
//! payload the model produced, delegates to the host, and normalizes whatever
//! comes back into a single text payload for the conversation history.
//!
//! Nothing here fails toward the caller. Parse errors and host failures are
//! folded into [`ToolOutput::Failure`] so the model can see them and adapt.

use serde_json::{Map, Value};
use std::future::Future;

/// Normalized outcome of one tool invocation.
///
/// Produced before anything reaches history construction, so downstream code
/// matches exhaustively instead of probing the payload shape.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// A list of content items from the tool host.
    Items(Vec<mcp::Content>),
    /// A single structured value.
    Value(Value),
    /// The invocation failed; the message is surfaced to the model in-band.
    Failure(String),
}

impl ToolOutput {
    /// Render to the text payload stored in the history.
    ///
    /// Items are joined with newlines, text items verbatim and anything else
    /// through its JSON form. A scalar is stringified, a failure passes its
    /// message through unchanged.
    pub fn render(&self) -> String {
        match self {
            Self::Items(items) => items
                .iter()
                .map(item_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Value(Value::String(s)) => s.clone(),
            Self::Value(value) => value.to_string(),
            Self::Failure(message) => message.clone(),
        }
    }

    /// Whether this is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Failure from a tool-host error.
    pub fn host_failure(error: impl std::fmt::Display) -> Self {
        Self::Failure(format!("Error calling tool: {error}"))
    }
}

fn item_text(item: &mcp::Content) -> String {
    match item {
        mcp::Content::Text { text } => text.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Trait for tool execution hosts.
///
/// This is the boundary between the conversation loop and side effects.
/// Implementations report their own failures as [`ToolOutput::Failure`]
/// rather than erroring, so one bad call never aborts a batch.
pub trait ToolHost: Send + Sync {
    /// Invoke a named tool with parsed arguments.
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = ToolOutput> + Send;
}

/// Resolve one tool call: parse the raw arguments, then delegate to the host.
///
/// On parse failure the host is not called at all; the error is reported
/// in-band as this request's result so the model can retry with corrected
/// arguments.
pub async fn invoke(host: &impl ToolHost, name: &str, raw_arguments: &str) -> ToolOutput {
    match serde_json::from_str::<Map<String, Value>>(raw_arguments) {
        Ok(arguments) => host.call_tool(name, arguments).await,
        Err(e) => ToolOutput::Failure(format!("Error parsing tool arguments: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Host that records calls and answers with a fixed output.
    struct RecordingHost {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
        output: ToolOutput,
    }

    impl RecordingHost {
        fn new(output: ToolOutput) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                output,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ToolHost for RecordingHost {
        async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolOutput {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments));
            self.output.clone()
        }
    }

    fn text(s: &str) -> mcp::Content {
        mcp::Content::Text {
            text: s.to_string(),
        }
    }

    #[test]
    fn render_joins_items_with_newlines() {
        let output = ToolOutput::Items(vec![text("a"), text("b"), text("c")]);
        assert_eq!(output.render(), "a\nb\nc");
    }

    #[test]
    fn render_falls_back_for_non_text_items() {
        let output = ToolOutput::Items(vec![
            text("caption"),
            mcp::Content::Image {
                data: "aGk=".to_string(),
                mime_type: "image/png".to_string(),
            },
        ]);
        let rendered = output.render();
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("caption"));
        assert!(lines.next().unwrap().contains("image"));
    }

    #[test]
    fn render_stringifies_scalars() {
        assert_eq!(ToolOutput::Value(json!(5)).render(), "5");
        assert_eq!(ToolOutput::Value(json!("plain")).render(), "plain");
        assert_eq!(
            ToolOutput::Value(json!({"count": 2})).render(),
            r#"{"count":2}"#
        );
    }

    #[test]
    fn render_passes_failure_through() {
        let output = ToolOutput::host_failure("server exited unexpectedly");
        assert_eq!(
            output.render(),
            "Error calling tool: server exited unexpectedly"
        );
    }

    #[tokio::test]
    async fn invoke_parses_and_delegates() {
        let host = RecordingHost::new(ToolOutput::Items(vec![text("hit")]));
        let output = invoke(&host, "search_papers", r#"{"topic": "transformers"}"#).await;

        assert!(!output.is_failure());
        let calls = host.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "search_papers");
        assert_eq!(calls[0].1["topic"], "transformers");
    }

    #[tokio::test]
    async fn invoke_reports_parse_errors_without_calling_host() {
        let host = RecordingHost::new(ToolOutput::Items(Vec::new()));
        let output = invoke(&host, "search_papers", "{not json").await;

        assert!(output.is_failure());
        assert!(output.render().starts_with("Error parsing tool arguments:"));
        assert_eq!(host.call_count(), 0);
    }

    #[tokio::test]
    async fn invoke_rejects_non_object_arguments() {
        let host = RecordingHost::new(ToolOutput::Items(Vec::new()));
        let output = invoke(&host, "search_papers", "[1, 2]").await;

        assert!(output.is_failure());
        assert_eq!(host.call_count(), 0);
    }
}
