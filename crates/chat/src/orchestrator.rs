//! Conversation orchestrator.
//!
//! Drives the request/response/tool-call cycle for one query: send the
//! history plus the tool catalog to the model, resolve any tool calls it
//! requests through the bridge, append the results, and resubmit, until the
//! model produces a final text answer or the round cap is hit.

use std::collections::HashSet;

use crate::bridge::{self, ToolHost, ToolOutput};
use crate::catalog::ToolCatalog;
use crate::model::{Backend, Message, ModelError, ModelRequest, ToolCall};

/// Hard cap on model rounds per query.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Final disposition of one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The model produced a final text answer.
    Answer(String),
    /// The model finished without text or tool calls.
    NoContent,
    /// The round cap was reached before a final answer.
    Exhausted,
}

/// Progress events emitted while a query resolves.
///
/// Display-only: consumers render them but must never feed them back into
/// control flow.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    /// The history is about to go to the model. Rounds are 1-based.
    ModelTurn { round: usize },
    /// Intermediate assistant text accompanying tool calls.
    AssistantText { text: String },
    /// A tool call is about to be resolved.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// A tool call was resolved.
    ToolResult {
        id: String,
        content: String,
        failed: bool,
    },
}

/// The conversation orchestrator.
pub struct Orchestrator {
    max_rounds: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the round cap.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Resolve one query.
    ///
    /// History is scoped to this call and seeded with the query alone;
    /// queries do not share context. Hitting the round cap is not an error,
    /// it simply yields [`Outcome::Exhausted`].
    pub async fn run<B, H>(
        &self,
        backend: &B,
        host: &H,
        catalog: &ToolCatalog,
        query: &str,
        trace: &mut dyn FnMut(TraceEvent),
    ) -> Result<Outcome, ModelError>
    where
        B: Backend,
        H: ToolHost,
    {
        let mut history = vec![Message::user(query)];

        for round in 1..=self.max_rounds {
            trace(TraceEvent::ModelTurn { round });
            tracing::debug!(round, messages = history.len(), "requesting model turn");

            let response = backend
                .call(ModelRequest {
                    messages: &history,
                    tools: catalog.specs(),
                })
                .await?;

            let message = response.message;
            if message.tool_calls().is_empty() {
                return Ok(match message.text() {
                    Some(text) if !text.is_empty() => Outcome::Answer(text.to_string()),
                    _ => Outcome::NoContent,
                });
            }

            if let Some(text) = message.text()
                && !text.is_empty()
            {
                trace(TraceEvent::AssistantText {
                    text: text.to_string(),
                });
            }

            let calls: Vec<ToolCall> = message.tool_calls().to_vec();
            history.push(message);

            // One result per request, appended in request order. A failure
            // for one request never aborts the rest of the batch.
            let mut seen = HashSet::new();
            for call in calls {
                trace(TraceEvent::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                });

                let output = self.resolve(host, catalog, &call, &mut seen).await;
                let content = output.render();

                trace(TraceEvent::ToolResult {
                    id: call.id.clone(),
                    content: content.clone(),
                    failed: output.is_failure(),
                });
                history.push(Message::tool_result(call.id, content));
            }
        }

        tracing::debug!(
            max_rounds = self.max_rounds,
            "round cap reached without a final answer"
        );
        Ok(Outcome::Exhausted)
    }

    /// Resolve a single call, vetting it against the catalog and the batch
    /// before it reaches the host.
    async fn resolve<H: ToolHost>(
        &self,
        host: &H,
        catalog: &ToolCatalog,
        call: &ToolCall,
        seen: &mut HashSet<String>,
    ) -> ToolOutput {
        if !seen.insert(call.id.clone()) {
            return ToolOutput::Failure(format!(
                "Error calling tool: duplicate tool call id '{}' in one batch",
                call.id
            ));
        }
        if !catalog.contains(&call.name) {
            return ToolOutput::Failure(format!(
                "Error calling tool: unknown tool '{}'",
                call.name
            ));
        }
        bridge::invoke(host, &call.name, &call.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelResponse, Usage};
    use serde_json::{Map, Value, json};
    use std::sync::Mutex;

    /// Backend that replays a script of canned assistant messages and
    /// records every request it sees.
    struct ScriptedBackend {
        script: Mutex<Vec<Message>>,
        requests: Mutex<Vec<usize>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Message>) -> Self {
            Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// History lengths observed per request.
        fn request_sizes(&self) -> Vec<usize> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Backend for ScriptedBackend {
        async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
            self.requests.lock().unwrap().push(request.messages.len());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                // Keep requesting tools forever (exhaustion scenarios).
                return Ok(ModelResponse {
                    message: Message::Assistant {
                        content: None,
                        tool_calls: vec![ToolCall {
                            id: format!("loop-{}", self.request_sizes().len()),
                            name: "search_papers".into(),
                            arguments: "{}".into(),
                        }],
                    },
                    usage: Usage::default(),
                });
            }
            Ok(ModelResponse {
                message: script.remove(0),
                usage: Usage::default(),
            })
        }
    }

    /// Host answering every call with a fixed item list.
    struct ScriptedHost {
        items: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedHost {
        fn new(items: &[&str]) -> Self {
            Self {
                items: items.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn called_tools(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ToolHost for ScriptedHost {
        async fn call_tool(&self, name: &str, _arguments: Map<String, Value>) -> ToolOutput {
            self.calls.lock().unwrap().push(name.to_string());
            ToolOutput::Items(
                self.items
                    .iter()
                    .map(|text| mcp::Content::Text { text: text.clone() })
                    .collect(),
            )
        }
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::new(vec![mcp::Tool {
            name: "search_papers".into(),
            description: Some("Search arXiv".into()),
            input_schema: json!({"type": "object"}),
        }])
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    fn assistant_with_calls(calls: Vec<ToolCall>) -> Message {
        Message::Assistant {
            content: None,
            tool_calls: calls,
        }
    }

    fn ignore_events() -> impl FnMut(TraceEvent) {
        |_| {}
    }

    #[tokio::test]
    async fn text_only_response_finishes_in_one_round() {
        let backend = ScriptedBackend::new(vec![Message::assistant("Here you go")]);
        let host = ScriptedHost::new(&[]);
        let mut sink = ignore_events();

        let outcome = Orchestrator::new()
            .run(&backend, &host, &catalog(), "hello", &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Answer("Here you go".into()));
        assert_eq!(backend.request_sizes(), vec![1]);
        assert!(host.called_tools().is_empty());
    }

    #[tokio::test]
    async fn empty_response_reports_no_content() {
        let backend = ScriptedBackend::new(vec![Message::Assistant {
            content: None,
            tool_calls: Vec::new(),
        }]);
        let host = ScriptedHost::new(&[]);
        let mut sink = ignore_events();

        let outcome = Orchestrator::new()
            .run(&backend, &host, &catalog(), "hello", &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoContent);
    }

    #[tokio::test]
    async fn tool_batch_grows_history_by_one_plus_k() {
        let backend = ScriptedBackend::new(vec![
            assistant_with_calls(vec![
                tool_call("a", "search_papers", "{}"),
                tool_call("b", "search_papers", "{}"),
                tool_call("c", "search_papers", "{}"),
            ]),
            Message::assistant("done"),
        ]);
        let host = ScriptedHost::new(&["r"]);
        let mut events = Vec::new();

        let outcome = Orchestrator::new()
            .run(&backend, &host, &catalog(), "q", &mut |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Answer("done".into()));
        // Round 1 sees the seed query; round 2 sees 1 (user) + 1 (assistant)
        // + 3 (tool results).
        assert_eq!(backend.request_sizes(), vec![1, 5]);

        // Results came back in request order with matching ids.
        let result_ids: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::ToolResult { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(result_ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn malformed_arguments_fail_only_their_request() {
        let backend = ScriptedBackend::new(vec![
            assistant_with_calls(vec![
                tool_call("a", "search_papers", "{}"),
                tool_call("b", "search_papers", "{broken"),
                tool_call("c", "search_papers", "{}"),
            ]),
            Message::assistant("done"),
        ]);
        let host = ScriptedHost::new(&["r"]);
        let mut events = Vec::new();

        Orchestrator::new()
            .run(&backend, &host, &catalog(), "q", &mut |e| events.push(e))
            .await
            .unwrap();

        // The two well-formed requests still reached the host.
        assert_eq!(host.called_tools().len(), 2);

        let failures: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::ToolResult { id, failed: true, content } => {
                    Some((id.clone(), content.clone()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "b");
        assert!(failures[0].1.starts_with("Error parsing tool arguments:"));
    }

    #[tokio::test]
    async fn unknown_tool_and_duplicate_id_fail_in_band() {
        let backend = ScriptedBackend::new(vec![
            assistant_with_calls(vec![
                tool_call("a", "search_papers", "{}"),
                tool_call("a", "search_papers", "{}"),
                tool_call("b", "delete_everything", "{}"),
            ]),
            Message::assistant("done"),
        ]);
        let host = ScriptedHost::new(&["r"]);
        let mut events = Vec::new();

        let outcome = Orchestrator::new()
            .run(&backend, &host, &catalog(), "q", &mut |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Answer("done".into()));
        // Only the first occurrence of id "a" reached the host.
        assert_eq!(host.called_tools(), vec!["search_papers"]);

        let failed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::ToolResult { content, failed: true, .. } => Some(content.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed[0].contains("duplicate tool call id"));
        assert!(failed[1].contains("unknown tool"));
    }

    #[tokio::test]
    async fn round_cap_exhausts_without_error() {
        // Empty script: the backend requests tools on every round.
        let backend = ScriptedBackend::new(Vec::new());
        let host = ScriptedHost::new(&["r"]);
        let mut sink = ignore_events();

        let outcome = Orchestrator::new()
            .run(&backend, &host, &catalog(), "q", &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(backend.request_sizes().len(), 10);
    }

    #[tokio::test]
    async fn search_scenario_resolves_in_two_rounds() {
        let backend = ScriptedBackend::new(vec![
            assistant_with_calls(vec![tool_call(
                "call-1",
                "search_papers",
                r#"{"topic": "transformers", "max_results": 5}"#,
            )]),
            Message::assistant("Here are 5 papers..."),
        ]);
        let host = ScriptedHost::new(&["p1", "p2", "p3", "p4", "p5"]);
        let mut events = Vec::new();

        let outcome = Orchestrator::new()
            .run(&backend, &host, &catalog(), "search for papers on transformers", &mut |e| {
                events.push(e)
            })
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Answer("Here are 5 papers...".into()));
        // Second request carried user + assistant + tool result.
        assert_eq!(backend.request_sizes(), vec![1, 3]);

        let result = events
            .iter()
            .find_map(|e| match e {
                TraceEvent::ToolResult { content, .. } => Some(content.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(result, "p1\np2\np3\np4\np5");
    }

    #[tokio::test]
    async fn queries_do_not_share_history() {
        let backend = ScriptedBackend::new(vec![
            Message::assistant("first"),
            Message::assistant("second"),
        ]);
        let host = ScriptedHost::new(&[]);
        let mut sink = ignore_events();
        let orchestrator = Orchestrator::new();

        orchestrator
            .run(&backend, &host, &catalog(), "one", &mut sink)
            .await
            .unwrap();
        orchestrator
            .run(&backend, &host, &catalog(), "two", &mut sink)
            .await
            .unwrap();

        // Both queries started from a single-message history.
        assert_eq!(backend.request_sizes(), vec![1, 1]);
    }
}
