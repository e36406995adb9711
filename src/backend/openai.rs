//! OpenAI-compatible chat-completions backend.

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    BackendEvent, BackendEventStream, BackendMessage, ChatCompletionRequest, FunctionSpec,
    GenerationBackend,
};
use crate::config::BackendConfig;
use crate::ScriptError;

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [BackendMessage],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    functions: &'a [FunctionSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
    function_call: Option<FunctionCallDelta>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    function: Option<FunctionCallDelta>,
}

impl StreamChunk {
    /// Flatten one chunk into backend events.
    ///
    /// Legacy `function_call` deltas and `tool_calls` deltas both become
    /// call fragments; text is only reported when the chunk carries no call.
    pub(crate) fn into_events(self) -> Vec<BackendEvent> {
        let mut events = Vec::new();
        for choice in self.choices {
            let Delta {
                content,
                function_call,
                tool_calls,
            } = choice.delta;

            let call = function_call.or_else(|| {
                tool_calls
                    .and_then(|calls| calls.into_iter().next())
                    .and_then(|c| c.function)
            });

            if let Some(call) = call {
                events.push(BackendEvent::CallFragment {
                    name: call.name.filter(|n| !n.is_empty()),
                    arguments: call.arguments.unwrap_or_default(),
                });
            } else if let Some(text) = content.filter(|t| !t.is_empty()) {
                events.push(BackendEvent::Text(text));
            }

            if let Some(reason) = choice.finish_reason {
                events.push(BackendEvent::Finished {
                    reason: Some(reason),
                });
            }
        }
        events
    }
}

/// Payload of the event that ends a streamed completion.
const DONE_SENTINEL: &str = "[DONE]";

/// Turn a server-sent-event body into backend events.
///
/// Stops at the `[DONE]` sentinel; events with an empty payload (keep-alive
/// comments) are skipped.
pub(crate) fn decode_event_stream<S, B, E>(bytes: S) -> BackendEventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ScriptError> + std::fmt::Display + Send + 'static,
{
    let mut messages = Box::pin(bytes.eventsource());

    Box::pin(async_stream::try_stream! {
        while let Some(message) = messages.next().await {
            let message = message.map_err(stream_error)?;
            let data = message.data.trim();
            if data == DONE_SENTINEL {
                break;
            }
            if data.is_empty() {
                continue;
            }
            let parsed: StreamChunk = serde_json::from_str(data).map_err(ScriptError::from)?;
            for event in parsed.into_events() {
                yield event;
            }
        }
        debug!("Backend stream closed");
    })
}

fn stream_error<E>(err: EventStreamError<E>) -> ScriptError
where
    E: Into<ScriptError> + std::fmt::Display,
{
    match err {
        EventStreamError::Transport(e) => e.into(),
        other => ScriptError::MalformedBackendResponse(format!("Invalid event stream: {}", other)),
    }
}

/// Backend speaking the `/chat/completions` protocol.
pub struct OpenAiBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: BackendConfig) -> Result<Self, ScriptError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ScriptError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ScriptError> {
        let body = CompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            functions: &request.functions,
            function_call: (!request.functions.is_empty()).then_some("auto"),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ScriptError::BackendUnavailable {
                message: format!("API request failed ({}): {}", status, error_text),
                status: Some(status.as_u16()),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn stream_turn(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<BackendEventStream, ScriptError> {
        let response = self.send(&request, true).await?;
        Ok(decode_event_stream(response.bytes_stream()))
    }

    async fn complete(&self, request: ChatCompletionRequest) -> Result<String, ScriptError> {
        let response = self.send(&request, false).await?;
        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ScriptError::MalformedBackendResponse("Completion had no message content".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn events(json: &str) -> Vec<BackendEvent> {
        serde_json::from_str::<StreamChunk>(json)
            .unwrap()
            .into_events()
    }

    #[test]
    fn test_text_delta() {
        assert_eq!(
            events(r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#),
            vec![BackendEvent::Text("Hel".into())]
        );
    }

    #[test]
    fn test_function_call_delta() {
        assert_eq!(
            events(
                r#"{"choices":[{"delta":{"function_call":{"name":"editScene","arguments":""}}}]}"#
            ),
            vec![BackendEvent::CallFragment {
                name: Some("editScene".into()),
                arguments: String::new(),
            }]
        );
        assert_eq!(
            events(r#"{"choices":[{"delta":{"function_call":{"arguments":"{\"sce"}}}]}"#),
            vec![BackendEvent::CallFragment {
                name: None,
                arguments: "{\"sce".into(),
            }]
        );
    }

    #[test]
    fn test_tool_call_delta() {
        assert_eq!(
            events(
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","type":"function","function":{"name":"editScene","arguments":"{}"}}]}}]}"#
            ),
            vec![BackendEvent::CallFragment {
                name: Some("editScene".into()),
                arguments: "{}".into(),
            }]
        );
    }

    #[test]
    fn test_finish_reason_and_empty_delta() {
        assert_eq!(
            events(r#"{"choices":[{"delta":{},"finish_reason":"function_call"}]}"#),
            vec![BackendEvent::Finished {
                reason: Some("function_call".into())
            }]
        );
        assert!(events(r#"{"choices":[]}"#).is_empty());
    }

    async fn decode(chunks: &[&str]) -> Result<Vec<BackendEvent>, ScriptError> {
        let chunks: Vec<Result<Vec<u8>, ScriptError>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        decode_event_stream(futures::stream::iter(chunks))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_decode_stops_at_done() {
        let out = decode(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(out, vec![BackendEvent::Text("Hi".into())]);
    }

    #[tokio::test]
    async fn test_decode_event_split_across_chunks() {
        let out = decode(&[
            "data: {\"choices\":[{\"delta\":{\"con",
            "tent\":\"hi\"}}]}\r\n\r\n",
            ": keep-alive\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(out, vec![BackendEvent::Text("hi".into())]);
    }

    #[tokio::test]
    async fn test_decode_joins_multiline_data() {
        let out = decode(&[
            "data: {\"choices\":\ndata: [{\"delta\":{\"content\":\"x\"}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(out, vec![BackendEvent::Text("x".into())]);
    }

    #[tokio::test]
    async fn test_decode_cr_only_line_endings() {
        let out = decode(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\r",
            "data: [DONE]\r\r",
        ])
        .await
        .unwrap();
        assert_eq!(out, vec![BackendEvent::Text("a".into())]);
    }

    #[tokio::test]
    async fn test_decode_rejects_non_json_payload() {
        let err = decode(&["data: not json\n\n"]).await.unwrap_err();
        assert!(matches!(err, ScriptError::MalformedBackendResponse(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![BackendMessage::user("hi")];
        let functions = vec![FunctionSpec::edit_scene()];
        let body = CompletionBody {
            model: "gpt-4o-mini",
            messages: &messages,
            functions: &functions,
            function_call: Some("auto"),
            temperature: 0.8,
            max_tokens: None,
            stream: true,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["function_call"], "auto");
        assert_eq!(value["functions"][0]["name"], "editScene");
        assert_eq!(value["stream"], true);
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_body_omits_empty_functions() {
        let messages = vec![BackendMessage::user("hi")];
        let body = CompletionBody {
            model: "gpt-4o-mini",
            messages: &messages,
            functions: &[],
            function_call: None,
            temperature: 0.7,
            max_tokens: Some(800),
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("functions").is_none());
        assert!(value.get("function_call").is_none());
        assert_eq!(value["max_tokens"], 800);
    }
}
