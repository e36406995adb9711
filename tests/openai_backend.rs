//! `OpenAiBackend` against a local stand-in for the chat-completions API.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use scenecraft::backend::{
    BackendEvent, BackendMessage, ChatCompletionRequest, FunctionSpec, GenerationBackend,
    OpenAiBackend,
};
use scenecraft::config::BackendConfig;
use scenecraft::ScriptError;

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

const STREAM_BODY: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Sure\"},\"finish_reason\":null}]}\n\n",
    ": keep-alive\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\", one sec.\"},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"function_call\":{\"name\":\"editScene\",\"arguments\":\"\"}},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"function_call\":{\"arguments\":\"{\\\"sceneId\\\":\"}},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"function_call\":{\"arguments\":\"\\\"s1\\\"}\"}},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"function_call\"}]}\n\n",
    "data: [DONE]\n\n",
);

async fn completions(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorded.auth.lock().await.push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );
    let streaming = body["stream"].as_bool().unwrap_or(false);
    recorded.bodies.lock().await.push(body);

    if streaming {
        ([(header::CONTENT_TYPE, "text/event-stream")], STREAM_BODY).into_response()
    } else {
        Json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"content\":\"Hey there!\",\"reasoning\":\"more energy\"}"
                }
            }]
        }))
        .into_response()
    }
}

async fn overloaded() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

async fn start_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route("/broken/chat/completions", post(overloaded))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), recorded)
}

fn backend(base_url: String, api_key: Option<&str>) -> OpenAiBackend {
    OpenAiBackend::new(BackendConfig {
        base_url,
        api_key: api_key.map(String::from),
        request_timeout_secs: 5,
        ..BackendConfig::default()
    })
    .unwrap()
}

fn turn_request() -> ChatCompletionRequest {
    ChatCompletionRequest {
        messages: vec![
            BackendMessage::system("be helpful"),
            BackendMessage::user("@[Intro] hi\n[Use sceneId: s1]"),
        ],
        functions: vec![FunctionSpec::edit_scene()],
        temperature: 0.8,
        max_tokens: None,
    }
}

#[tokio::test]
async fn test_stream_turn_decodes_text_and_call_fragments() {
    let (base, recorded) = start_server().await;
    let backend = backend(format!("{}/v1", base), Some("sk-test"));

    let events: Vec<BackendEvent> = backend
        .stream_turn(turn_request())
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            BackendEvent::Text("Sure".into()),
            BackendEvent::Text(", one sec.".into()),
            BackendEvent::CallFragment {
                name: Some("editScene".into()),
                arguments: String::new(),
            },
            BackendEvent::CallFragment {
                name: None,
                arguments: "{\"sceneId\":".into(),
            },
            BackendEvent::CallFragment {
                name: None,
                arguments: "\"s1\"}".into(),
            },
            BackendEvent::Finished {
                reason: Some("function_call".into()),
            },
        ]
    );

    let body = &recorded.bodies.lock().await[0];
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["stream"], true);
    assert_eq!(body["function_call"], "auto");
    assert_eq!(body["functions"][0]["name"], "editScene");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(
        recorded.auth.lock().await[0].as_deref(),
        Some("Bearer sk-test")
    );
}

#[tokio::test]
async fn test_complete_returns_message_text() {
    let (base, recorded) = start_server().await;
    let backend = backend(format!("{}/v1/", base), None);

    let request = ChatCompletionRequest {
        messages: vec![BackendMessage::user("rewrite")],
        functions: vec![],
        temperature: 0.7,
        max_tokens: Some(800),
    };
    let text = backend.complete(request).await.unwrap();
    assert_eq!(text, r#"{"content":"Hey there!","reasoning":"more energy"}"#);

    let body = &recorded.bodies.lock().await[0];
    assert_eq!(body["max_tokens"], 800);
    assert_eq!(body["stream"], false);
    assert!(body.get("functions").is_none());
    assert!(body.get("function_call").is_none());
    assert_eq!(recorded.auth.lock().await[0], None);
}

#[tokio::test]
async fn test_error_status_maps_to_unavailable() {
    let (base, _) = start_server().await;
    let backend = backend(format!("{}/broken", base), None);

    let err = backend.stream_turn(turn_request()).await.err().unwrap();
    match err {
        ScriptError::BackendUnavailable { status, message } => {
            assert_eq!(status, Some(503));
            assert!(message.contains("overloaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_offline() {
    // Bind and drop a listener to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = backend(format!("http://{}/v1", addr), None);
    let err = backend.stream_turn(turn_request()).await.err().unwrap();
    assert!(matches!(
        err,
        ScriptError::BackendUnavailable { status: None, .. }
    ));
}
