use serde_json::json;
use slink::config::{GenerationParams, VertexConfig};
use slink::llm_interaction::{ChatModel, ChatRequest, ExamplePair, ModelErrorKind, VertexChatModel};
use wiremock::matchers::{body_partial_json, header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREDICT_PATH: &str =
    r"^/v1/projects/test-project/locations/us-central1/publishers/google/models/chat-bison@001:predict$";

fn model_for(server: &MockServer) -> VertexChatModel {
    VertexChatModel::new(VertexConfig {
        project_id: Some("test-project".to_string()),
        location: "us-central1".to_string(),
        model: "chat-bison@001".to_string(),
        endpoint: Some(server.uri()),
        access_token: Some("test-token".to_string()),
    })
    .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        context: "You are fraser.".to_string(),
        examples: vec![ExamplePair {
            input: "is prod up?".to_string(),
            output: "Yes.".to_string(),
        }],
        message: "and staging?".to_string(),
        parameters: GenerationParams::default(),
    }
}

#[test_log::test(tokio::test)]
async fn test_send_message_returns_first_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(PREDICT_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "instances": [{
                "context": "You are fraser.",
                "examples": [{
                    "input": { "content": "is prod up?" },
                    "output": { "content": "Yes." }
                }],
                "messages": [{ "author": "user", "content": "and staging?" }]
            }],
            "parameters": {
                "maxOutputTokens": 256,
                "topK": 40
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{
                "candidates": [
                    { "author": "1", "content": "Staging is down for maintenance." },
                    { "author": "1", "content": "ignored" }
                ],
                "safetyAttributes": [{ "blocked": false }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = model_for(&server).send_message(&request()).await.unwrap();
    assert_eq!(reply, "Staging is down for maintenance.");
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = model_for(&server).send_message(&request()).await.unwrap_err();
    assert_eq!(err.kind, ModelErrorKind::Auth);
    assert!(err.message.contains("token expired"));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = model_for(&server).send_message(&request()).await.unwrap_err();
    assert_eq!(err.kind, ModelErrorKind::Api);
    assert!(err.message.contains("500"));
}

#[tokio::test]
async fn test_empty_candidates_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{ "candidates": [], "safetyAttributes": [{ "blocked": true }] }]
        })))
        .mount(&server)
        .await;

    let err = model_for(&server).send_message(&request()).await.unwrap_err();
    assert_eq!(err.kind, ModelErrorKind::InvalidResponse);
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = model_for(&server).send_message(&request()).await.unwrap_err();
    assert_eq!(err.kind, ModelErrorKind::InvalidResponse);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Grab a free port and release it so nothing is listening there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let model = VertexChatModel::new(VertexConfig {
        project_id: Some("test-project".to_string()),
        location: "us-central1".to_string(),
        model: "chat-bison@001".to_string(),
        endpoint: Some(format!("http://127.0.0.1:{}", port)),
        access_token: Some("test-token".to_string()),
    })
    .unwrap();

    let err = model.send_message(&request()).await.unwrap_err();
    assert_eq!(err.kind, ModelErrorKind::Network);
}
