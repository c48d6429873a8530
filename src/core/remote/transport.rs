use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::error::RemoteTransportError;
use super::payload::GenerateRequest;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_OPERATION: &str = "generateContent";

/// 发出一次推理请求，不做任何重试
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn send(&self, request: &GenerateRequest) -> Result<Value, RemoteTransportError>;
}

#[derive(Debug, Clone)]
pub struct GeminiEndpoint {
    pub base_url: String,
    pub model: String,
    pub operation: String,
    pub api_key: String,
}

impl GeminiEndpoint {
    pub fn url(&self) -> String {
        format!(
            "{}/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.operation
        )
    }
}

pub struct GeminiTransport {
    client: Client,
    endpoint: GeminiEndpoint,
}

impl GeminiTransport {
    pub fn new(endpoint: GeminiEndpoint) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: GeminiEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &GeminiEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceTransport for GeminiTransport {
    async fn send(&self, request: &GenerateRequest) -> Result<Value, RemoteTransportError> {
        let url = self.endpoint.url();
        debug!("📤 POST {} ({} images)", url, request.image_count());

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.endpoint.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("⚠️ {} returned {}", url, status);
            return Err(RemoteTransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

type Responder = Box<dyn Fn(&GenerateRequest, u32) -> Result<Value, RemoteTransportError> + Send + Sync>;

/// 脚本化的传输层：按请求内容和调用序号返回结果，并记录所有请求
pub struct MockTransport {
    responder: Responder,
    calls: AtomicU32,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockTransport {
    /// `responder` 的第二个参数是从 1 开始的全局调用序号
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&GenerateRequest, u32) -> Result<Value, RemoteTransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 每次都返回同一段文本
    pub fn fixed_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_responder(move |_, _| Ok(text_response(&text)))
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InferenceTransport for MockTransport {
    async fn send(&self, request: &GenerateRequest) -> Result<Value, RemoteTransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        (self.responder)(request, call)
    }
}

/// 构造 `{candidates:[{content:{parts:[{text}]}}]}` 响应
pub fn text_response(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::remote::payload::extract_text;
    use mockito::Matcher;

    fn endpoint(base_url: String) -> GeminiEndpoint {
        GeminiEndpoint {
            base_url,
            model: "test-model".to_string(),
            operation: DEFAULT_OPERATION.to_string(),
            api_key: "secret".to_string(),
        }
    }

    #[test]
    fn test_endpoint_url() {
        let ep = endpoint(format!("{}/", DEFAULT_BASE_URL));
        assert_eq!(
            ep.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/test-model:generateContent"
        );
    }

    #[tokio::test]
    async fn test_success_returns_parsed_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/test-model:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{"parts": [{"text": "hello"}]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(text_response("world").to_string())
            .create_async()
            .await;

        let transport = GeminiTransport::new(endpoint(server.url()));
        let value = transport.send(&GenerateRequest::text("hello")).await.unwrap();

        assert_eq!(extract_text(&value).as_deref(), Some("world"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/test-model:generateContent")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let transport = GeminiTransport::new(endpoint(server.url()));
        let err = transport.send(&GenerateRequest::text("x")).await.unwrap_err();

        match err {
            RemoteTransportError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/test-model:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let transport = GeminiTransport::new(endpoint(server.url()));
        let err = transport.send(&GenerateRequest::text("x")).await.unwrap_err();

        assert!(matches!(err, RemoteTransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::fixed_text("ok");
        transport.send(&GenerateRequest::text("a")).await.unwrap();
        transport.send(&GenerateRequest::text("b")).await.unwrap();

        assert_eq!(transport.call_count(), 2);
        let prompts: Vec<_> = transport.requests().iter().map(|r| r.prompt_text()).collect();
        assert_eq!(prompts, vec!["a", "b"]);
    }
}
