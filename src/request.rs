use crate::error::{ClientError, ClientResult};
use bvs_shared::{CONTENT_TYPE_JSON, ErrorBody, HEADER_CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub use bvs_shared::HttpMethod;

#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::time::Duration;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// 设置 JSON 请求体，同时补上 Content-Type
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self.with_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(ClientError::from)
    }

    /// 服务端错误消息（`error` 优先于 `message`），缺失时使用 `fallback`
    pub fn error_message(&self, fallback: &str) -> String {
        ErrorBody::message_from(&self.body).unwrap_or_else(|| fallback.to_string())
    }
}

/// HTTP 客户端特性 (Trait)
///
/// 控制器会在 tokio 任务中发起请求，所以这里要求 `Send`。
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse>;
}

#[async_trait::async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        (**self).send(req).await
    }
}

// =========================================================
// 实现层: Reqwest 客户端 (Production)
// =========================================================

#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        debug!(method = req.method.as_str(), url = %req.url, "sending request");

        let mut builder = self.client.request(method, &req.url);

        for (k, v) in req.headers {
            builder = builder.header(k, v);
        }

        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        debug!(status, "response received");
        Ok(HttpResponse { status, body })
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
#[derive(Clone)]
enum MockReply {
    Ready(u16, String),
    Delayed(Duration, u16, String),
    Pending,
    Unreachable(String),
}

/// 记录请求并按 "METHOD url" 返回预设响应
///
/// 同一个键可以预设多个响应，按顺序返回，最后一个会一直重复。
#[cfg(test)]
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, VecDeque<MockReply>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(method: HttpMethod, url: &str) -> String {
        format!("{} {}", method.as_str(), url)
    }

    fn push(&self, method: HttpMethod, url: &str, reply: MockReply) {
        self.responses
            .lock()
            .entry(Self::key(method, url))
            .or_default()
            .push_back(reply);
    }

    pub fn mock_response(
        &self,
        method: HttpMethod,
        url: &str,
        status: u16,
        body: serde_json::Value,
    ) {
        self.push(method, url, MockReply::Ready(status, body.to_string()));
    }

    /// 延迟返回（配合 `start_paused` 使用）
    pub fn mock_delayed(
        &self,
        method: HttpMethod,
        url: &str,
        delay: Duration,
        status: u16,
        body: serde_json::Value,
    ) {
        self.push(method, url, MockReply::Delayed(delay, status, body.to_string()));
    }

    /// 永不返回的请求
    pub fn mock_pending(&self, method: HttpMethod, url: &str) {
        self.push(method, url, MockReply::Pending);
    }

    /// 网络层失败
    pub fn mock_unreachable(&self, method: HttpMethod, url: &str, message: &str) {
        self.push(method, url, MockReply::Unreachable(message.to_string()));
    }

    pub fn request_count(&self, method: HttpMethod, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    /// "METHOD url" 形式的请求日志，用于校验调用顺序
    pub fn request_log(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| Self::key(r.method, &r.url))
            .collect()
    }

    fn next_reply(&self, key: &str) -> Option<MockReply> {
        let mut responses = self.responses.lock();
        let queue = responses.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        let key = Self::key(req.method, &req.url);
        self.requests.lock().push(req);

        match self.next_reply(&key) {
            Some(MockReply::Ready(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::Delayed(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse { status, body })
            }
            Some(MockReply::Pending) => futures::future::pending().await,
            Some(MockReply::Unreachable(message)) => Err(ClientError::Transport(message)),
            None => Ok(HttpResponse {
                status: 404,
                body: "Not Found".to_string(),
            }),
        }
    }
}
