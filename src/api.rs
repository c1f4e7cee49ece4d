use crate::error::{ClientError, ClientResult};
use crate::request::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionGuard;
use bvs_shared::HEADER_AUTHORIZATION;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

/// 管理端 API 入口
///
/// 组合了传输层和会话守卫：负责拼接 URL、附加 Bearer 头，以及在 401 时
/// 清除会话。克隆开销很小，控制器和执行器各持有一份。
pub struct AdminApi<C> {
    base_url: String,
    client: Arc<C>,
    session: Arc<SessionGuard>,
}

impl<C> Clone for AdminApi<C> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            client: Arc::clone(&self.client),
            session: Arc::clone(&self.session),
        }
    }
}

impl<C: HttpClient> AdminApi<C> {
    pub fn new(base_url: impl Into<String>, client: Arc<C>, session: Arc<SessionGuard>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionGuard> {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        self.session
            .login(self.client.as_ref(), &self.base_url, username, password)
            .await
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// 构造带认证头的请求，没有 token 时直接拒绝
    fn authorized(&self, method: HttpMethod, path: &str) -> ClientResult<HttpRequest> {
        let token = self.session.token().ok_or_else(|| {
            warn!(method = method.as_str(), %path, "refusing to send request without a session");
            ClientError::NotAuthenticated
        })?;
        Ok(HttpRequest::new(&self.url(path), method)
            .with_header(HEADER_AUTHORIZATION, &format!("Bearer {}", token)))
    }

    /// 发送一个需要认证的请求
    ///
    /// 只有 401 会被转换为错误（同时清除会话），其余状态码原样返回给调用方。
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<HttpResponse> {
        let mut req = self.authorized(method, path)?;
        if let Some(body) = body {
            req = req.with_body(body);
        }

        let resp = self.client.send(req).await?;
        if resp.status == 401 {
            self.session.expire();
            return Err(ClientError::Unauthorized);
        }
        Ok(resp)
    }

    pub async fn get(&self, path: &str) -> ClientResult<HttpResponse> {
        self.send(HttpMethod::Get, path, None).await
    }

    /// GET 并解码 JSON，非 2xx 时返回 `ClientError::Fetch(failure)`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        failure: &str,
    ) -> ClientResult<T> {
        let resp = self.get(path).await?;
        if !resp.is_success() {
            warn!(status = resp.status, %path, "request failed");
            return Err(ClientError::Fetch(failure.to_string()));
        }
        resp.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MockHttpClient;
    use crate::storage::MemoryTokenStore;
    use bvs_shared::UnpaidReport;
    use serde_json::json;

    const BASE: &str = "http://api.test";

    fn api_with_token(
        client: Arc<MockHttpClient>,
        token: Option<&str>,
    ) -> AdminApi<MockHttpClient> {
        let session = Arc::new(SessionGuard::new(Box::new(MemoryTokenStore::new())));
        if let Some(token) = token {
            session.establish(token);
        }
        AdminApi::new(format!("{}/", BASE), client, session)
    }

    #[test]
    fn url_joins_paths() {
        let api = api_with_token(Arc::new(MockHttpClient::new()), None);
        assert_eq!(api.base_url(), BASE);
        assert_eq!(api.url("/api/admin/orders"), "http://api.test/api/admin/orders");
        assert_eq!(api.url("api/admin/orders"), "http://api.test/api/admin/orders");
    }

    #[tokio::test]
    async fn requests_carry_bearer_token() {
        let client = Arc::new(MockHttpClient::new());
        client.mock_response(HttpMethod::Get, "http://api.test/api/admin/users", 200, json!([]));
        let api = api_with_token(client.clone(), Some("abc"));

        api.get("/api/admin/users").await.unwrap();

        let requests = client.requests.lock();
        assert_eq!(requests[0].header(HEADER_AUTHORIZATION), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn missing_token_refuses_locally() {
        let client = Arc::new(MockHttpClient::new());
        let api = api_with_token(client.clone(), None);

        let err = api.get("/api/admin/users").await.unwrap_err();

        assert_eq!(err, ClientError::NotAuthenticated);
        assert!(client.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_clears_session() {
        let client = Arc::new(MockHttpClient::new());
        client.mock_response(
            HttpMethod::Delete,
            "http://api.test/api/admin/users/3",
            401,
            json!({"error": "Token expired"}),
        );
        let api = api_with_token(client, Some("abc"));

        let err = api.send(HttpMethod::Delete, "/api/admin/users/3", None).await.unwrap_err();

        assert_eq!(err, ClientError::Unauthorized);
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn get_json_decodes_unpaid_report() {
        let client = Arc::new(MockHttpClient::new());
        client.mock_response(
            HttpMethod::Get,
            "http://api.test/api/admin/unpaid-bills",
            200,
            json!({
                "unpaidBills": [{"id": 1, "hotel_name": "Sea View", "total_amount": 120}],
                "hotelBreakdown": [],
                "totalUnpaidAmount": 120
            }),
        );
        let api = api_with_token(client, Some("abc"));

        let report: UnpaidReport = api
            .get_json("/api/admin/unpaid-bills", "Failed to fetch unpaid bills")
            .await
            .unwrap();

        assert_eq!(report.unpaid_bills.len(), 1);
        assert_eq!(report.total_unpaid_amount, Some(120.0));
    }

    #[tokio::test]
    async fn get_json_maps_http_failure() {
        let client = Arc::new(MockHttpClient::new());
        let api = api_with_token(client, Some("abc"));

        let err = api
            .get_json::<serde_json::Value>(
                "/api/admin/unpaid-bills",
                "Failed to fetch unpaid bills",
            )
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Fetch("Failed to fetch unpaid bills".to_string()));
    }
}
