//! 会话守卫
//!
//! 持有管理员 token：登录时用账号密码换取 token 并持久化，注销或任何
//! 请求返回 401 时清除。没有 token 时不允许发出需要认证的请求。

use crate::error::{ClientError, ClientResult};
use crate::request::{HttpClient, HttpMethod, HttpRequest};
use crate::storage::TokenStore;
use bvs_shared::{LOGIN_PATH, LoginRequest, LoginResponse, STORAGE_TOKEN_KEY};
use parking_lot::RwLock;
use tracing::{info, warn};


const LOGIN_FAILED: &str = "Login failed";

pub struct SessionGuard {
    token: RwLock<Option<String>>,
    store: Box<dyn TokenStore>,
}

impl SessionGuard {
    /// 创建一个空会话，不读取存储
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        Self {
            token: RwLock::new(None),
            store,
        }
    }

    /// 创建会话并恢复上次持久化的 token
    pub fn init(store: Box<dyn TokenStore>) -> Self {
        let token = store
            .get(STORAGE_TOKEN_KEY)
            .filter(|t| !t.trim().is_empty());
        if token.is_some() {
            info!("restored admin session");
        }
        Self {
            token: RwLock::new(token),
            store,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// 保存 token（内存 + 存储）
    ///
    /// 存储写入失败时会话仍然在内存中有效，只是重启后需要重新登录。
    pub fn establish(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
        if !self.store.set(STORAGE_TOKEN_KEY, token) {
            warn!("failed to persist admin token, session will not survive a restart");
        }
    }

    /// 注销并清除状态
    pub fn logout(&self) {
        self.clear();
        info!("admin logged out");
    }

    /// 服务端拒绝了当前 token (401)
    pub fn expire(&self) {
        if self.clear() {
            warn!("admin session expired, login required");
        }
    }

    fn clear(&self) -> bool {
        let had_token = self.token.write().take().is_some();
        if !self.store.delete(STORAGE_TOKEN_KEY) {
            warn!("failed to remove persisted admin token");
        }
        had_token
    }

    /// 用账号密码换取 token
    ///
    /// 登录请求本身不带 `Authorization` 头。失败时返回 `ClientError::Auth`，
    /// 消息取自服务端的 `error`/`message` 字段，否则为 "Login failed"。
    pub async fn login<C: HttpClient + ?Sized>(
        &self,
        client: &C,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> ClientResult<String> {
        let body = serde_json::to_value(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let url = format!("{}{}", base_url, LOGIN_PATH);
        let req = HttpRequest::new(&url, HttpMethod::Post).with_body(body);

        let resp = client
            .send(req)
            .await
            .map_err(|e| ClientError::Auth(e.to_string()))?;

        if !resp.is_success() {
            let message = resp.error_message(LOGIN_FAILED);
            warn!(status = resp.status, %message, "login rejected");
            return Err(ClientError::Auth(message));
        }

        let token = resp
            .json::<LoginResponse>()
            .ok()
            .and_then(|r| r.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                warn!("login response did not contain a token");
                ClientError::Auth(LOGIN_FAILED.to_string())
            })?;

        self.establish(&token);
        info!(%username, "admin logged in");
        Ok(token)
    }
}
