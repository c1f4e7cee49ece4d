//! 客户端错误类型
//!
//! 三类业务错误对应页面上的三种失败：登录被拒（`Auth`）、列表加载失败
//! （`Fetch`）、增删改失败（`Mutation`）。其余变体描述它们的底层原因。
//!
//! 错误需要 `Clone`：同一个列表请求的结果会分发给所有等待它的调用方。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// 登录被拒绝，携带服务端消息或 "Login failed"
    #[error("{0}")]
    Auth(String),

    /// 列表加载失败（非 2xx）
    #[error("{0}")]
    Fetch(String),

    /// 创建/更新/删除/状态变更失败
    #[error("{0}")]
    Mutation(String),

    /// 服务端返回 401，会话已被清除
    #[error("Session expired. Please login again.")]
    Unauthorized,

    /// 没有 token 时发起了需要认证的请求，请求未发出
    #[error("No authentication token found. Please login again.")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// 是否需要回到登录页
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::Unauthorized | ClientError::NotAuthenticated)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_errors_require_login() {
        assert!(ClientError::Unauthorized.requires_login());
        assert!(ClientError::NotAuthenticated.requires_login());
        assert!(!ClientError::Auth("Invalid credentials".to_string()).requires_login());
        assert!(!ClientError::Fetch("Failed to fetch orders".to_string()).requires_login());
    }
}
