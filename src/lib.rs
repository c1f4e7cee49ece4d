//! BVS 管理端客户端核心
//!
//! 所有管理页面都遵循同一个模式：认证、拉取列表、展示、增删改、再拉取。
//! 这里把它实现为三个部件：
//!
//! - [`SessionGuard`]：持有并持久化 token，401 时清除；
//! - [`ResourceListController`]：列表加载状态、定时刷新与历史日期切换；
//! - [`MutationExecutor`]：增删改请求，成功后由控制器刷新一次。

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod mutation;
pub mod request;
pub mod session;
pub mod storage;
pub mod timer;

pub use api::AdminApi;
pub use config::{ClientConfig, EnvAdapter, ProcessEnv};
pub use controller::{Notice, PageState, ResourceCollection, ResourceListController};
pub use error::{ClientError, ClientResult};
pub use mutation::MutationExecutor;
pub use request::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use session::SessionGuard;
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};

pub use bvs_shared as shared;
