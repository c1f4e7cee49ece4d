use crate::error::{ClientError, ClientResult};
use bvs_shared::DEFAULT_REFRESH_INTERVAL_MS;
use std::path::PathBuf;
use std::time::Duration;

// =========================================================
// 运行时配置 (Runtime Config)
// =========================================================

pub const DEFAULT_API_URL: &str = "https://api-aso3bjldka-uc.a.run.app";
pub const ENV_API_URL: &str = "BVS_API_URL";
pub const ENV_REFRESH_SECS: &str = "BVS_REFRESH_SECS";
pub const ENV_TOKEN_FILE: &str = "BVS_TOKEN_FILE";

const APP_DIR: &str = "bvs-admin";
const TOKEN_FILE_NAME: &str = "session.json";

/// 抽象环境变量接口
pub trait EnvAdapter {
    fn var(&self, name: &str) -> Option<String>;
}

/// 进程环境变量
pub struct ProcessEnv;

impl EnvAdapter for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    /// `None` 表示关闭自动刷新（`BVS_REFRESH_SECS=0`）
    pub refresh_interval: Option<Duration>,
    pub token_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env<E: EnvAdapter + ?Sized>(env: &E) -> ClientResult<Self> {
        // 空值按未设置处理
        let var = |name: &str| env.var(name).filter(|v| !v.trim().is_empty());

        let api_url = var(ENV_API_URL)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "{} must be an http(s) URL, got {:?}",
                ENV_API_URL, api_url
            )));
        }

        let refresh_secs = match var(ENV_REFRESH_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ClientError::Config(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    ENV_REFRESH_SECS, raw
                ))
            })?,
            None => DEFAULT_REFRESH_INTERVAL_MS / 1000,
        };
        let refresh_interval = (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs));

        let token_file = var(ENV_TOKEN_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(default_token_file);

        Ok(Self {
            api_url,
            refresh_interval,
            token_file,
        })
    }
}

/// `<config dir>/bvs-admin/session.json`，拿不到配置目录时退回当前目录
fn default_token_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(TOKEN_FILE_NAME)
}
