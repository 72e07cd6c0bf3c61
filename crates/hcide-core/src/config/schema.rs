//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。

use super::env_keys::{observability as obv_keys, toolchain as tc_keys};
use super::loader::{env_bool, env_optional, env_or};
use std::path::PathBuf;

/// Default download timeout: large portable runtimes over slow links.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30 * 60;

/// 可观测性配置：quiet、log_level、log_json、audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self::load()
        })
    }

    fn load() -> Self {
        Self {
            quiet: env_bool(obv_keys::HCIDE_QUIET, &[], false),
            log_level: env_or(obv_keys::HCIDE_LOG_LEVEL, &[], || "hcide=info".to_string()),
            log_json: env_bool(obv_keys::HCIDE_LOG_JSON, &[], false),
            audit_log: env_optional(obv_keys::HCIDE_AUDIT_LOG, &[]),
        }
    }
}

/// 工具链配置：便携运行时安装目录、下载超时
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Root for portable runtimes; each kind installs into `<tools_dir>/<kind>`.
    pub tools_dir: PathBuf,
    pub download_timeout_secs: u64,
}

impl ToolchainConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let tools_dir = env_optional(tc_keys::HCIDE_TOOLS_DIR, &[])
            .map(PathBuf::from)
            .unwrap_or_else(default_tools_dir);
        let download_timeout_secs = env_optional(tc_keys::HCIDE_DOWNLOAD_TIMEOUT_SECS, &[])
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        Self {
            tools_dir,
            download_timeout_secs,
        }
    }

    /// Install target for one runtime kind (e.g. `<tools_dir>/python`).
    pub fn install_dir(&self, kind_name: &str) -> PathBuf {
        self.tools_dir.join(kind_name)
    }
}

fn default_tools_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hcide")
        .join("tools")
}
