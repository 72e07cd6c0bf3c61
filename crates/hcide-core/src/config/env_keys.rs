//! 环境变量 key 常量
//!
//! 所有变量统一使用 `HCIDE_*` 前缀。

/// 可观测性与日志
pub mod observability {
    pub const HCIDE_QUIET: &str = "HCIDE_QUIET";
    pub const HCIDE_LOG_LEVEL: &str = "HCIDE_LOG_LEVEL";
    pub const HCIDE_LOG_JSON: &str = "HCIDE_LOG_JSON";
    pub const HCIDE_AUDIT_LOG: &str = "HCIDE_AUDIT_LOG";
}

/// 工具链安装与下载
pub mod toolchain {
    /// Root directory for portable runtimes installed by `hcide install`.
    pub const HCIDE_TOOLS_DIR: &str = "HCIDE_TOOLS_DIR";
    /// HTTP timeout (seconds) for a single runtime archive download.
    pub const HCIDE_DOWNLOAD_TIMEOUT_SECS: &str = "HCIDE_DOWNLOAD_TIMEOUT_SECS";
}
