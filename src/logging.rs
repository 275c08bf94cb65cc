// ==========================================
// 合作社收款台账 - 日志初始化
// ==========================================
// tracing + tracing-subscriber
// 过滤器取自 RUST_LOG,未设置时使用 DEFAULT_FILTER
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的过滤器
pub const DEFAULT_FILTER: &str = "info";

/// 构造过滤器: RUST_LOG 优先,其次 fallback
fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// 初始化日志系统（CLI 入口调用一次）
///
/// # 环境变量
/// - RUST_LOG: 例如 `RUST_LOG=debug` 或 `RUST_LOG=iamc_collect::importer=trace`
///
/// # 示例
/// ```no_run
/// iamc_collect::logging::init();
/// ```
pub fn init() {
    fmt()
        .with_env_filter(build_filter(DEFAULT_FILTER))
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 测试环境: debug 级别,输出到测试捕获；重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(build_filter("debug"))
        .with_test_writer()
        .try_init();
}
