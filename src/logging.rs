// ==========================================
// 商品目录同步系统 - 日志初始化
// ==========================================
// - RUST_LOG: 过滤器（默认 info），例如 RUST_LOG=catalog_sync=debug,slow_sql=warn
// - CATALOG_SYNC_LOG_JSON=1: 输出 JSON（定时任务部署时便于采集）
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn json_requested(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1") | Some("true"))
}

/// 按 CATALOG_SYNC_LOG_JSON 选择文本或 JSON 输出
pub fn init_from_env() {
    let json = std::env::var("CATALOG_SYNC_LOG_JSON").ok();
    if json_requested(json.as_deref()) {
        init_json();
    } else {
        init();
    }
}

pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// JSON 格式，附带当前 span（run_id / feed）
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(true)
        .init();
}

/// 测试用: debug 级别，输出到测试捕获，可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
