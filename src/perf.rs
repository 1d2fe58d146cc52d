// ==========================================
// 商品目录同步系统 - SQL 性能观测
// ==========================================
// 开关:
// - `CATALOG_SYNC_PERF_SQL=1` 开启 SQL 计数 + 慢查询日志（默认关闭）
// - `CATALOG_SYNC_SLOW_SQL_MS=200` 慢 SQL 阈值（毫秒）
// 用法: 导入入口与删除对账各持有一个 PerfGuard，退出时输出语句数
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_SLOW_SQL_MS: u64 = 200;

// 0 表示未开启
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static ACTIVE_GUARDS: Cell<u32> = Cell::new(0);
    // (语句数, 慢语句数)
    static SQL_COUNTERS: Cell<(u64, u64)> = Cell::new((0, 0));
}

/// 从环境变量读取的观测设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub slow_sql_ms: u64,
}

impl PerfSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("CATALOG_SYNC_PERF_SQL")
            .map(|v| matches!(v.trim(), "1" | "true" | "on"))
            .unwrap_or(false);
        let slow_sql_ms = lookup("CATALOG_SYNC_SLOW_SQL_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SLOW_SQL_MS);

        Self {
            enabled,
            slow_sql_ms,
        }
    }
}

fn compact_sql(sql: &str, max_chars: usize) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}…", head)
}

/// 为连接安装 trace/profile 回调（未开启时清除回调）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = PerfSettings::from_env();

    if !settings.enabled {
        SLOW_SQL_THRESHOLD_MS.store(0, Ordering::Relaxed);
        conn.trace(None);
        conn.profile(None);
        return;
    }

    SLOW_SQL_THRESHOLD_MS.store(settings.slow_sql_ms, Ordering::Relaxed);
    conn.trace(Some(count_statement));
    conn.profile(Some(report_slow_statement));
}

fn guarded() -> bool {
    ACTIVE_GUARDS.with(|g| g.get() > 0)
}

fn count_statement(_sql: &str) {
    if guarded() {
        SQL_COUNTERS.with(|c| {
            let (total, slow) = c.get();
            c.set((total.saturating_add(1), slow));
        });
    }
}

fn report_slow_statement(sql: &str, duration: Duration) {
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    let ms = duration.as_millis() as u64;
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %compact_sql(sql, 420), "慢 SQL");
    if guarded() {
        SQL_COUNTERS.with(|c| {
            let (total, slow) = c.get();
            c.set((total, slow.saturating_add(1)));
        });
    }
}

/// 操作级耗时与 SQL 计数，Drop 时输出 debug 日志
///
/// 计数基于线程局部变量，只统计本线程上执行的语句。
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    counters_at_start: (u64, u64),
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        ACTIVE_GUARDS.with(|g| g.set(g.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            counters_at_start: SQL_COUNTERS.with(|c| c.get()),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let (total, slow) = SQL_COUNTERS.with(|c| c.get());
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count = total.saturating_sub(self.counters_at_start.0),
            slow_sql_count = slow.saturating_sub(self.counters_at_start.1),
            "done"
        );
        ACTIVE_GUARDS.with(|g| g.set(g.get().saturating_sub(1)));
    }
}
