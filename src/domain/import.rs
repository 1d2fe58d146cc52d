// ==========================================
// 商品目录同步系统 - 导入结果与运行记录
// ==========================================
// 用途: 导入入口返回值 + import_run 台账
// ==========================================

use crate::domain::types::{ImportPhase, RowIssueKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// RowIssue - 被跳过的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub row_number: usize,          // 数据行号
    pub product_id: Option<String>, // 商品编号（如果可解析）
    pub kind: RowIssueKind,         // 问题类型
    pub message: String,            // 问题描述
}

// ==========================================
// ImportSummary - 导入汇总统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,        // 读取的数据行数
    pub processed_rows: usize,    // 规范化并进入批次的行数
    pub skipped_rows: usize,      // 被跳过的行数
    pub batches_flushed: usize,   // 成功写入的批次数
    pub batches_failed: usize,    // 写入失败的批次数
    pub products_written: usize,  // 成功 upsert 的商品数
    pub products_rejected: usize, // 写入时因约束冲突被拒绝的商品数
    pub products_dropped: usize,  // 因批次失败丢弃的商品数
    pub vendors_written: usize,   // 新建/改名的供应商数
    pub manufacturers_written: usize, // 新建/改名的制造商数
    pub manufacturer_placeholders: usize, // 发放的制造商占位编号数
    pub dimension_lookups: usize, // 维度查询次数（存储往返）
    pub dimension_cache_hits: usize, // 维度缓存命中次数
    pub products_flagged: usize,  // 本次标记为删除的商品数
    pub sweep_failed: bool,       // 删除标记是否失败
}

impl ImportSummary {
    /// 是否存在尽力而为策略下的部分失败
    pub fn has_partial_failures(&self) -> bool {
        self.skipped_rows > 0
            || self.products_rejected > 0
            || self.batches_failed > 0
            || self.sweep_failed
    }
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
// 数据流级失败不会产生 ImportResult，而是通过 Err 返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub run_id: String,             // 本次运行 ID（UUID）
    pub source: String,             // 数据源描述（路径或 "stream"）
    pub phase: ImportPhase,         // 终态（正常为 Done）
    pub summary: ImportSummary,     // 汇总统计
    pub row_issues: Vec<RowIssue>,  // 被跳过/被拒绝行明细
    pub elapsed_time: Duration,     // 耗时
}

// ==========================================
// RunStatus - 运行状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Done,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Done => "DONE",
            RunStatus::Failed => "FAILED",
        }
    }
}

// ==========================================
// ImportRun - 导入运行台账
// ==========================================
// 对齐: import_run 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: String,
    pub source: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_rows: i64,
    pub processed_rows: i64,
    pub skipped_rows: i64,
    pub products_flagged: i64,
    pub error_message: Option<String>,
    pub summary_json: Option<String>,
}
