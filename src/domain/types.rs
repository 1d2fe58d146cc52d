// ==========================================
// 商品目录同步系统 - 领域类型定义
// ==========================================
// 职责: 维度类型、导入状态机、运行状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 维度类型 (Dimension Kind)
// ==========================================
// 商品引用的参考实体: 供应商必填, 制造商可选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionKind {
    Vendor,       // 供应商
    Manufacturer, // 制造商
}

impl DimensionKind {
    /// 该维度缺失时是否阻断商品写入
    pub fn is_mandatory(&self) -> bool {
        matches!(self, DimensionKind::Vendor)
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionKind::Vendor => write!(f, "VENDOR"),
            DimensionKind::Manufacturer => write!(f, "MANUFACTURER"),
        }
    }
}

// ==========================================
// 导入阶段 (Import Phase)
// ==========================================
// Idle → Streaming → Draining → Sweeping → Done
// Streaming → Failed（仅数据流级 I/O 失败）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Idle,      // 未开始
    Streaming, // 逐行读取中
    Draining,  // 刷写最后一个批次
    Sweeping,  // 标记缺失商品
    Done,      // 完成
    Failed,    // 数据流失败（终态）
}

impl ImportPhase {
    /// 判断状态转换是否合法
    pub fn can_transition_to(&self, next: ImportPhase) -> bool {
        matches!(
            (self, next),
            (ImportPhase::Idle, ImportPhase::Streaming)
                | (ImportPhase::Streaming, ImportPhase::Draining)
                | (ImportPhase::Streaming, ImportPhase::Failed)
                | (ImportPhase::Draining, ImportPhase::Sweeping)
                | (ImportPhase::Sweeping, ImportPhase::Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportPhase::Done | ImportPhase::Failed)
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPhase::Idle => write!(f, "IDLE"),
            ImportPhase::Streaming => write!(f, "STREAMING"),
            ImportPhase::Draining => write!(f, "DRAINING"),
            ImportPhase::Sweeping => write!(f, "SWEEPING"),
            ImportPhase::Done => write!(f, "DONE"),
            ImportPhase::Failed => write!(f, "FAILED"),
        }
    }
}

// ==========================================
// 行问题类型 (Row Issue Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowIssueKind {
    MissingVendor,       // 供应商编号为空
    VendorUnresolved,    // 供应商写入/查询失败
    RecordDecodeError,   // 行记录无法解码
    WriteRejected,       // 写入时违反约束（如 item_id 被其他商品占用）
}

impl fmt::Display for RowIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssueKind::MissingVendor => write!(f, "MISSING_VENDOR"),
            RowIssueKind::VendorUnresolved => write!(f, "VENDOR_UNRESOLVED"),
            RowIssueKind::RecordDecodeError => write!(f, "RECORD_DECODE_ERROR"),
            RowIssueKind::WriteRejected => write!(f, "WRITE_REJECTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_happy_path() {
        let path = [
            ImportPhase::Idle,
            ImportPhase::Streaming,
            ImportPhase::Draining,
            ImportPhase::Sweeping,
            ImportPhase::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(ImportPhase::Done.is_terminal());
    }

    #[test]
    fn test_phase_failed_only_from_streaming() {
        assert!(ImportPhase::Streaming.can_transition_to(ImportPhase::Failed));
        assert!(!ImportPhase::Idle.can_transition_to(ImportPhase::Failed));
        assert!(!ImportPhase::Draining.can_transition_to(ImportPhase::Failed));
        assert!(!ImportPhase::Sweeping.can_transition_to(ImportPhase::Failed));
    }

    #[test]
    fn test_phase_rejects_skipping_sweep() {
        assert!(!ImportPhase::Draining.can_transition_to(ImportPhase::Done));
        assert!(!ImportPhase::Streaming.can_transition_to(ImportPhase::Sweeping));
        assert!(!ImportPhase::Done.can_transition_to(ImportPhase::Streaming));
    }

    #[test]
    fn test_vendor_is_mandatory() {
        assert!(DimensionKind::Vendor.is_mandatory());
        assert!(!DimensionKind::Manufacturer.is_mandatory());
    }
}
