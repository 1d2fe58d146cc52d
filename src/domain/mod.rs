// ==========================================
// 商品目录同步系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod catalog;
pub mod import;
pub mod types;

// 重导出核心类型
pub use catalog::{Manufacturer, ParsedCatalogRow, Product, ProductVariant, Vendor};
pub use import::{ImportResult, ImportRun, ImportSummary, RowIssue, RunStatus};
pub use types::{DimensionKind, ImportPhase, RowIssueKind};
