// ==========================================
// 商品目录同步系统 - 导入层
// ==========================================
// 职责: 外部目录数据导入，对账后写入规范存储
// 支持: CSV（流式）, Excel
// ==========================================

// 模块声明
pub mod batch_writer;
pub mod catalog_importer_impl;
pub mod catalog_importer_trait;
pub mod deletion_reconciler;
pub mod dimension_reconciler;
pub mod error;
pub mod file_parser;
pub mod product_normalizer;
pub mod row_parser;

// 重导出核心类型
pub use batch_writer::{BatchStats, BatchUpsertWriter, DEFAULT_BATCH_SIZE};
pub use catalog_importer_impl::{CatalogImporterImpl, PhaseTracker};
pub use deletion_reconciler::DeletionReconciler;
pub use dimension_reconciler::{DimensionReconciler, DimensionStats};
pub use error::{ImportError, ImporterResult};
pub use file_parser::{CsvRowSource, ExcelRowSource, FeedSource, RawRecord, RowSource, SourceRow};
pub use product_normalizer::ProductNormalizer;
pub use row_parser::{generate_id, RowParser};

// 重导出 Trait 接口
pub use catalog_importer_trait::CatalogImporter;
