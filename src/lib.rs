// ==========================================
// 商品目录同步系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 供应商目录导入、维度对账、删除标记
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能追踪
pub mod perf;

// 商品描述增强
pub mod enhance;

// 每日调度
pub mod scheduler;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DimensionKind, ImportPhase, RowIssueKind};

// 领域实体
pub use domain::{ImportResult, ImportRun, ImportSummary, Product, ProductVariant, RowIssue};

// 导入
pub use importer::{CatalogImporter, CatalogImporterImpl, FeedSource, ImportError};

// 仓储
pub use repository::CatalogRepositoryImpl;

// 调度
pub use scheduler::DailyScheduler;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品目录同步系统";
