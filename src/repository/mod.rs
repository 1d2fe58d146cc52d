// ==========================================
// 商品目录同步系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有取值使用参数化,表名/列名仅来自内部常量
// ==========================================

pub mod catalog_repo;
pub mod catalog_repo_impl;
pub mod error;

// 重导出核心仓储
pub use catalog_repo::{
    BatchUpsertOutcome, DimensionEntity, DimensionRepository, ImportRunRepository,
    ProductRepository, RejectedProduct,
};
pub use catalog_repo_impl::CatalogRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
