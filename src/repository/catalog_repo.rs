// ==========================================
// 商品目录同步系统 - 目录仓储 Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{DimensionKind, ImportRun, Product};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashSet;

// ==========================================
// DimensionEntity - 维度记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionEntity {
    pub kind: DimensionKind,
    pub key: String,
    pub name: Option<String>,
}

// ==========================================
// BatchUpsertOutcome - 批量写入结果
// ==========================================
/// 因约束冲突被拒绝的单条商品
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedProduct {
    pub index: usize, // 在提交批次中的位置
    pub product_id: String,
    pub item_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUpsertOutcome {
    pub written: usize,
    pub rejected: Vec<RejectedProduct>,
}

// ==========================================
// ProductRepository Trait
// ==========================================
// 实现者: CatalogRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 批量 upsert 商品（按 product_id）
    ///
    /// # 返回
    /// - Ok(BatchUpsertOutcome): 写入数 + 因唯一/外键约束被拒绝的记录
    /// - Err: 其他数据库错误（整批回滚）
    ///
    /// # 说明
    /// - 已存在的记录整体覆盖，is_deleted 重置为 false
    /// - 同一批次内重复的 product_id 按写入顺序后者生效
    /// - 单条记录的约束冲突只拒绝该条，不影响同批其他记录
    async fn bulk_upsert_products(&self, products: Vec<Product>)
        -> RepositoryResult<BatchUpsertOutcome>;

    /// 将不在 observed 集合中的商品标记为已删除
    ///
    /// # 返回
    /// - Ok(usize): 本次新标记的商品数（已删除的不重复计数）
    async fn flag_missing_products(&self, observed: &HashSet<String>) -> RepositoryResult<usize>;

    /// 按 product_id 查询商品
    async fn find_product(&self, product_id: &str) -> RepositoryResult<Option<Product>>;

    /// 查询未删除商品（按 product_id 排序，最多 limit 条）
    async fn list_live_products(&self, limit: usize) -> RepositoryResult<Vec<Product>>;

    /// 更新商品描述
    async fn update_description(&self, product_id: &str, description: &str) -> RepositoryResult<()>;

    /// 统计商品数量
    ///
    /// # 参数
    /// - include_deleted: 是否包含已标记删除的商品
    async fn count_products(&self, include_deleted: bool) -> RepositoryResult<usize>;
}

// ==========================================
// DimensionRepository Trait
// ==========================================
#[async_trait]
pub trait DimensionRepository: Send + Sync {
    /// 按自然键查询维度记录
    async fn find_dimension(
        &self,
        kind: DimensionKind,
        key: &str,
    ) -> RepositoryResult<Option<DimensionEntity>>;

    /// 新建维度记录
    async fn insert_dimension(
        &self,
        kind: DimensionKind,
        key: &str,
        name: Option<&str>,
    ) -> RepositoryResult<()>;

    /// 更新维度显示名称
    async fn rename_dimension(
        &self,
        kind: DimensionKind,
        key: &str,
        name: Option<&str>,
    ) -> RepositoryResult<()>;

    /// 统计维度记录数
    async fn count_dimensions(&self, kind: DimensionKind) -> RepositoryResult<usize>;
}

// ==========================================
// ImportRunRepository Trait
// ==========================================
#[async_trait]
pub trait ImportRunRepository: Send + Sync {
    /// 写入导入运行台账
    async fn insert_run(&self, run: ImportRun) -> RepositoryResult<()>;

    /// 查询最近的导入运行（按开始时间倒序）
    async fn get_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<ImportRun>>;
}
