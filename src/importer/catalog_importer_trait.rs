// ==========================================
// 商品目录同步系统 - 目录导入 Trait
// ==========================================
// 职责: 定义目录导入入口（不包含实现）
// ==========================================

use crate::domain::ImportResult;
use crate::importer::error::ImporterResult;
use crate::importer::file_parser::FeedSource;
use async_trait::async_trait;

// ==========================================
// CatalogImporter Trait
// ==========================================
// 实现者: CatalogImporterImpl
// 调用方: DailyScheduler / CLI
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 导入一份目录数据
    ///
    /// # 参数
    /// - source: 文件路径或任意 CSV 字节流
    ///
    /// # 返回
    /// - Ok(ImportResult): 数据流完整读取（可能存在被跳过的行或失败的批次）
    /// - Err: 数据流级失败（无法打开或中途读取失败），不执行删除对账
    ///
    /// # 流程
    /// 1. 打开数据源（Idle → Streaming）
    /// 2. 逐行: 解析 → 维度对账 → 规范化 → 加入批次
    /// 3. 数据结束（Streaming → Draining），写入最后一个批次
    /// 4. 删除对账（Draining → Sweeping → Done）
    async fn import_catalog(&self, source: FeedSource) -> ImporterResult<ImportResult>;
}
