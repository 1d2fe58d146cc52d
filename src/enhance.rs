// ==========================================
// 商品目录同步系统 - 商品描述增强
// ==========================================
// 职责: 导入成功后，对有限数量的商品重写描述
// 边界: 只定义生成接口，不内置任何第三方客户端
// 规则:
// - 单个商品失败仅记录日志，不影响其他商品
// - 返回内容去除首尾空白；为空则保留原描述
// ==========================================

use crate::domain::Product;
use crate::repository::{ProductRepository, RepositoryError};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

// ==========================================
// EnhanceError - 增强错误
// ==========================================
#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("文本生成失败: {0}")]
    Generation(String),

    #[error("文本生成服务不可用: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EnhanceResult<T> = Result<T, EnhanceError>;

// ==========================================
// DescriptionEnhancer Trait - 文本生成接口
// ==========================================
#[async_trait]
pub trait DescriptionEnhancer: Send + Sync {
    /// 根据提示词生成新的商品描述
    async fn enhance(&self, prompt: &str) -> EnhanceResult<String>;
}

/// 构造提示词
pub fn build_prompt(product: &Product, category: &str) -> String {
    format!(
        "Product name: {}\nProduct description: {}\nCategory: {}\n\nNew Description:",
        product.name.as_deref().unwrap_or(""),
        product.description.as_deref().unwrap_or(""),
        category
    )
}

// ==========================================
// EnhanceReport - 单次增强统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnhanceReport {
    pub attempted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

// ==========================================
// EnhancementRunner
// ==========================================
pub struct EnhancementRunner<'a, P: ProductRepository + ?Sized> {
    repo: &'a P,
    enhancer: &'a dyn DescriptionEnhancer,
    limit: usize,
    category: String,
}

impl<'a, P: ProductRepository + ?Sized> EnhancementRunner<'a, P> {
    pub fn new(
        repo: &'a P,
        enhancer: &'a dyn DescriptionEnhancer,
        limit: usize,
        category: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            enhancer,
            limit,
            category: category.into(),
        }
    }

    /// 执行一轮增强
    ///
    /// # 返回
    /// - Ok(EnhanceReport): 统计（单个商品失败计入 failed）
    /// - Err: 商品列表读取失败
    pub async fn run(&self) -> EnhanceResult<EnhanceReport> {
        let mut report = EnhanceReport::default();
        if self.limit == 0 {
            return Ok(report);
        }

        let products = self.repo.list_live_products(self.limit).await?;
        for product in &products {
            report.attempted += 1;
            let prompt = build_prompt(product, &self.category);

            let generated = match self.enhancer.enhance(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    report.failed += 1;
                    warn!(product_id = %product.product_id, error = %e, "描述生成失败");
                    continue;
                }
            };

            let generated = generated.trim();
            if generated.is_empty() {
                report.unchanged += 1;
                debug!(product_id = %product.product_id, "生成结果为空，保留原描述");
                continue;
            }

            match self
                .repo
                .update_description(&product.product_id, generated)
                .await
            {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(product_id = %product.product_id, error = %e, "描述写入失败");
                }
            }
        }

        info!(
            attempted = report.attempted,
            updated = report.updated,
            failed = report.failed,
            "商品描述增强完成"
        );
        Ok(report)
    }
}
