// ==========================================
// 商品目录同步系统 - 批量写入器
// ==========================================
// 职责: 缓冲规范化后的商品，满批或收尾时整批 upsert
// 规则:
// - 批次写入在单个事务中完成
// - 单条约束冲突: 仅拒绝该条，记为行问题
// - 批次失败: 记录日志并计数，不重试，导入继续
// ==========================================

use crate::domain::{Product, RowIssue, RowIssueKind};
use crate::repository::ProductRepository;
use tracing::{debug, error, warn};

pub use crate::config::config_manager::DEFAULT_BATCH_SIZE;

// ==========================================
// BatchStats - 批次写入统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batches_flushed: usize,
    pub batches_failed: usize,
    pub products_written: usize,
    pub products_rejected: usize,
    pub products_dropped: usize,
}

// ==========================================
// BatchUpsertWriter
// ==========================================
pub struct BatchUpsertWriter<'a, P: ProductRepository + ?Sized> {
    repo: &'a P,
    batch_size: usize,
    buffer: Vec<Product>,
    row_numbers: Vec<usize>,
    rejected: Vec<RowIssue>,
    stats: BatchStats,
}

impl<'a, P: ProductRepository + ?Sized> BatchUpsertWriter<'a, P> {
    /// 创建写入器（batch_size 为 0 时使用默认值）
    pub fn new(repo: &'a P, batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };

        Self {
            repo,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            row_numbers: Vec::with_capacity(batch_size),
            rejected: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// 取出写入时被拒绝的行
    pub fn take_rejected(&mut self) -> Vec<RowIssue> {
        std::mem::take(&mut self.rejected)
    }

    /// 加入一条商品，缓冲区满时自动写入
    pub async fn push(&mut self, row_number: usize, product: Product) {
        self.buffer.push(product);
        self.row_numbers.push(row_number);
        if self.buffer.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// 写入缓冲区中的全部商品
    ///
    /// # 返回
    /// - true: 写入成功或缓冲区为空
    /// - false: 写入失败（该批次已丢弃）
    pub async fn flush(&mut self) -> bool {
        if self.buffer.is_empty() {
            return true;
        }

        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let row_numbers =
            std::mem::replace(&mut self.row_numbers, Vec::with_capacity(self.batch_size));
        let batch_len = batch.len();
        let batch_no = self.stats.batches_flushed + self.stats.batches_failed + 1;

        match self.repo.bulk_upsert_products(batch).await {
            Ok(outcome) => {
                self.stats.batches_flushed += 1;
                self.stats.products_written += outcome.written;
                self.stats.products_rejected += outcome.rejected.len();
                debug!(batch_no, written = outcome.written, "批次写入成功");

                for rejected in outcome.rejected {
                    let row_number = row_numbers.get(rejected.index).copied().unwrap_or_default();
                    warn!(
                        row = row_number,
                        product_id = %rejected.product_id,
                        item_id = %rejected.item_id,
                        "商品写入被拒绝: {}",
                        rejected.reason
                    );
                    self.rejected.push(RowIssue {
                        row_number,
                        product_id: Some(rejected.product_id),
                        kind: RowIssueKind::WriteRejected,
                        message: rejected.reason,
                    });
                }
                true
            }
            Err(e) => {
                self.stats.batches_failed += 1;
                self.stats.products_dropped += batch_len;
                error!(batch_no, batch_len, error = %e, "批次写入失败，已丢弃");
                false
            }
        }
    }
}
