// ==========================================
// 商品目录同步系统 - 目录导入器实现
// ==========================================
// 职责: 串联整条导入管道，从数据源到数据库
// 流程: 打开 → 逐行(解析 → 维度对账 → 规范化 → 批次) → 收尾写入 → 删除对账
// 策略: 尽力而为
// - 行级错误: 跳过该行，记录明细
// - 写入约束冲突: 仅拒绝该行，记录明细
// - 批次错误: 丢弃该批次，计数
// - 数据流错误: 中止，不清扫，返回 Err
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::{
    DimensionKind, ImportPhase, ImportResult, ImportRun, ImportSummary, ParsedCatalogRow, Product,
    RowIssue, RowIssueKind, RunStatus,
};
use crate::importer::batch_writer::{BatchUpsertWriter, DEFAULT_BATCH_SIZE};
use crate::importer::catalog_importer_trait::CatalogImporter;
use crate::importer::deletion_reconciler::DeletionReconciler;
use crate::importer::dimension_reconciler::DimensionReconciler;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::file_parser::{FeedSource, SourceRow};
use crate::importer::product_normalizer::ProductNormalizer;
use crate::importer::row_parser::RowParser;
use crate::perf::PerfGuard;
use crate::repository::{DimensionRepository, ImportRunRepository, ProductRepository};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PhaseTracker - 导入状态机
// ==========================================
#[derive(Debug)]
pub struct PhaseTracker {
    phase: ImportPhase,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: ImportPhase::Idle,
        }
    }

    pub fn current(&self) -> ImportPhase {
        self.phase
    }

    /// 状态迁移（非法迁移返回内部错误）
    pub fn advance(&mut self, next: ImportPhase) -> ImporterResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(ImportError::InvalidPhaseTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!(from = %self.phase, to = %next, "导入状态迁移");
        self.phase = next;
        Ok(())
    }
}

// ==========================================
// CatalogImporterImpl - 目录导入器实现
// ==========================================
pub struct CatalogImporterImpl<R, C>
where
    R: ProductRepository + DimensionRepository + ImportRunRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    row_parser: RowParser,
    normalizer: ProductNormalizer,
}

impl<R, C> CatalogImporterImpl<R, C>
where
    R: ProductRepository + DimensionRepository + ImportRunRepository,
    C: ImportConfigReader,
{
    /// 创建新的导入器实例
    ///
    /// # 参数
    /// - repo: 目录仓储（商品/维度/运行台账）
    /// - config: 配置读取器（批次大小）
    pub fn new(repo: R, config: C) -> Self {
        Self {
            repo,
            config,
            row_parser: RowParser,
            normalizer: ProductNormalizer,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    async fn batch_size(&self) -> usize {
        match self.config.get_batch_size().await {
            Ok(size) => size,
            Err(e) => {
                warn!(error = %e, default = DEFAULT_BATCH_SIZE, "读取批次大小失败，使用默认值");
                DEFAULT_BATCH_SIZE
            }
        }
    }

    /// 单行: 维度对账 → 规范化
    ///
    /// # 返回
    /// - Ok(Product): 可写入的规范记录
    /// - Err(RowIssue): 该行被跳过
    async fn reconcile_row(
        &self,
        row: ParsedCatalogRow,
        dimensions: &mut DimensionReconciler<'_, R>,
    ) -> Result<Product, RowIssue> {
        let row_number = row.row_number;

        let vendor_id = match dimensions
            .resolve(
                DimensionKind::Vendor,
                row.vendor_id.as_deref(),
                row.vendor_name.as_deref(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                let (kind, message) = match row.vendor_id {
                    None => (
                        RowIssueKind::MissingVendor,
                        ImportError::MissingVendor { row: row_number }.to_string(),
                    ),
                    Some(_) => (RowIssueKind::VendorUnresolved, e.to_string()),
                };
                warn!(row = row_number, product_id = %row.product_id, %kind, "跳过该行: {}", message);
                return Err(RowIssue {
                    row_number,
                    product_id: Some(row.product_id),
                    kind,
                    message,
                });
            }
        };

        // 制造商对账失败时降级为占位编号，此处不会返回 Err
        let manufacturer_id = match dimensions
            .resolve(
                DimensionKind::Manufacturer,
                row.manufacturer_id.as_deref(),
                row.manufacturer_name.as_deref(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(row = row_number, error = %e, "制造商对账失败，使用占位编号");
                crate::importer::row_parser::generate_id()
            }
        };

        Ok(self
            .normalizer
            .normalize(row, vendor_id, manufacturer_id, Utc::now()))
    }

    /// 写入运行台账（失败仅记录日志）
    async fn record_run(
        &self,
        run_id: &str,
        source: &str,
        status: RunStatus,
        started_at: DateTime<Utc>,
        summary: &ImportSummary,
        error_message: Option<String>,
    ) {
        let run = ImportRun {
            run_id: run_id.to_string(),
            source: source.to_string(),
            status,
            started_at,
            finished_at: Utc::now(),
            total_rows: summary.total_rows as i64,
            processed_rows: summary.processed_rows as i64,
            skipped_rows: summary.skipped_rows as i64,
            products_flagged: summary.products_flagged as i64,
            error_message,
            summary_json: serde_json::to_string(summary).ok(),
        };

        if let Err(e) = self.repo.insert_run(run).await {
            warn!(run_id = %run_id, error = %e, "运行台账写入失败");
        }
    }
}

#[async_trait::async_trait]
impl<R, C> CatalogImporter for CatalogImporterImpl<R, C>
where
    R: ProductRepository + DimensionRepository + ImportRunRepository,
    C: ImportConfigReader,
{
    #[instrument(skip(self, source), fields(run_id, feed = %source.describe()))]
    async fn import_catalog(&self, source: FeedSource) -> ImporterResult<ImportResult> {
        let _perf = PerfGuard::new("import_catalog");
        let start_time = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let source_desc = source.describe();
        tracing::Span::current().record("run_id", run_id.as_str());

        info!(run_id = %run_id, source = %source_desc, "开始导入商品目录");

        let mut phase = PhaseTracker::new();
        let mut summary = ImportSummary::default();
        let batch_size = self.batch_size().await;

        // === Idle → Streaming: 打开数据源 ===
        let mut rows = match source.open() {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "数据源打开失败");
                self.record_run(&run_id, &source_desc, RunStatus::Failed, started_at, &summary, Some(e.to_string()))
                    .await;
                return Err(e);
            }
        };
        phase.advance(ImportPhase::Streaming)?;

        let missing = self.row_parser.missing_columns(rows.headers());
        if !missing.is_empty() {
            warn!(missing = ?missing, "表头缺少标准列，对应字段按缺失处理");
        }

        let mut dimensions = DimensionReconciler::new(&self.repo);
        let mut writer = BatchUpsertWriter::new(&self.repo, batch_size);
        let mut observed: HashSet<String> = HashSet::new();
        let mut row_issues: Vec<RowIssue> = Vec::new();

        // === Streaming: 逐行处理 ===
        while let Some(next) = rows.next_row() {
            match next {
                Ok(SourceRow::Record { row_number, fields }) => {
                    summary.total_rows += 1;
                    let parsed = self.row_parser.parse(&fields, row_number);

                    match self.reconcile_row(parsed, &mut dimensions).await {
                        Ok(product) => {
                            observed.insert(product.product_id.clone());
                            summary.processed_rows += 1;
                            writer.push(row_number, product).await;
                        }
                        Err(issue) => row_issues.push(issue),
                    }
                }
                Ok(SourceRow::Undecodable { row_number, message }) => {
                    summary.total_rows += 1;
                    let message = ImportError::RecordDecodeError {
                        row: row_number,
                        message,
                    }
                    .to_string();
                    warn!(row = row_number, "跳过该行: {}", message);
                    row_issues.push(RowIssue {
                        row_number,
                        product_id: None,
                        kind: RowIssueKind::RecordDecodeError,
                        message,
                    });
                }
                Err(e) => {
                    // === Streaming → Failed: 不写入剩余批次、不清扫 ===
                    phase.advance(ImportPhase::Failed)?;
                    error!(error = %e, rows_read = summary.total_rows, "数据流读取失败，中止导入");
                    summary.skipped_rows = row_issues.len();
                    self.record_run(&run_id, &source_desc, RunStatus::Failed, started_at, &summary, Some(e.to_string()))
                        .await;
                    return Err(e);
                }
            }
        }

        // === Streaming → Draining: 写入最后一个批次 ===
        phase.advance(ImportPhase::Draining)?;
        writer.flush().await;

        // === Draining → Sweeping: 删除对账 ===
        phase.advance(ImportPhase::Sweeping)?;
        match DeletionReconciler::new(&self.repo).sweep(&observed).await {
            Ok(flagged) => summary.products_flagged = flagged,
            Err(e) => {
                error!(error = %e, "删除对账失败");
                summary.sweep_failed = true;
            }
        }
        phase.advance(ImportPhase::Done)?;

        let batch_stats = writer.stats();
        let dimension_stats = dimensions.stats();
        summary.skipped_rows = row_issues.len();
        summary.batches_flushed = batch_stats.batches_flushed;
        summary.batches_failed = batch_stats.batches_failed;
        summary.products_written = batch_stats.products_written;
        summary.products_rejected = batch_stats.products_rejected;
        summary.products_dropped = batch_stats.products_dropped;
        summary.vendors_written = dimension_stats.vendors_written;
        summary.manufacturers_written = dimension_stats.manufacturers_written;
        summary.manufacturer_placeholders = dimension_stats.placeholders_issued;
        summary.dimension_lookups = dimension_stats.store_lookups;
        summary.dimension_cache_hits = dimension_stats.cache_hits;

        // 被拒绝的行已计入 processed_rows，不计入 skipped_rows
        row_issues.extend(writer.take_rejected());
        row_issues.sort_by_key(|issue| issue.row_number);

        self.record_run(&run_id, &source_desc, RunStatus::Done, started_at, &summary, None)
            .await;

        let elapsed_time = start_time.elapsed();
        info!(
            run_id = %run_id,
            total_rows = summary.total_rows,
            processed_rows = summary.processed_rows,
            skipped_rows = summary.skipped_rows,
            products_written = summary.products_written,
            products_rejected = summary.products_rejected,
            batches_failed = summary.batches_failed,
            products_flagged = summary.products_flagged,
            dimension_lookups = summary.dimension_lookups,
            dimension_cache_hits = summary.dimension_cache_hits,
            elapsed_ms = elapsed_time.as_millis() as u64,
            "商品目录导入完成"
        );

        Ok(ImportResult {
            run_id,
            source: source_desc,
            phase: phase.current(),
            summary,
            row_issues,
            elapsed_time,
        })
    }
}
