// ==========================================
// 商品目录同步系统 - 每日调度
// ==========================================
// 职责: 每天在 scheduler.run_at 执行一次导入，成功后执行描述增强
// 规则:
// - 同一时刻只有一个运行（逐次 await）
// - 单次任务错误仅记录日志，不退出循环
// - Ctrl-C 退出
// ==========================================

use crate::config::config_manager::{
    config_keys, DEFAULT_DAILY_RUN_AT, DEFAULT_ENHANCE_CATEGORY, DEFAULT_ENHANCE_LIMIT,
};
use crate::config::ImportConfigReader;
use crate::domain::ImportResult;
use crate::enhance::{DescriptionEnhancer, EnhancementRunner};
use crate::importer::{CatalogImporter, FeedSource, ImportError, ImporterResult};
use crate::repository::ProductRepository;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 计算距离下一次运行的等待时长
///
/// 当前时刻恰好等于运行时刻时，视为今天已运行，等待到明天。
pub fn delay_until_next_run(now: NaiveDateTime, run_at: NaiveTime) -> Duration {
    let mut next = now.date().and_time(run_at);
    if next <= now {
        next += ChronoDuration::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

fn default_run_at() -> NaiveTime {
    NaiveTime::parse_from_str(DEFAULT_DAILY_RUN_AT, "%H:%M").unwrap_or_default()
}

// ==========================================
// DailyScheduler
// ==========================================
pub struct DailyScheduler {
    importer: Arc<dyn CatalogImporter>,
    config: Arc<dyn ImportConfigReader>,
    products: Arc<dyn ProductRepository>,
    enhancer: Option<Arc<dyn DescriptionEnhancer>>,
}

impl DailyScheduler {
    pub fn new(
        importer: Arc<dyn CatalogImporter>,
        config: Arc<dyn ImportConfigReader>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            importer,
            config,
            products,
            enhancer: None,
        }
    }

    /// 配置描述增强（未配置时跳过增强步骤）
    pub fn with_enhancer(mut self, enhancer: Arc<dyn DescriptionEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// 执行一次任务: 导入 → 增强
    ///
    /// # 参数
    /// - feed_path: 指定文件路径；None 时读取配置
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入完成（增强失败不影响返回值）
    /// - Err: 路径未配置或导入失败
    pub async fn run_once(&self, feed_path: Option<String>) -> ImporterResult<ImportResult> {
        let feed_path = match feed_path {
            Some(path) => path,
            None => self.resolve_feed_path().await?,
        };

        let result = self
            .importer
            .import_catalog(FeedSource::path(&feed_path))
            .await?;

        self.run_enhancement().await;
        Ok(result)
    }

    async fn resolve_feed_path(&self) -> ImporterResult<String> {
        match self.config.get_feed_path().await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(ImportError::ConfigReadError {
                key: config_keys::FEED_PATH.to_string(),
                message: "未配置目录文件路径".to_string(),
            }),
            Err(e) => Err(ImportError::ConfigReadError {
                key: config_keys::FEED_PATH.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn run_enhancement(&self) {
        let Some(enhancer) = self.enhancer.as_deref() else {
            return;
        };

        let limit = self.config.get_enhance_limit().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取增强数量失败，使用默认值");
            DEFAULT_ENHANCE_LIMIT
        });
        let category = self.config.get_enhance_category().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取增强类别失败，使用默认值");
            DEFAULT_ENHANCE_CATEGORY.to_string()
        });

        let runner = EnhancementRunner::new(self.products.as_ref(), enhancer, limit, category);
        if let Err(e) = runner.run().await {
            error!(error = %e, "描述增强失败");
        }
    }

    async fn next_delay(&self) -> Duration {
        let run_at = match self.config.get_daily_run_at().await {
            Ok(run_at) => run_at,
            Err(e) => {
                warn!(error = %e, "读取运行时间失败，使用默认值 {}", DEFAULT_DAILY_RUN_AT);
                default_run_at()
            }
        };
        delay_until_next_run(Local::now().naive_local(), run_at)
    }

    /// 运行调度循环，直到 shutdown 完成
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let delay = self.next_delay().await;
            info!(delay_secs = delay.as_secs(), "等待下一次目录同步");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    match self.run_once(None).await {
                        Ok(result) => info!(
                            run_id = %result.run_id,
                            products_written = result.summary.products_written,
                            products_flagged = result.summary.products_flagged,
                            "定时目录同步完成"
                        ),
                        Err(e) => error!(error = %e, "定时目录同步失败"),
                    }
                }
                _ = &mut shutdown => {
                    info!("收到退出信号，调度停止");
                    break;
                }
            }
        }
    }

    /// 运行调度循环，直到 Ctrl-C
    pub async fn run_forever(&self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "监听退出信号失败");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }
}
