// ==========================================
// 商品目录同步系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入/调度/增强所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use chrono::NaiveTime;
use std::error::Error;

pub type ConfigReadResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（环境变量 + config_kv 表）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取批次大小
    ///
    /// # 默认值
    /// - 500
    async fn get_batch_size(&self) -> ConfigReadResult<usize>;

    /// 获取目录文件路径
    ///
    /// # 返回
    /// - Some(String): 已配置
    /// - None: 未配置（定时任务跳过本次运行）
    async fn get_feed_path(&self) -> ConfigReadResult<Option<String>>;

    /// 获取每日运行时间（本地时间）
    ///
    /// # 默认值
    /// - 00:00
    async fn get_daily_run_at(&self) -> ConfigReadResult<NaiveTime>;

    /// 获取每次增强的商品数量上限
    ///
    /// # 默认值
    /// - 10
    async fn get_enhance_limit(&self) -> ConfigReadResult<usize>;

    /// 获取增强提示词中的商品类别
    ///
    /// # 默认值
    /// - Medical
    async fn get_enhance_category(&self) -> ConfigReadResult<String>;
}
