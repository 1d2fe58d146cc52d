// ==========================================
// 商品目录同步系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id + key → value)
// 优先级: 环境变量 > config_kv > 默认值
// ==========================================

use crate::config::import_config_trait::{ConfigReadResult, ImportConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "import.batch_size";
    pub const FEED_PATH: &str = "import.feed_path";
    pub const DAILY_RUN_AT: &str = "scheduler.run_at";
    pub const ENHANCE_LIMIT: &str = "enhance.limit";
    pub const ENHANCE_CATEGORY: &str = "enhance.category";
}

/// 默认值
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_DAILY_RUN_AT: &str = "00:00";
pub const DEFAULT_ENHANCE_LIMIT: usize = 10;
pub const DEFAULT_ENHANCE_CATEGORY: &str = "Medical";

/// 目录文件路径环境变量（CSV_FILE_PATH 为旧部署使用的名称）
pub const FEED_PATH_ENV_VARS: [&str; 2] = ["CATALOG_FEED_PATH", "CSV_FILE_PATH"];

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    use_env: bool,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            use_env: true,
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn, use_env: true }
    }

    /// 关闭环境变量覆写（测试时使用，避免受宿主环境影响）
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值（已去除首尾空白，空串视为未配置）
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigReadResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// 写入 config_kv 表（scope_id='global'），已存在则覆盖
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigReadResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigReadResult<HashMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn read_env(&self, names: &[&str]) -> Option<String> {
        if !self.use_env {
            return None;
        }
        names
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }

    fn get_usize_or_default(&self, key: &str, default: usize) -> ConfigReadResult<usize> {
        match self.get_config_value(key)? {
            Some(raw) => {
                let value: usize = raw
                    .parse()
                    .map_err(|e| format!("配置值格式错误 (key: {}, value: {}): {}", key, raw, e))?;
                Ok(value)
            }
            None => Ok(default),
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ConfigReadResult<usize> {
        let size = self.get_usize_or_default(config_keys::BATCH_SIZE, DEFAULT_BATCH_SIZE)?;
        if size == 0 {
            return Err(format!("配置值非法 (key: {}): 批次大小必须 >= 1", config_keys::BATCH_SIZE).into());
        }
        Ok(size)
    }

    async fn get_feed_path(&self) -> ConfigReadResult<Option<String>> {
        if let Some(path) = self.read_env(&FEED_PATH_ENV_VARS) {
            return Ok(Some(path));
        }
        self.get_config_value(config_keys::FEED_PATH)
    }

    async fn get_daily_run_at(&self) -> ConfigReadResult<NaiveTime> {
        let raw = self
            .get_config_value(config_keys::DAILY_RUN_AT)?
            .unwrap_or_else(|| DEFAULT_DAILY_RUN_AT.to_string());

        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|e| {
            format!(
                "配置值格式错误 (key: {}, value: {}): 期望 HH:MM ({})",
                config_keys::DAILY_RUN_AT,
                raw,
                e
            )
            .into()
        })
    }

    async fn get_enhance_limit(&self) -> ConfigReadResult<usize> {
        self.get_usize_or_default(config_keys::ENHANCE_LIMIT, DEFAULT_ENHANCE_LIMIT)
    }

    async fn get_enhance_category(&self) -> ConfigReadResult<String> {
        Ok(self
            .get_config_value(config_keys::ENHANCE_CATEGORY)?
            .unwrap_or_else(|| DEFAULT_ENHANCE_CATEGORY.to_string()))
    }
}
