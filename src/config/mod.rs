// ==========================================
// 商品目录同步系统 - 配置层
// ==========================================
// 职责: 系统配置管理（环境变量 + config_kv 表 + 默认值）
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod paths;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{ConfigReadResult, ImportConfigReader};
pub use paths::get_default_db_path;
