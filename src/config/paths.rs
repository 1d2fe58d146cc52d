// ==========================================
// 商品目录同步系统 - 数据库路径
// ==========================================

use std::path::PathBuf;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CATALOG_SYNC_DB_PATH";

/// 获取默认数据库路径
///
/// 优先级:
/// 1. 环境变量 CATALOG_SYNC_DB_PATH
/// 2. 用户数据目录 / catalog-sync / catalog.db
/// 3. ./catalog.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-sync");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
    }
}
