// ==========================================
// 商品目录同步系统 - 命令行入口
// ==========================================
// 用法:
//   catalog-sync run [feed_path]   立即执行一次导入，输出结果 JSON
//   catalog-sync schedule          每日定时导入（Ctrl-C 退出）
//   catalog-sync init-db           创建数据库表结构
//
// 环境变量:
//   CATALOG_SYNC_DB_PATH   数据库路径
//   CATALOG_FEED_PATH      目录文件路径
//   CATALOG_SYNC_LOG_JSON  设置为 1 时输出 JSON 日志
// ==========================================

use anyhow::{bail, Context};
use catalog_sync::config::{get_default_db_path, ConfigManager};
use catalog_sync::db::{ensure_schema, open_sqlite_connection};
use catalog_sync::{logging, CatalogImporterImpl, CatalogRepositoryImpl, DailyScheduler};
use std::sync::{Arc, Mutex};

const USAGE: &str = "用法: catalog-sync <run [feed_path] | schedule | init-db>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_from_env();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();

    let db_path = get_default_db_path();
    tracing::info!("{} v{}", catalog_sync::APP_NAME, catalog_sync::VERSION);
    tracing::info!(db_path = %db_path, "使用数据库");

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    ensure_schema(&conn).context("数据库表结构初始化失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let scheduler = DailyScheduler::new(
        Arc::new(CatalogImporterImpl::new(
            CatalogRepositoryImpl::from_connection(conn.clone()),
            ConfigManager::from_connection(conn.clone()),
        )),
        Arc::new(ConfigManager::from_connection(conn.clone())),
        Arc::new(CatalogRepositoryImpl::from_connection(conn.clone())),
    );

    match command.as_str() {
        "run" => {
            let feed_path = args.next().filter(|p| !p.trim().is_empty());
            let result = scheduler.run_once(feed_path).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "schedule" => {
            scheduler.run_forever().await;
        }
        "init-db" => {
            println!("数据库已就绪: {}", db_path);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
