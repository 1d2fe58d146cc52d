// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、导入器构造、CSV 数据生成
// ==========================================

#![allow(dead_code)]

use catalog_sync::config::ConfigManager;
use catalog_sync::db::{ensure_schema, open_sqlite_connection};
use catalog_sync::importer::{CatalogImporterImpl, FeedSource};
use catalog_sync::repository::CatalogRepositoryImpl;
use rusqlite::Connection;
use std::error::Error;
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

/// 标准表头
pub const HEADER: &str = "ProductID,ItemID,Name,Description,Packaging,VendorID,VendorName,ManufacturerID,ManufacturerName,ItemDescription";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(open_sqlite_connection(db_path)?)
}

/// 测试用配置管理器（忽略宿主环境变量）
pub fn create_test_config(db_path: &str) -> ConfigManager {
    ConfigManager::new(db_path)
        .expect("Failed to create ConfigManager")
        .without_env()
}

/// 创建测试用的导入器
pub fn create_test_importer(db_path: &str) -> CatalogImporterImpl<CatalogRepositoryImpl, ConfigManager> {
    let repo = CatalogRepositoryImpl::new(db_path).expect("Failed to create CatalogRepository");
    CatalogImporterImpl::new(repo, create_test_config(db_path))
}

/// 写入配置项
pub fn set_config(db_path: &str, key: &str, value: &str) {
    create_test_config(db_path)
        .set_config_value(key, value)
        .expect("Failed to set config");
}

/// 构造一行 CSV（按标准表头顺序）
#[allow(clippy::too_many_arguments)]
pub fn row(
    product_id: &str,
    item_id: &str,
    name: &str,
    vendor_id: &str,
    vendor_name: &str,
    manufacturer_id: &str,
    manufacturer_name: &str,
    item_description: &str,
) -> String {
    format!(
        "{},{},{},{} description,BOX,{},{},{},{},{}",
        product_id,
        item_id,
        name,
        name,
        vendor_id,
        vendor_name,
        manufacturer_id,
        manufacturer_name,
        item_description
    )
}

/// 简单行: 指定商品与供应商，制造商固定为 M1
pub fn simple_row(product_id: &str, vendor_id: &str, vendor_name: &str) -> String {
    row(
        product_id,
        &format!("I-{}", product_id),
        &format!("Product {}", product_id),
        vendor_id,
        vendor_name,
        "M1",
        "GloveCo",
        "Size M",
    )
}

/// 构造内存 CSV 数据源
pub fn csv_feed(rows: &[String]) -> FeedSource {
    let mut data = String::from(HEADER);
    data.push('\n');
    for r in rows {
        data.push_str(r);
        data.push('\n');
    }
    FeedSource::reader("test-feed", Cursor::new(data))
}

/// 写入临时 CSV 文件
pub fn write_csv_file(rows: &[String]) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    writeln!(file, "{}", HEADER)?;
    for r in rows {
        writeln!(file, "{}", r)?;
    }
    file.flush()?;
    Ok(file)
}
