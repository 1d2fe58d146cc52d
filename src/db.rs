// ==========================================
// 商品目录同步系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供幂等建表（product / vendor / manufacturer / import_run / config_kv）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    if !has_table(conn, "schema_version")? {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 幂等创建目录同步所需的表结构
///
/// 说明：
/// - 自然键（product_id / vendor_id / manufacturer_id）均为主键，保证唯一
/// - manufacturer_id 不加外键：缺失制造商时商品引用的是生成的占位编号
/// - item_id 只在未删除商品间唯一（已删除商品的 item_id 可被新商品接管）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;

    if needs_item_id_migration(&tx)? {
        // v1: item_id 为列级 UNIQUE，需重建 product 表
        tx.execute_batch(
            r#"
            ALTER TABLE product RENAME TO product_v1;
            DROP INDEX IF EXISTS idx_product_vendor;
            DROP INDEX IF EXISTS idx_product_is_deleted;
            "#,
        )?;
    }

    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS vendor (
            vendor_id TEXT PRIMARY KEY,
            name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS manufacturer (
            manufacturer_id TEXT PRIMARY KEY,
            name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS product (
            product_id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL,
            name TEXT,
            description TEXT,
            packaging TEXT,
            vendor_id TEXT NOT NULL REFERENCES vendor(vendor_id),
            manufacturer_id TEXT,
            variants_json TEXT NOT NULL DEFAULT '[]',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_product_vendor ON product(vendor_id);
        CREATE INDEX IF NOT EXISTS idx_product_is_deleted ON product(is_deleted);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_product_live_item
            ON product(item_id) WHERE is_deleted = 0;

        CREATE TABLE IF NOT EXISTS import_run (
            run_id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            total_rows INTEGER NOT NULL DEFAULT 0,
            processed_rows INTEGER NOT NULL DEFAULT 0,
            skipped_rows INTEGER NOT NULL DEFAULT 0,
            products_flagged INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            summary_json TEXT
        );
        "#,
    )?;

    if has_table(&tx, "product_v1")? {
        tx.execute_batch(&format!(
            "INSERT INTO product ({cols}) SELECT {cols} FROM product_v1; DROP TABLE product_v1;",
            cols = PRODUCT_TABLE_COLUMNS
        ))?;
    }

    tx.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    tx.commit()
}

const PRODUCT_TABLE_COLUMNS: &str = "product_id, item_id, name, description, packaging, \
     vendor_id, manufacturer_id, variants_json, is_deleted, updated_at";

fn has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1",
            [name],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);
    Ok(found)
}

fn needs_item_id_migration(conn: &Connection) -> rusqlite::Result<bool> {
    if !has_table(conn, "product")? {
        return Ok(false);
    }
    Ok(matches!(read_schema_version(conn)?, Some(v) if v < 2))
}
