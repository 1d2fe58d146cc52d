// ==========================================
// 商品目录同步系统 - 目录仓储实现
// ==========================================
// 职责: 实现目录相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{DimensionKind, ImportRun, Product, ProductVariant, RunStatus};
use crate::repository::catalog_repo::{
    BatchUpsertOutcome, DimensionEntity, DimensionRepository, ImportRunRepository,
    ProductRepository, RejectedProduct,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

const PRODUCT_COLUMNS: &str = "product_id, item_id, name, description, packaging, vendor_id, \
     manufacturer_id, variants_json, is_deleted, updated_at";

/// 维度表名与主键列
fn dimension_table(kind: DimensionKind) -> (&'static str, &'static str) {
    match kind {
        DimensionKind::Vendor => ("vendor", "vendor_id"),
        DimensionKind::Manufacturer => ("manufacturer", "manufacturer_id"),
    }
}

fn parse_run_status(raw: &str) -> RunStatus {
    match raw.trim() {
        "DONE" => RunStatus::Done,
        _ => RunStatus::Failed,
    }
}

fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let variants_json: String = row.get(7)?;
    let variants: Vec<ProductVariant> = serde_json::from_str(&variants_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Product {
        product_id: row.get(0)?,
        item_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        packaging: row.get(4)?,
        vendor_id: row.get(5)?,
        manufacturer_id: row.get(6)?,
        variants,
        is_deleted: row.get::<_, i64>(8)? != 0,
        updated_at: row.get::<_, DateTime<Utc>>(9)?,
    })
}

// ==========================================
// CatalogRepositoryImpl
// ==========================================
pub struct CatalogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl ProductRepository for CatalogRepositoryImpl {
    async fn bulk_upsert_products(
        &self,
        products: Vec<Product>,
    ) -> RepositoryResult<BatchUpsertOutcome> {
        let mut outcome = BatchUpsertOutcome::default();
        if products.is_empty() {
            return Ok(outcome);
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO product (
                    product_id, item_id, name, description, packaging,
                    vendor_id, manufacturer_id, variants_json, is_deleted, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)
                ON CONFLICT(product_id) DO UPDATE SET
                    item_id = excluded.item_id,
                    name = excluded.name,
                    description = excluded.description,
                    packaging = excluded.packaging,
                    vendor_id = excluded.vendor_id,
                    manufacturer_id = excluded.manufacturer_id,
                    variants_json = excluded.variants_json,
                    is_deleted = 0,
                    updated_at = excluded.updated_at
                "#,
            )?;

            for (index, product) in products.iter().enumerate() {
                let variants_json = serde_json::to_string(&product.variants)?;

                // 每条记录一个保存点: 约束冲突只回滚该条
                tx.execute_batch("SAVEPOINT product_row")?;
                let written = stmt.execute(params![
                    product.product_id,
                    product.item_id,
                    product.name,
                    product.description,
                    product.packaging,
                    product.vendor_id,
                    product.manufacturer_id,
                    variants_json,
                    product.updated_at,
                ]);

                match written.map_err(RepositoryError::from) {
                    Ok(_) => {
                        tx.execute_batch("RELEASE product_row")?;
                        outcome.written += 1;
                    }
                    Err(e) if e.is_constraint_violation() => {
                        tx.execute_batch("ROLLBACK TO product_row; RELEASE product_row")?;
                        outcome.rejected.push(RejectedProduct {
                            index,
                            product_id: product.product_id.clone(),
                            item_id: product.item_id.clone(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(outcome)
    }

    async fn flag_missing_products(&self, observed: &HashSet<String>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 观测集合经临时表传入，避免超长 NOT IN 参数列表
        tx.execute_batch(
            r#"
            CREATE TEMP TABLE IF NOT EXISTS observed_product (product_id TEXT PRIMARY KEY);
            DELETE FROM temp.observed_product;
            "#,
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO temp.observed_product (product_id) VALUES (?1)",
            )?;
            for product_id in observed {
                stmt.execute(params![product_id])?;
            }
        }

        let flagged = tx.execute(
            r#"
            UPDATE product SET is_deleted = 1
            WHERE is_deleted = 0
              AND product_id NOT IN (SELECT product_id FROM temp.observed_product)
            "#,
            [],
        )?;

        tx.execute("DELETE FROM temp.observed_product", [])?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(flagged)
    }

    async fn find_product(&self, product_id: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM product WHERE product_id = ?1", PRODUCT_COLUMNS);
        let product = conn
            .query_row(&sql, params![product_id], map_product_row)
            .optional()?;
        Ok(product)
    }

    async fn list_live_products(&self, limit: usize) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM product WHERE is_deleted = 0 ORDER BY product_id LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![limit as i64], map_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    async fn update_description(&self, product_id: &str, description: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE product SET description = ?2 WHERE product_id = ?1",
            params![product_id, description],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            });
        }
        Ok(())
    }

    async fn count_products(&self, include_deleted: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = if include_deleted {
            "SELECT COUNT(*) FROM product"
        } else {
            "SELECT COUNT(*) FROM product WHERE is_deleted = 0"
        };
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DimensionRepository for CatalogRepositoryImpl {
    async fn find_dimension(
        &self,
        kind: DimensionKind,
        key: &str,
    ) -> RepositoryResult<Option<DimensionEntity>> {
        let (table, key_column) = dimension_table(kind);
        let conn = self.get_conn()?;
        let sql = format!("SELECT {key_column}, name FROM {table} WHERE {key_column} = ?1");

        let entity = conn
            .query_row(&sql, params![key], |row| {
                Ok(DimensionEntity {
                    kind,
                    key: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(entity)
    }

    async fn insert_dimension(
        &self,
        kind: DimensionKind,
        key: &str,
        name: Option<&str>,
    ) -> RepositoryResult<()> {
        let (table, key_column) = dimension_table(kind);
        let conn = self.get_conn()?;
        let sql = format!("INSERT INTO {table} ({key_column}, name) VALUES (?1, ?2)");
        conn.execute(&sql, params![key, name])?;
        Ok(())
    }

    async fn rename_dimension(
        &self,
        kind: DimensionKind,
        key: &str,
        name: Option<&str>,
    ) -> RepositoryResult<()> {
        let (table, key_column) = dimension_table(kind);
        let conn = self.get_conn()?;
        let sql = format!(
            "UPDATE {table} SET name = ?2, updated_at = datetime('now') WHERE {key_column} = ?1"
        );
        let updated = conn.execute(&sql, params![key, name])?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: kind.to_string(),
                id: key.to_string(),
            });
        }
        Ok(())
    }

    async fn count_dimensions(&self, kind: DimensionKind) -> RepositoryResult<usize> {
        let (table, _) = dimension_table(kind);
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

#[async_trait]
impl ImportRunRepository for CatalogRepositoryImpl {
    async fn insert_run(&self, run: ImportRun) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_run (
                run_id, source, status, started_at, finished_at,
                total_rows, processed_rows, skipped_rows, products_flagged,
                error_message, summary_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                run.run_id,
                run.source,
                run.status.as_str(),
                run.started_at,
                run.finished_at,
                run.total_rows,
                run.processed_rows,
                run.skipped_rows,
                run.products_flagged,
                run.error_message,
                run.summary_json,
            ],
        )?;
        Ok(())
    }

    async fn get_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<ImportRun>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, source, status, started_at, finished_at,
                   total_rows, processed_rows, skipped_rows, products_flagged,
                   error_message, summary_json
            FROM import_run
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                let status: String = row.get(2)?;
                Ok(ImportRun {
                    run_id: row.get(0)?,
                    source: row.get(1)?,
                    status: parse_run_status(&status),
                    started_at: row.get(3)?,
                    finished_at: row.get(4)?,
                    total_rows: row.get(5)?,
                    processed_rows: row.get(6)?,
                    skipped_rows: row.get(7)?,
                    products_flagged: row.get(8)?,
                    error_message: row.get(9)?,
                    summary_json: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
