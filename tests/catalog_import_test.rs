// ==========================================
// CatalogImporter 集成测试
// ==========================================
// 测试目标: 验证完整的目录导入流程（upsert / 维度对账 / 标记-清扫）
// ==========================================

mod test_helpers;

use catalog_sync::config::config_keys;
use catalog_sync::domain::{
    DimensionKind, ImportPhase, Product, ProductVariant, RowIssueKind, RunStatus,
};
use catalog_sync::importer::{CatalogImporter, FeedSource, ImportError};
use catalog_sync::logging;
use catalog_sync::repository::{
    CatalogRepositoryImpl, DimensionRepository, ImportRunRepository, ProductRepository,
};
use chrono::{TimeZone, Utc};
use std::io::{Cursor, Read};
use test_helpers::{create_test_db, create_test_importer, csv_feed, row, set_config, simple_row};

/// 去掉写入时间后用于比较
fn without_timestamp(product: &Product) -> Product {
    let mut p = product.clone();
    p.updated_at = Utc.timestamp_opt(0, 0).single().expect("epoch");
    p
}

async fn load(repo: &CatalogRepositoryImpl, product_id: &str) -> Option<Product> {
    repo.find_product(product_id).await.expect("find_product")
}

#[tokio::test]
async fn test_example_scenario_rename_and_sweep() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    // 第一次: 同一供应商两个名称，后者生效
    let result = importer
        .import_catalog(csv_feed(&[
            simple_row("P1", "V1", "Acme"),
            simple_row("P2", "V1", "Acme Corp"),
        ]))
        .await
        .expect("import should succeed");

    assert_eq!(result.phase, ImportPhase::Done);
    assert_eq!(result.summary.total_rows, 2);
    assert_eq!(result.summary.processed_rows, 2);
    assert_eq!(result.summary.products_written, 2);
    assert_eq!(result.summary.products_flagged, 0);

    let vendor = importer
        .repository()
        .find_dimension(DimensionKind::Vendor, "V1")
        .await
        .unwrap()
        .expect("vendor V1 should exist");
    assert_eq!(vendor.name.as_deref(), Some("Acme Corp"));
    assert_eq!(importer.repository().count_dimensions(DimensionKind::Vendor).await.unwrap(), 1);

    for id in ["P1", "P2"] {
        let product = load(importer.repository(), id).await.expect("product should exist");
        assert_eq!(product.vendor_id, "V1");
        assert!(!product.is_deleted);
    }

    // 第二次: 只有 P1
    let result = importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme Corp")]))
        .await
        .expect("import should succeed");

    assert_eq!(result.summary.products_flagged, 1);
    assert!(!load(importer.repository(), "P1").await.unwrap().is_deleted);
    assert!(load(importer.repository(), "P2").await.unwrap().is_deleted);
}

#[tokio::test]
async fn test_import_is_idempotent() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let feed = || {
        csv_feed(&[
            simple_row("P1", "V1", "Acme"),
            simple_row("P2", "V2", "Beta"),
            simple_row("P3", "V1", "Acme"),
        ])
    };

    importer.import_catalog(feed()).await.expect("first import");
    let mut first = Vec::new();
    for id in ["P1", "P2", "P3"] {
        first.push(without_timestamp(&load(importer.repository(), id).await.unwrap()));
    }

    let second_result = importer.import_catalog(feed()).await.expect("second import");
    let mut second = Vec::new();
    for id in ["P1", "P2", "P3"] {
        second.push(without_timestamp(&load(importer.repository(), id).await.unwrap()));
    }

    assert_eq!(first, second);
    assert_eq!(second_result.summary.products_flagged, 0);
    assert_eq!(second_result.summary.vendors_written, 0);
    assert_eq!(second_result.summary.manufacturers_written, 0);
    assert_eq!(importer.repository().count_products(true).await.unwrap(), 3);
    assert_eq!(importer.repository().count_dimensions(DimensionKind::Vendor).await.unwrap(), 2);
}

#[tokio::test]
async fn test_upsert_last_row_wins() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let result = importer
        .import_catalog(csv_feed(&[
            row("P1", "I1", "Old Name", "V1", "Acme", "M1", "GloveCo", "Size S"),
            simple_row("P2", "V1", "Acme"),
            row("P1", "I1", "New Name", "V1", "Acme", "M1", "GloveCo", "Size L"),
        ]))
        .await
        .expect("import should succeed");

    assert_eq!(result.summary.processed_rows, 3);
    assert_eq!(importer.repository().count_products(true).await.unwrap(), 2);

    let product = load(importer.repository(), "P1").await.unwrap();
    assert_eq!(product.name.as_deref(), Some("New Name"));
    assert_eq!(product.description.as_deref(), Some("New Name description"));
    assert_eq!(
        product.variants,
        vec![ProductVariant {
            description: Some("Size L".to_string()),
            packaging: Some("BOX".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_variants_are_replaced_not_accumulated() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    for size in ["Size S", "Size M", "Size L"] {
        importer
            .import_catalog(csv_feed(&[row("P1", "I1", "Gloves", "V1", "Acme", "M1", "GloveCo", size)]))
            .await
            .expect("import should succeed");
    }

    let product = load(importer.repository(), "P1").await.unwrap();
    assert_eq!(product.variants.len(), 1);
    assert_eq!(product.variants[0].description.as_deref(), Some("Size L"));
}

#[tokio::test]
async fn test_soft_deleted_product_reappears() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme"), simple_row("P2", "V1", "Acme")]))
        .await
        .unwrap();
    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme")]))
        .await
        .unwrap();
    assert!(load(importer.repository(), "P2").await.unwrap().is_deleted);

    let result = importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme"), simple_row("P2", "V1", "Acme")]))
        .await
        .unwrap();

    assert_eq!(result.summary.products_flagged, 0);
    assert!(!load(importer.repository(), "P2").await.unwrap().is_deleted);
    assert_eq!(importer.repository().count_products(false).await.unwrap(), 2);
}

#[tokio::test]
async fn test_already_deleted_products_are_not_recounted() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme"), simple_row("P2", "V1", "Acme")]))
        .await
        .unwrap();

    let first = importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme")]))
        .await
        .unwrap();
    let second = importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme")]))
        .await
        .unwrap();

    assert_eq!(first.summary.products_flagged, 1);
    assert_eq!(second.summary.products_flagged, 0);
}

#[tokio::test]
async fn test_missing_vendor_skips_row() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let result = importer
        .import_catalog(csv_feed(&[
            simple_row("P1", "V1", "Acme"),
            row("P2", "I2", "Masks", "", "", "M1", "GloveCo", "Size M"),
        ]))
        .await
        .expect("row-level errors do not fail the run");

    assert_eq!(result.phase, ImportPhase::Done);
    assert_eq!(result.summary.total_rows, 2);
    assert_eq!(result.summary.processed_rows, 1);
    assert_eq!(result.summary.skipped_rows, 1);
    assert!(result.summary.has_partial_failures());

    assert_eq!(result.row_issues.len(), 1);
    let issue = &result.row_issues[0];
    assert_eq!(issue.row_number, 2);
    assert_eq!(issue.kind, RowIssueKind::MissingVendor);
    assert_eq!(issue.product_id.as_deref(), Some("P2"));

    assert!(load(importer.repository(), "P2").await.is_none());
}

#[tokio::test]
async fn test_skipped_row_does_not_keep_existing_product_live() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme"), simple_row("P2", "V1", "Acme")]))
        .await
        .unwrap();

    let result = importer
        .import_catalog(csv_feed(&[
            simple_row("P1", "V1", "Acme"),
            row("P2", "I-P2", "Product P2", "", "", "M1", "GloveCo", "Size M"),
        ]))
        .await
        .unwrap();

    assert_eq!(result.summary.products_flagged, 1);
    assert!(load(importer.repository(), "P2").await.unwrap().is_deleted);
}

#[tokio::test]
async fn test_missing_manufacturer_gets_placeholder() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let result = importer
        .import_catalog(csv_feed(&[row("P1", "I1", "Gloves", "V1", "Acme", "", "", "Size M")]))
        .await
        .unwrap();

    assert_eq!(result.summary.processed_rows, 1);
    assert!(result.row_issues.is_empty());

    let product = load(importer.repository(), "P1").await.unwrap();
    let manufacturer_id = product.manufacturer_id.expect("placeholder expected");
    assert!(!manufacturer_id.is_empty());
    assert_eq!(
        importer.repository().count_dimensions(DimensionKind::Manufacturer).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_missing_ids_are_generated() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let result = importer
        .import_catalog(csv_feed(&[
            row("", "", "Gloves", "V1", "Acme", "M1", "GloveCo", "Size M"),
            row("", "", "Masks", "V1", "Acme", "M1", "GloveCo", "Size M"),
        ]))
        .await
        .unwrap();

    assert_eq!(result.summary.products_written, 2);
    assert_eq!(importer.repository().count_products(false).await.unwrap(), 2);
}

#[tokio::test]
async fn test_item_id_collision_rejects_only_that_row() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    set_config(&db_path, config_keys::BATCH_SIZE, "2");
    let importer = create_test_importer(&db_path);

    // P3 与 P1 的 ItemID 冲突，同批的 P4 照常写入
    let result = importer
        .import_catalog(csv_feed(&[
            row("P1", "I1", "A", "V1", "Acme", "M1", "GloveCo", "S"),
            row("P2", "I2", "B", "V1", "Acme", "M1", "GloveCo", "S"),
            row("P3", "I1", "C", "V1", "Acme", "M1", "GloveCo", "S"),
            row("P4", "I4", "D", "V1", "Acme", "M1", "GloveCo", "S"),
            row("P5", "I5", "E", "V1", "Acme", "M1", "GloveCo", "S"),
        ]))
        .await
        .expect("write rejections do not fail the run");

    assert_eq!(result.phase, ImportPhase::Done);
    assert_eq!(result.summary.batches_flushed, 3);
    assert_eq!(result.summary.batches_failed, 0);
    assert_eq!(result.summary.products_written, 4);
    assert_eq!(result.summary.products_rejected, 1);
    assert_eq!(result.summary.products_dropped, 0);
    assert_eq!(result.summary.skipped_rows, 0);
    assert!(result.summary.has_partial_failures());

    assert_eq!(result.row_issues.len(), 1);
    let issue = &result.row_issues[0];
    assert_eq!(issue.row_number, 3);
    assert_eq!(issue.kind, RowIssueKind::WriteRejected);
    assert_eq!(issue.product_id.as_deref(), Some("P3"));

    for live in ["P1", "P2", "P4", "P5"] {
        assert!(load(importer.repository(), live).await.is_some(), "{} written", live);
    }
    assert!(load(importer.repository(), "P3").await.is_none());
}

#[tokio::test]
async fn test_summary_reports_dimension_cache_usage() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let result = importer
        .import_catalog(csv_feed(&[
            simple_row("P1", "V1", "Acme"),
            simple_row("P2", "V1", "Acme"),
            simple_row("P3", "V1", "Acme"),
            row("P4", "I4", "D", "V1", "Acme", "", "", "S"),
        ]))
        .await
        .unwrap();

    // 供应商 V1 与制造商 M1 各查询一次，其余命中缓存
    assert_eq!(result.summary.dimension_lookups, 2);
    assert_eq!(result.summary.dimension_cache_hits, 5);
    assert_eq!(result.summary.manufacturer_placeholders, 1);
    assert_eq!(result.summary.vendors_written, 1);
    assert_eq!(result.summary.manufacturers_written, 1);
}

#[tokio::test]
async fn test_item_id_moves_from_retired_product() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[row("P1", "I1", "A", "V1", "Acme", "M1", "GloveCo", "S")]))
        .await
        .unwrap();

    // P1 仍存活时 I1 被 P2 占用: 只拒绝 P2，P1 随后被清扫
    let feed = [
        row("P3", "I3", "C", "V1", "Acme", "M1", "GloveCo", "S"),
        row("P2", "I1", "B", "V1", "Acme", "M1", "GloveCo", "S"),
        row("P4", "I4", "D", "V1", "Acme", "M1", "GloveCo", "S"),
    ];
    let second = importer.import_catalog(csv_feed(&feed)).await.unwrap();

    assert_eq!(second.summary.batches_failed, 0);
    assert_eq!(second.summary.products_written, 2);
    assert_eq!(second.summary.products_rejected, 1);
    assert_eq!(second.summary.products_flagged, 1);
    assert!(load(importer.repository(), "P2").await.is_none());
    assert!(load(importer.repository(), "P3").await.is_some());
    assert!(load(importer.repository(), "P4").await.is_some());
    assert!(load(importer.repository(), "P1").await.unwrap().is_deleted);

    // 下一次运行时 I1 已释放
    let third = importer.import_catalog(csv_feed(&feed)).await.unwrap();
    assert_eq!(third.summary.products_rejected, 0);
    assert_eq!(third.summary.products_written, 3);
    let p2 = load(importer.repository(), "P2").await.expect("P2 written");
    assert_eq!(p2.item_id, "I1");
    assert!(!p2.is_deleted);
}

#[tokio::test]
async fn test_undecodable_row_is_skipped() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let mut data = format!("{}\n{}\n", test_helpers::HEADER, simple_row("P1", "V1", "Acme")).into_bytes();
    data.extend_from_slice(b"P2,I2,");
    data.extend_from_slice(&[0xff, 0xfe]);
    data.extend_from_slice(b",,BOX,V1,Acme,M1,GloveCo,Size M\n");
    data.extend_from_slice(format!("{}\n", simple_row("P3", "V1", "Acme")).as_bytes());

    let result = importer
        .import_catalog(FeedSource::reader("broken-utf8", Cursor::new(data)))
        .await
        .expect("decode errors are row-level");

    assert_eq!(result.summary.total_rows, 3);
    assert_eq!(result.summary.processed_rows, 2);
    assert_eq!(result.row_issues.len(), 1);
    assert_eq!(result.row_issues[0].kind, RowIssueKind::RecordDecodeError);
    assert_eq!(result.row_issues[0].row_number, 2);
}

/// 读取完给定数据后返回 I/O 错误
struct FailingReader {
    data: Cursor<Vec<u8>>,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.data.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "feed connection reset",
        ))
    }
}

#[tokio::test]
async fn test_stream_failure_aborts_without_sweep() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme"), simple_row("P9", "V1", "Acme")]))
        .await
        .unwrap();

    let data = format!("{}\n{}\n", test_helpers::HEADER, simple_row("P1", "V1", "Acme")).into_bytes();
    let reader = FailingReader {
        data: Cursor::new(data),
    };

    let result = importer
        .import_catalog(FeedSource::reader("flaky-feed", reader))
        .await;

    assert!(matches!(result, Err(ImportError::StreamError { .. })), "got {:?}", result);

    // 未执行删除对账
    assert!(!load(importer.repository(), "P9").await.unwrap().is_deleted);

    let runs = importer.repository().get_recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    let failed = runs
        .iter()
        .find(|r| r.source == "flaky-feed")
        .expect("failed run recorded");
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(failed.error_message.is_some());
}

#[tokio::test]
async fn test_missing_file_fails_and_is_recorded() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme")]))
        .await
        .unwrap();

    let result = importer
        .import_catalog(FeedSource::path("does/not/exist.csv"))
        .await;

    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    assert!(!load(importer.repository(), "P1").await.unwrap().is_deleted);

    let runs = importer.repository().get_recent_runs(10).await.unwrap();
    assert!(runs.iter().any(|r| r.status == RunStatus::Failed));
}

#[tokio::test]
async fn test_empty_feed_flags_all_live_products() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    importer
        .import_catalog(csv_feed(&[simple_row("P1", "V1", "Acme"), simple_row("P2", "V1", "Acme")]))
        .await
        .unwrap();

    let result = importer.import_catalog(csv_feed(&[])).await.unwrap();

    assert_eq!(result.summary.total_rows, 0);
    assert_eq!(result.summary.products_flagged, 2);
    assert_eq!(importer.repository().count_products(false).await.unwrap(), 0);
    assert_eq!(importer.repository().count_products(true).await.unwrap(), 2);
}

#[tokio::test]
async fn test_import_from_csv_file_records_ledger() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let csv_file = test_helpers::write_csv_file(&[
        simple_row("P1", "V1", "Acme"),
        simple_row("P2", "V2", "Beta"),
    ])
    .expect("Failed to write csv");

    let result = importer
        .import_catalog(FeedSource::path(csv_file.path()))
        .await
        .expect("import should succeed");

    assert_eq!(result.summary.products_written, 2);
    assert_eq!(result.summary.vendors_written, 2);
    assert_eq!(result.summary.manufacturers_written, 1);

    let runs = importer.repository().get_recent_runs(1).await.unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.run_id, result.run_id);
    assert_eq!(run.status, RunStatus::Done);
    assert_eq!(run.total_rows, 2);
    assert_eq!(run.processed_rows, 2);
    assert!(run.summary_json.is_some());
}

#[tokio::test]
async fn test_xlsx_feed_import_end_to_end() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);
    let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/catalog_feed.xlsx");

    let result = importer
        .import_catalog(FeedSource::path(fixture))
        .await
        .expect("xlsx import should succeed");

    assert_eq!(result.phase, ImportPhase::Done);
    assert_eq!(result.summary.total_rows, 2);
    assert_eq!(result.summary.processed_rows, 2);
    assert!(result.row_issues.is_empty());

    let repo = importer.repository();
    let gloves = load(repo, "123").await.expect("numeric ProductID stored as text");
    assert_eq!(gloves.item_id, "456");
    assert_eq!(gloves.name.as_deref(), Some("Gloves"));
    assert_eq!(gloves.description.as_deref(), Some("Nitrile gloves"));
    assert_eq!(gloves.vendor_id, "V1");
    assert_eq!(gloves.manufacturer_id.as_deref(), Some("M1"));
    assert_eq!(
        gloves.variants,
        vec![ProductVariant {
            description: Some("100 pcs".to_string()),
            packaging: Some("BOX".to_string()),
        }]
    );

    let masks = load(repo, "P2").await.expect("P2 stored");
    assert_eq!(masks.description, None);
    assert_ne!(masks.manufacturer_id.as_deref(), Some("M1"));

    let vendor = repo
        .find_dimension(DimensionKind::Vendor, "V1")
        .await
        .unwrap()
        .expect("vendor stored");
    assert_eq!(vendor.name.as_deref(), Some("Acme Corp"));
    let manufacturer = repo
        .find_dimension(DimensionKind::Manufacturer, "M1")
        .await
        .unwrap()
        .expect("manufacturer stored");
    assert_eq!(manufacturer.name.as_deref(), Some("GloveCo"));
}
