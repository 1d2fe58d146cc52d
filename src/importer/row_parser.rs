// ==========================================
// 商品目录同步系统 - 行解析器
// ==========================================
// 职责: 原始行记录 → ParsedCatalogRow
// 规则:
// - 值去除首尾空白，空串视为缺失
// - ProductID / ItemID 缺失时生成新的唯一编号
// - 不做业务校验（供应商必填由维度对账负责）
// ==========================================

use crate::domain::ParsedCatalogRow;
use crate::importer::file_parser::RawRecord;
use uuid::Uuid;

// ==========================================
// 源字段名
// ==========================================
pub mod columns {
    pub const PRODUCT_ID: &str = "ProductID";
    pub const ITEM_ID: &str = "ItemID";
    pub const NAME: &str = "Name";
    pub const DESCRIPTION: &str = "Description";
    pub const PACKAGING: &str = "Packaging";
    pub const VENDOR_ID: &str = "VendorID";
    pub const VENDOR_NAME: &str = "VendorName";
    pub const MANUFACTURER_ID: &str = "ManufacturerID";
    pub const MANUFACTURER_NAME: &str = "ManufacturerName";
    pub const ITEM_DESCRIPTION: &str = "ItemDescription";

    pub const ALL: [&str; 10] = [
        PRODUCT_ID,
        ITEM_ID,
        NAME,
        DESCRIPTION,
        PACKAGING,
        VENDOR_ID,
        VENDOR_NAME,
        MANUFACTURER_ID,
        MANUFACTURER_NAME,
        ITEM_DESCRIPTION,
    ];
}

/// 生成新的唯一编号
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn field(raw: &RawRecord, column: &str) -> Option<String> {
    raw.get(column)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ==========================================
// RowParser - 行解析器（纯函数）
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct RowParser;

impl RowParser {
    /// 解析一行
    ///
    /// # 参数
    /// - raw: 原始行记录（列名 → 值）
    /// - row_number: 数据行号（用于日志与跳过明细）
    pub fn parse(&self, raw: &RawRecord, row_number: usize) -> ParsedCatalogRow {
        ParsedCatalogRow {
            row_number,
            product_id: field(raw, columns::PRODUCT_ID).unwrap_or_else(generate_id),
            item_id: field(raw, columns::ITEM_ID).unwrap_or_else(generate_id),
            name: field(raw, columns::NAME),
            description: field(raw, columns::DESCRIPTION),
            packaging: field(raw, columns::PACKAGING),
            vendor_id: field(raw, columns::VENDOR_ID),
            vendor_name: field(raw, columns::VENDOR_NAME),
            manufacturer_id: field(raw, columns::MANUFACTURER_ID),
            manufacturer_name: field(raw, columns::MANUFACTURER_NAME),
            item_description: field(raw, columns::ITEM_DESCRIPTION),
        }
    }

    /// 返回表头中缺失的标准列（仅用于告警）
    pub fn missing_columns<'a>(&self, headers: impl IntoIterator<Item = &'a String>) -> Vec<&'static str> {
        let present: Vec<&String> = headers.into_iter().collect();
        columns::ALL
            .iter()
            .filter(|c| !present.iter().any(|h| h.as_str() == **c))
            .copied()
            .collect()
    }
}
