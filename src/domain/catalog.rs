// ==========================================
// 商品目录同步系统 - 目录实体
// ==========================================
// 职责: Product / Vendor / Manufacturer 及解析后的行记录
// 对齐: product / vendor / manufacturer 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ProductVariant - 商品规格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub description: Option<String>, // 规格描述（ItemDescription）
    pub packaging: Option<String>,   // 包装
}

// ==========================================
// Product - 商品（规范记录）
// ==========================================
// 自然键: product_id
// 每次导入以当前行整体覆盖（包括 variants 与 is_deleted）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,              // 商品编号（自然键）
    pub item_id: String,                 // 货品编号（唯一）
    pub name: Option<String>,            // 名称
    pub description: Option<String>,     // 描述
    pub packaging: Option<String>,       // 包装
    pub vendor_id: String,               // 供应商编号（必填）
    pub manufacturer_id: Option<String>, // 制造商编号
    pub variants: Vec<ProductVariant>,   // 规格列表
    pub is_deleted: bool,                // 软删除标记
    pub updated_at: DateTime<Utc>,       // 最近一次写入时间
}

// ==========================================
// Vendor / Manufacturer - 参考维度
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub manufacturer_id: String,
    pub name: Option<String>,
}

// ==========================================
// ParsedCatalogRow - 解析后的目录行
// ==========================================
// 由 RowParser 生成: 已去空白、空串归一为 None、缺失主键已补齐
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCatalogRow {
    pub row_number: usize,                 // 数据行号（从 1 开始，不含表头）
    pub product_id: String,                // ProductID（缺失时生成）
    pub item_id: String,                   // ItemID（缺失时生成）
    pub name: Option<String>,              // Name
    pub description: Option<String>,       // Description
    pub packaging: Option<String>,         // Packaging
    pub vendor_id: Option<String>,         // VendorID
    pub vendor_name: Option<String>,       // VendorName
    pub manufacturer_id: Option<String>,   // ManufacturerID
    pub manufacturer_name: Option<String>, // ManufacturerName
    pub item_description: Option<String>, // ItemDescription
}
