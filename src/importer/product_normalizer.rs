// ==========================================
// 商品目录同步系统 - 商品规范化
// ==========================================
// 职责: ParsedCatalogRow + 已解析维度编号 → Product
// 规则:
// - 每行产出一个规格（ItemDescription + Packaging）
// - is_deleted 固定为 false（本次出现即存活）
// ==========================================

use crate::domain::{ParsedCatalogRow, Product, ProductVariant};
use chrono::{DateTime, Utc};

#[derive(Debug, Default, Clone, Copy)]
pub struct ProductNormalizer;

impl ProductNormalizer {
    /// 构造规范商品记录
    ///
    /// # 参数
    /// - row: 解析后的行
    /// - vendor_id: 供应商内部编号（已解析）
    /// - manufacturer_id: 制造商内部编号（可能为占位编号）
    /// - now: 写入时间
    pub fn normalize(
        &self,
        row: ParsedCatalogRow,
        vendor_id: String,
        manufacturer_id: String,
        now: DateTime<Utc>,
    ) -> Product {
        let variant = ProductVariant {
            description: row.item_description,
            packaging: row.packaging.clone(),
        };

        Product {
            product_id: row.product_id,
            item_id: row.item_id,
            name: row.name,
            description: row.description,
            packaging: row.packaging,
            vendor_id,
            manufacturer_id: Some(manufacturer_id),
            variants: vec![variant],
            is_deleted: false,
            updated_at: now,
        }
    }
}
