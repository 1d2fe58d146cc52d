// ==========================================
// 商品目录同步系统 - 维度对账器
// ==========================================
// 职责: (维度类型, 自然键, 显示名) → 稳定的内部编号
// 规则:
// - 不存在则新建；存在且名称不同则改名（后写覆盖）
// - 名称相同不产生写入
// - 供应商自然键为空/写入失败 → 错误（该行跳过）
// - 制造商自然键为空/写入失败 → 生成占位编号（不阻断）
// 缓存: 仅在单次运行内有效，随对账器一起丢弃
// ==========================================

use crate::domain::DimensionKind;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::row_parser::generate_id;
use crate::repository::{DimensionRepository, RepositoryResult};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ==========================================
// DimensionStats - 维度写入统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionStats {
    pub vendors_written: usize,
    pub manufacturers_written: usize,
    pub placeholders_issued: usize,
    pub store_lookups: usize,
    pub cache_hits: usize,
}

impl DimensionStats {
    fn record_write(&mut self, kind: DimensionKind) {
        match kind {
            DimensionKind::Vendor => self.vendors_written += 1,
            DimensionKind::Manufacturer => self.manufacturers_written += 1,
        }
    }
}

/// 对账动作（用于日志与测试）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileAction {
    Created,
    Renamed,
    Unchanged,
}

// ==========================================
// DimensionReconciler
// ==========================================
pub struct DimensionReconciler<'a, D: DimensionRepository + ?Sized> {
    repo: &'a D,
    // (维度类型, 自然键) → 本次运行已知的存储名称
    resolved: HashMap<(DimensionKind, String), Option<String>>,
    stats: DimensionStats,
}

impl<'a, D: DimensionRepository + ?Sized> DimensionReconciler<'a, D> {
    pub fn new(repo: &'a D) -> Self {
        Self {
            repo,
            resolved: HashMap::new(),
            stats: DimensionStats::default(),
        }
    }

    pub fn stats(&self) -> DimensionStats {
        self.stats
    }

    /// 解析维度并返回内部编号
    ///
    /// # 参数
    /// - kind: 维度类型
    /// - natural_key: 自然键（None 视为缺失）
    /// - display_name: 显示名称
    ///
    /// # 返回
    /// - Ok(String): 内部编号（即自然键；制造商降级时为占位编号）
    /// - Err: 供应商缺失或写入失败
    pub async fn resolve(
        &mut self,
        kind: DimensionKind,
        natural_key: Option<&str>,
        display_name: Option<&str>,
    ) -> ImporterResult<String> {
        let key = match natural_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                if kind.is_mandatory() {
                    return Err(ImportError::DimensionResolution {
                        kind,
                        key: String::new(),
                        message: "自然键为空".to_string(),
                    });
                }
                self.stats.placeholders_issued += 1;
                let placeholder = generate_id();
                debug!(%kind, placeholder = %placeholder, "自然键为空，使用占位编号");
                return Ok(placeholder);
            }
        };

        let cache_key = (kind, key.to_string());
        if let Some(known_name) = self.resolved.get(&cache_key) {
            if known_name.as_deref() == display_name {
                self.stats.cache_hits += 1;
                return Ok(key.to_string());
            }
        }

        match self.reconcile(kind, key, display_name).await {
            Ok(action) => {
                if action != ReconcileAction::Unchanged {
                    self.stats.record_write(kind);
                }
                self.resolved
                    .insert(cache_key, display_name.map(str::to_string));
                Ok(key.to_string())
            }
            Err(e) if kind.is_mandatory() => Err(ImportError::DimensionResolution {
                kind,
                key: key.to_string(),
                message: e.to_string(),
            }),
            Err(e) => {
                self.stats.placeholders_issued += 1;
                let placeholder = generate_id();
                warn!(%kind, key = %key, error = %e, placeholder = %placeholder, "维度写入失败，使用占位编号");
                Ok(placeholder)
            }
        }
    }

    /// 查询 → 新建 / 改名 / 不变
    async fn reconcile(
        &mut self,
        kind: DimensionKind,
        key: &str,
        display_name: Option<&str>,
    ) -> RepositoryResult<ReconcileAction> {
        self.stats.store_lookups += 1;

        match self.repo.find_dimension(kind, key).await? {
            None => {
                self.repo.insert_dimension(kind, key, display_name).await?;
                info!(%kind, key = %key, "新建维度记录");
                Ok(ReconcileAction::Created)
            }
            Some(existing) if existing.name.as_deref() != display_name => {
                self.repo.rename_dimension(kind, key, display_name).await?;
                info!(
                    %kind,
                    key = %key,
                    old_name = ?existing.name,
                    new_name = ?display_name,
                    "更新维度名称"
                );
                Ok(ReconcileAction::Renamed)
            }
            Some(_) => Ok(ReconcileAction::Unchanged),
        }
    }
}
