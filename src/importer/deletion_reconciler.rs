// ==========================================
// 商品目录同步系统 - 删除对账（标记-清扫）
// ==========================================
// 职责: 数据流完整读取后，将本次未出现的存活商品标记为已删除
// 前提: 仅在数据流正常结束后调用（中途失败不得清扫）
// ==========================================

use crate::perf::PerfGuard;
use crate::repository::{ProductRepository, RepositoryResult};
use std::collections::HashSet;
use tracing::{info, warn};

pub struct DeletionReconciler<'a, P: ProductRepository + ?Sized> {
    repo: &'a P,
}

impl<'a, P: ProductRepository + ?Sized> DeletionReconciler<'a, P> {
    pub fn new(repo: &'a P) -> Self {
        Self { repo }
    }

    /// 清扫未出现的商品
    ///
    /// # 参数
    /// - observed: 本次运行观测到的 product_id 集合
    ///
    /// # 返回
    /// - Ok(usize): 新标记为删除的商品数
    pub async fn sweep(&self, observed: &HashSet<String>) -> RepositoryResult<usize> {
        let _perf = PerfGuard::new("import.sweep");
        if observed.is_empty() {
            warn!("本次数据源未观测到任何商品，将标记全部存活商品为已删除");
        }

        let flagged = self.repo.flag_missing_products(observed).await?;
        info!(observed = observed.len(), flagged, "删除对账完成");
        Ok(flagged)
    }
}
