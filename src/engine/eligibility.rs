// ==========================================
// 采购分发计划系统 - 供应商准入引擎
// ==========================================
// 红线: 不合格供应商不得进入分配候选集;本引擎无副作用
// 职责: 活跃性过滤 + 产能过滤 + 绩效阈值过滤 + 排序
// 输入: 产品类型 + 需求数量 + 阈值配置
// 输出: 排序后的合格供应商列表 (绩效降序,无绩效者排末位)
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::supplier::{
    CapacityCheck, Supplier, SupplierCapability, SupplierPerformanceMetrics,
};
use crate::domain::types::ProductType;
use crate::engine::error::{PlanningError, PlanningResult};
use crate::repository::SupplierRepository;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// EligibleSupplier - 合格供应商视图
// ==========================================
#[derive(Debug, Clone)]
pub struct EligibleSupplier {
    pub supplier: Supplier,
    pub capability: SupplierCapability,
    pub metrics: Option<SupplierPerformanceMetrics>,
    // 综合绩效得分;无绩效数据时为 None
    pub overall_score: Option<f64>,
}

impl EligibleSupplier {
    /// 计算时点的可用产能
    pub fn available_capacity(&self) -> i64 {
        self.capability.available_capacity()
    }
}

// ==========================================
// EligibilityFilter - 供应商准入引擎
// ==========================================
// 红线: 只读计算,不写库
pub struct EligibilityFilter<C>
where
    C: PlanningConfigReader,
{
    supplier_repo: Arc<SupplierRepository>,
    config: Arc<C>,
}

impl<C> EligibilityFilter<C>
where
    C: PlanningConfigReader,
{
    /// 创建新的准入引擎实例
    pub fn new(supplier_repo: Arc<SupplierRepository>, config: Arc<C>) -> Self {
        Self {
            supplier_repo,
            config,
        }
    }

    /// 查找某产品类型的合格供应商
    ///
    /// 准入条件:
    /// 1) 供应商与对应产品线能力均为活跃
    /// 2) 可用产能 > 0
    /// 3) 绩效达到阈值 (准时率 ≥ min_on_time_rate, 质量 ≥ min_quality_score);
    ///    无绩效数据者保留资格,但排序时置于末位
    ///
    /// # 错误
    /// - `NotEligible`: 无任何供应商满足条件,调用方必须上抛而非静默重试
    #[instrument(skip(self), fields(product_type = %product_type, required_quantity = required_quantity))]
    pub async fn find_eligible(
        &self,
        product_type: ProductType,
        required_quantity: i64,
    ) -> PlanningResult<Vec<EligibleSupplier>> {
        if required_quantity <= 0 {
            return Err(PlanningError::Validation(format!(
                "需求数量必须为正: {}",
                required_quantity
            )));
        }

        let min_on_time_rate = self.config.get_min_on_time_rate().await?;
        let min_quality_score = self.config.get_min_quality_score().await?;

        let rows = self.supplier_repo.find_active_with_capability(product_type)?;

        let mut eligible: Vec<EligibleSupplier> = rows
            .into_iter()
            .filter_map(|(supplier, capability, metrics)| {
                if capability.available_capacity() <= 0 {
                    return None;
                }
                match &metrics {
                    Some(m) => {
                        if m.on_time_rate < min_on_time_rate
                            || m.quality_score < min_quality_score
                        {
                            return None;
                        }
                    }
                    // 无绩效数据: 保留资格,排序置末位
                    None => {}
                }
                let overall_score = metrics.as_ref().map(|m| m.overall_performance_score());
                Some(EligibleSupplier {
                    supplier,
                    capability,
                    metrics,
                    overall_score,
                })
            })
            .collect();

        // 绩效降序;无绩效者末位;同分按 supplier_id 升序保证确定性
        eligible.sort_by(|a, b| match (a.overall_score, b.overall_score) {
            (Some(sa), Some(sb)) => sb
                .partial_cmp(&sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.supplier.supplier_id.cmp(&b.supplier.supplier_id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.supplier.supplier_id.cmp(&b.supplier.supplier_id),
        });

        if eligible.is_empty() {
            return Err(PlanningError::NotEligible {
                product_type,
                required_qty: required_quantity,
            });
        }

        Ok(eligible)
    }
}
