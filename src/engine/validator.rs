// ==========================================
// 采购分发计划系统 - 分配计划校验引擎
// ==========================================
// 职责: 对(可能被计划员编辑过的)分配计划做提交前校验
// 红线: 校验必须基于实时账本重读,不得信任建议生成时的快照
// 输出: 结构化报告 {is_valid, errors, warnings};
//       近满产只告警不拦截,错误全部拦截
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::distribution::DistributionPlan;
use crate::domain::order::CustomerOrderWithItems;
use crate::domain::supplier::CapacityCheck;
use crate::engine::error::{PlanningError, PlanningResult};
use crate::repository::SupplierRepository;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ValidationReport - 校验报告
// ==========================================
#[derive(Debug)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<PlanningError>,
    // 非拦截性提示,例如 NEAR_CAPACITY
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// 取出首个错误（供提交流程直接上抛）
    pub fn into_first_error(mut self) -> Option<PlanningError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.remove(0))
        }
    }
}

// ==========================================
// DistributionValidator - 分配计划校验引擎
// ==========================================
pub struct DistributionValidator<C>
where
    C: PlanningConfigReader,
{
    supplier_repo: Arc<SupplierRepository>,
    config: Arc<C>,
}

impl<C> DistributionValidator<C>
where
    C: PlanningConfigReader,
{
    /// 创建新的校验引擎实例
    pub fn new(supplier_repo: Arc<SupplierRepository>, config: Arc<C>) -> Self {
        Self {
            supplier_repo,
            config,
        }
    }

    /// 校验分配计划
    ///
    /// 逐供应商: 实时重读账本,检查活跃性与产能;
    /// 聚合: 检查守恒律 sum(分配量) == sum(订单明细量);
    /// 明细: 拆分量与供应商级分配量一致,且同一明细的拆分总量不超明细量。
    ///
    /// # 返回
    /// Err 仅用于基础设施故障;业务性失败全部进入报告的 errors
    #[instrument(skip(self, plan, order), fields(
        order_id = %plan.order_id,
        allocations = plan.allocations.len()
    ))]
    pub async fn validate(
        &self,
        plan: &DistributionPlan,
        order: &CustomerOrderWithItems,
    ) -> PlanningResult<ValidationReport> {
        let mut errors: Vec<PlanningError> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        let near_capacity_ratio = self.config.get_near_capacity_warning_ratio().await?;
        let product_type = order.order.product_type;

        if plan.order_id != order.order.order_id {
            errors.push(PlanningError::Validation(format!(
                "计划与订单不匹配: plan.order_id={}, order_id={}",
                plan.order_id, order.order.order_id
            )));
        }

        if plan.allocations.is_empty() {
            errors.push(PlanningError::Validation(
                "分配计划不能为空".to_string(),
            ));
        }

        // ===== 供应商级校验 =====
        let mut seen_suppliers: HashSet<&str> = HashSet::new();
        for allocation in &plan.allocations {
            let supplier_id = allocation.supplier_id.as_str();

            if !seen_suppliers.insert(supplier_id) {
                errors.push(PlanningError::Validation(format!(
                    "供应商在计划中重复出现: {}",
                    supplier_id
                )));
                continue;
            }

            if allocation.allocated_quantity <= 0 {
                errors.push(PlanningError::Validation(format!(
                    "供应商 {} 的分配量必须为正: {}",
                    supplier_id, allocation.allocated_quantity
                )));
                continue;
            }

            // 实时重读供应商与账本
            let supplier = match self.supplier_repo.find_by_id(supplier_id)? {
                Some(s) => s,
                None => {
                    errors.push(PlanningError::NotFound {
                        entity: "supplier".to_string(),
                        id: supplier_id.to_string(),
                    });
                    continue;
                }
            };
            let capability = match self
                .supplier_repo
                .find_capability(supplier_id, product_type)?
            {
                Some(c) => c,
                None => {
                    errors.push(PlanningError::NotFound {
                        entity: "supplier_capability".to_string(),
                        id: format!("{}/{}", supplier_id, product_type),
                    });
                    continue;
                }
            };

            if !supplier.is_active || !capability.is_active {
                errors.push(PlanningError::InactiveSupplier {
                    supplier_id: supplier_id.to_string(),
                });
                continue;
            }

            let available = capability.available_capacity();
            if allocation.allocated_quantity > available {
                errors.push(PlanningError::CapacityExceeded {
                    supplier_id: supplier_id.to_string(),
                    requested: allocation.allocated_quantity,
                    available,
                    shortfall: allocation.allocated_quantity - available,
                });
                continue;
            }

            // 明细拆分一致性
            if !allocation.item_allocations.is_empty() {
                let breakdown_total: i64 = allocation
                    .item_allocations
                    .iter()
                    .map(|ia| ia.quantity)
                    .sum();
                if breakdown_total != allocation.allocated_quantity {
                    errors.push(PlanningError::Validation(format!(
                        "供应商 {} 的明细拆分量 {} 与分配量 {} 不一致",
                        supplier_id, breakdown_total, allocation.allocated_quantity
                    )));
                }
            }

            // 近满产告警 (不拦截)
            if capability.max_monthly_capacity > 0 {
                let projected = (capability.committed_qty + allocation.allocated_quantity) as f64
                    / capability.max_monthly_capacity as f64;
                if projected > near_capacity_ratio {
                    warnings.push(format!(
                        "NEAR_CAPACITY: supplier={}, projected_utilization={:.3}",
                        supplier_id, projected
                    ));
                }
            }
        }

        // ===== 明细级守恒 =====
        let item_quantities: HashMap<&str, i64> = order
            .items
            .iter()
            .map(|item| (item.item_id.as_str(), item.quantity))
            .collect();
        let mut per_item_allocated: HashMap<&str, i64> = HashMap::new();
        for allocation in &plan.allocations {
            for ia in &allocation.item_allocations {
                match item_quantities.get(ia.order_item_id.as_str()) {
                    Some(_) => {
                        *per_item_allocated
                            .entry(ia.order_item_id.as_str())
                            .or_insert(0) += ia.quantity;
                    }
                    None => errors.push(PlanningError::Validation(format!(
                        "明细拆分引用了不存在的订单明细: {}",
                        ia.order_item_id
                    ))),
                }
            }
        }
        for (item_id, allocated) in &per_item_allocated {
            let expected = item_quantities[item_id];
            if *allocated > expected {
                errors.push(PlanningError::Validation(format!(
                    "订单明细 {} 的拆分总量 {} 超过明细数量 {}",
                    item_id, allocated, expected
                )));
            }
        }

        // ===== 聚合守恒律 =====
        let expected_total = order.total_quantity();
        let actual_total = plan.total_allocated();
        if actual_total != expected_total {
            errors.push(PlanningError::QuantityMismatch {
                expected: expected_total,
                actual: actual_total,
            });
        }

        Ok(ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        })
    }
}
