// ==========================================
// 采购分发计划系统 - 数量分配引擎
// ==========================================
// 职责: 把订单需求量按策略拆分到合格供应商,产出分配建议
// 输入: 订单聚合 + 合格供应商列表 + 分配策略
// 输出: DistributionSuggestion (含未分配量,供调用方判断市场产能)
// 说明: 算法本体在 AllocationCore,本引擎负责组装与明细拆分
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::distribution::{DistributionSuggestion, ItemAllocation, SupplierAllocation};
use crate::domain::order::{CustomerOrderWithItems, OrderItem};
use crate::domain::types::AllocationStrategy;
use crate::engine::allocation_core::{AllocationCandidate, AllocationCore};
use crate::engine::eligibility::EligibleSupplier;
use crate::engine::error::{PlanningError, PlanningResult};
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// AllocationEngine - 数量分配引擎
// ==========================================
pub struct AllocationEngine<C>
where
    C: PlanningConfigReader,
{
    config: Arc<C>,
}

impl<C> AllocationEngine<C>
where
    C: PlanningConfigReader,
{
    /// 创建新的分配引擎实例
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 生成分配建议
    ///
    /// 产能不足时不报错: 建议携带 unallocated_quantity 如实上报,
    /// 由调用方决定是否继续(守恒校验在提交阶段强制执行)。
    #[instrument(skip(self, order, eligible), fields(
        order_id = %order.order.order_id,
        strategy = %strategy,
        eligible_count = eligible.len()
    ))]
    pub async fn suggest(
        &self,
        order: &CustomerOrderWithItems,
        eligible: &[EligibleSupplier],
        strategy: AllocationStrategy,
    ) -> PlanningResult<DistributionSuggestion> {
        if eligible.is_empty() {
            return Err(PlanningError::NotEligible {
                product_type: order.order.product_type,
                required_qty: order.total_quantity(),
            });
        }

        let requested_quantity = order.total_quantity();
        if requested_quantity <= 0 {
            return Err(PlanningError::Validation(format!(
                "订单 {} 的需求数量必须为正: {}",
                order.order.order_id, requested_quantity
            )));
        }

        let balanced_alpha = self.config.get_balanced_alpha().await?;

        let candidates: Vec<AllocationCandidate> = eligible
            .iter()
            .map(|e| AllocationCandidate {
                supplier_id: e.supplier.supplier_id.clone(),
                available_capacity: e.available_capacity(),
                performance_score: e.overall_score,
            })
            .collect();

        let outcome =
            AllocationCore::water_fill(&candidates, requested_quantity, strategy, balanced_alpha);

        // 零分配供应商不出现在建议中
        let totals: Vec<(String, i64)> = candidates
            .iter()
            .zip(outcome.quantities.iter())
            .filter(|(_, qty)| **qty > 0)
            .map(|(candidate, qty)| (candidate.supplier_id.clone(), *qty))
            .collect();

        let allocations = build_item_breakdown(&order.items, &totals);

        let suggestion = DistributionSuggestion {
            order_id: order.order.order_id.clone(),
            strategy,
            requested_quantity,
            allocations,
            unallocated_quantity: outcome.unallocated,
            is_fully_allocated: outcome.unallocated == 0,
        };

        info!(
            order_id = %suggestion.order_id,
            allocated = suggestion.total_allocated(),
            unallocated = suggestion.unallocated_quantity,
            suppliers = suggestion.allocations.len(),
            "分配建议生成完成"
        );

        Ok(suggestion)
    }
}

/// 把供应商级分配量按订单明细顺序贪心拆分
///
/// 保证: 同一明细跨供应商的拆分量之和 == 该供应商级分配量覆盖到的明细量;
/// 完全分配时,每个明细的拆分总和等于明细数量。
fn build_item_breakdown(
    items: &[OrderItem],
    totals: &[(String, i64)],
) -> Vec<SupplierAllocation> {
    let mut remaining: Vec<i64> = items.iter().map(|item| item.quantity).collect();
    let mut cursor = 0usize;

    totals
        .iter()
        .map(|(supplier_id, total_qty)| {
            let mut need = *total_qty;
            let mut item_allocations = Vec::new();
            while need > 0 && cursor < items.len() {
                let take = need.min(remaining[cursor]);
                if take > 0 {
                    item_allocations.push(ItemAllocation {
                        order_item_id: items[cursor].item_id.clone(),
                        quantity: take,
                    });
                    remaining[cursor] -= take;
                    need -= take;
                }
                if remaining[cursor] == 0 {
                    cursor += 1;
                }
            }
            SupplierAllocation {
                supplier_id: supplier_id.clone(),
                allocated_quantity: *total_qty,
                item_allocations,
            }
        })
        .collect()
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::CustomerOrder;
    use crate::domain::types::ProductType;
    use chrono::NaiveDate;

    fn order_with_items(quantities: &[i64]) -> CustomerOrderWithItems {
        let order = CustomerOrder::new(
            "W25G1T".to_string(),
            ProductType::Lmr,
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        );
        let items = quantities
            .iter()
            .enumerate()
            .map(|(i, qty)| OrderItem {
                item_id: format!("ITEM-{}", i + 1),
                order_id: order.order_id.clone(),
                product_code: format!("LMR-{:03}", i + 1),
                quantity: *qty,
                unit: "EA".to_string(),
            })
            .collect();
        CustomerOrderWithItems { order, items }
    }

    #[test]
    fn test_item_breakdown_conserves_per_item_quantity() {
        let order = order_with_items(&[40, 60]);
        let totals = vec![("S001".to_string(), 46), ("S002".to_string(), 54)];

        let allocations = build_item_breakdown(&order.items, &totals);

        // S001: ITEM-1 全部 40 + ITEM-2 的 6
        assert_eq!(
            allocations[0].item_allocations,
            vec![
                ItemAllocation {
                    order_item_id: "ITEM-1".to_string(),
                    quantity: 40
                },
                ItemAllocation {
                    order_item_id: "ITEM-2".to_string(),
                    quantity: 6
                },
            ]
        );
        // S002: ITEM-2 余下 54
        assert_eq!(
            allocations[1].item_allocations,
            vec![ItemAllocation {
                order_item_id: "ITEM-2".to_string(),
                quantity: 54
            }]
        );

        // 明细级守恒
        let mut per_item = std::collections::HashMap::new();
        for allocation in &allocations {
            for ia in &allocation.item_allocations {
                *per_item.entry(ia.order_item_id.clone()).or_insert(0i64) += ia.quantity;
            }
        }
        assert_eq!(per_item["ITEM-1"], 40);
        assert_eq!(per_item["ITEM-2"], 60);
    }

    #[test]
    fn test_item_breakdown_partial_allocation() {
        let order = order_with_items(&[100]);
        // 市场产能只有 70
        let totals = vec![("S001".to_string(), 70)];
        let allocations = build_item_breakdown(&order.items, &totals);
        assert_eq!(allocations[0].item_allocations.len(), 1);
        assert_eq!(allocations[0].item_allocations[0].quantity, 70);
    }
}
