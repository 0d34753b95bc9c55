// ==========================================
// 采购分发计划系统 - 分配建议/分配计划领域模型
// ==========================================
// 守恒律: 提交的计划必须满足 sum(分配量) == sum(订单明细量)
// 建议允许部分未分配(产能不足时如实上报,不静默丢弃)
// ==========================================

use crate::domain::types::AllocationStrategy;
use serde::{Deserialize, Serialize};

// ==========================================
// ItemAllocation - 明细级分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub order_item_id: String,
    pub quantity: i64,
}

// ==========================================
// SupplierAllocation - 供应商级分配
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierAllocation {
    pub supplier_id: String,
    pub allocated_quantity: i64,
    // 按订单明细拆分,同一明细跨供应商的分配量之和等于明细数量
    pub item_allocations: Vec<ItemAllocation>,
}

// ==========================================
// DistributionSuggestion - 算法产出的分配建议
// ==========================================
// 计划员可在此基础上编辑,编辑结果走 DistributionValidator 校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSuggestion {
    pub order_id: String,
    pub strategy: AllocationStrategy,
    pub requested_quantity: i64,
    pub allocations: Vec<SupplierAllocation>,
    pub unallocated_quantity: i64,
    pub is_fully_allocated: bool,
}

impl DistributionSuggestion {
    /// 已分配数量合计
    pub fn total_allocated(&self) -> i64 {
        self.allocations.iter().map(|a| a.allocated_quantity).sum()
    }

    /// 转换为可提交的分配计划
    ///
    /// 不做守恒检查,检查职责在 DistributionValidator;
    /// 未完全分配的建议转换后会在校验阶段被拒绝。
    pub fn into_plan(self) -> DistributionPlan {
        DistributionPlan {
            order_id: self.order_id,
            strategy: self.strategy,
            allocations: self.allocations,
        }
    }
}

// ==========================================
// DistributionPlan - 待提交的分配计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub order_id: String,
    pub strategy: AllocationStrategy,
    pub allocations: Vec<SupplierAllocation>,
}

impl DistributionPlan {
    /// 已分配数量合计
    pub fn total_allocated(&self) -> i64 {
        self.allocations.iter().map(|a| a.allocated_quantity).sum()
    }
}
