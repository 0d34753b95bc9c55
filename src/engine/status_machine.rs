// ==========================================
// 采购分发计划系统 - 状态机引擎
// ==========================================
// 红线: 两族订单的状态规则只存在于本文件的转换表中,
//       任何写状态的路径都必须先经 validate_transition
// 说明: 转换表是数据,状态机与测试共用同一份表
// ==========================================

use crate::domain::types::{CustomerOrderStatus, PurchaseOrderStatus};
use crate::engine::error::{PlanningError, PlanningResult};

// ==========================================
// OrderStatusMachine - 客户订单状态机
// ==========================================
// 主链: Submitted → UnderReview → PlanningInProgress → PurchaseOrdersCreated
//       → AwaitingSupplierConfirmation → InProduction → ReadyForDelivery → Delivered
// Cancelled 可从除 Delivered 外的任意非终态进入
pub struct OrderStatusMachine;

impl OrderStatusMachine {
    /// 查询某状态允许的后继状态集合
    pub fn allowed_transitions(from: CustomerOrderStatus) -> &'static [CustomerOrderStatus] {
        use CustomerOrderStatus::*;
        match from {
            Submitted => &[UnderReview, Cancelled],
            UnderReview => &[PlanningInProgress, Cancelled],
            PlanningInProgress => &[PurchaseOrdersCreated, Cancelled],
            PurchaseOrdersCreated => &[AwaitingSupplierConfirmation, Cancelled],
            AwaitingSupplierConfirmation => &[InProduction, Cancelled],
            InProduction => &[ReadyForDelivery, Cancelled],
            ReadyForDelivery => &[Delivered, Cancelled],
            Delivered => &[],
            Cancelled => &[],
        }
    }

    /// 检查转换是否允许
    pub fn can_transition(from: CustomerOrderStatus, to: CustomerOrderStatus) -> bool {
        Self::allowed_transitions(from).contains(&to)
    }

    /// 校验转换,不允许时返回 InvalidStatusTransition
    pub fn validate_transition(
        from: CustomerOrderStatus,
        to: CustomerOrderStatus,
    ) -> PlanningResult<()> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(PlanningError::InvalidStatusTransition {
                entity: "customer_order",
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// 是否终态
    pub fn is_terminal(status: CustomerOrderStatus) -> bool {
        Self::allowed_transitions(status).is_empty()
    }
}

// ==========================================
// PurchaseOrderStatusMachine - 采购订单状态机
// ==========================================
// 主链: Created → SentToSupplier → {Confirmed | Rejected};
//       Confirmed → InProduction → ReadyForShipment → Shipped → Delivered
// Rejected 为终态;Cancelled 可从任意非终态进入
pub struct PurchaseOrderStatusMachine;

impl PurchaseOrderStatusMachine {
    /// 查询某状态允许的后继状态集合
    pub fn allowed_transitions(from: PurchaseOrderStatus) -> &'static [PurchaseOrderStatus] {
        use PurchaseOrderStatus::*;
        match from {
            Created => &[SentToSupplier, Cancelled],
            SentToSupplier => &[Confirmed, Rejected, Cancelled],
            Confirmed => &[InProduction, Cancelled],
            InProduction => &[ReadyForShipment, Cancelled],
            ReadyForShipment => &[Shipped, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered => &[],
            Rejected => &[],
            Cancelled => &[],
        }
    }

    /// 检查转换是否允许
    pub fn can_transition(from: PurchaseOrderStatus, to: PurchaseOrderStatus) -> bool {
        Self::allowed_transitions(from).contains(&to)
    }

    /// 校验转换,不允许时返回 InvalidStatusTransition
    pub fn validate_transition(
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    ) -> PlanningResult<()> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(PlanningError::InvalidStatusTransition {
                entity: "purchase_order",
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// 是否终态
    pub fn is_terminal(status: PurchaseOrderStatus) -> bool {
        Self::allowed_transitions(status).is_empty()
    }
}
