// ==========================================
// 采购分发计划系统 - 采购订单领域模型
// ==========================================
// 红线: 采购订单创建后不可改量,重分配只能走拒绝→重新计划流程
// ==========================================

use crate::domain::types::PurchaseOrderStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// PurchaseOrder - 采购订单
// ==========================================
// 每个客户订单对每个供应商至多一张采购订单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub po_id: String,
    // 格式: PO-{supplierCode}-{yyyyMMdd}-{seq:03},全局唯一
    pub po_number: String,
    pub order_id: String,
    pub supplier_id: String,
    pub status: PurchaseOrderStatus,
    pub required_delivery_date: NaiveDate,
    // 供应商确认时填写
    pub estimated_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn new(
        po_number: String,
        order_id: String,
        supplier_id: String,
        required_delivery_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            po_id: Uuid::new_v4().to_string(),
            po_number,
            order_id,
            supplier_id,
            status: PurchaseOrderStatus::Created,
            required_delivery_date,
            estimated_delivery_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否处于终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            PurchaseOrderStatus::Delivered
                | PurchaseOrderStatus::Cancelled
                | PurchaseOrderStatus::Rejected
        )
    }

    /// 当前状态下账本预留是否仍然有效
    ///
    /// 预留在创建时建立,仅在拒绝/取消时释放;交付后承诺保留在当月账本中。
    pub fn holds_reservation(&self) -> bool {
        !matches!(
            self.status,
            PurchaseOrderStatus::Cancelled | PurchaseOrderStatus::Rejected
        )
    }
}

// ==========================================
// PurchaseOrderItem - 采购订单明细
// ==========================================
// 引用原始订单明细 ID;包装字段在供应商确认后才填写
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub po_item_id: String,
    pub po_id: String,
    pub order_item_id: String,
    pub allocated_quantity: i64,
    pub packaging_spec: Option<String>,
}

impl PurchaseOrderItem {
    pub fn new(po_id: String, order_item_id: String, allocated_quantity: i64) -> Self {
        Self {
            po_item_id: Uuid::new_v4().to_string(),
            po_id,
            order_item_id,
            allocated_quantity,
            packaging_spec: None,
        }
    }
}

/// 采购订单明细数量合计
pub fn total_allocated_quantity(items: &[PurchaseOrderItem]) -> i64 {
    items.iter().map(|item| item.allocated_quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_po_is_created_status() {
        let po = PurchaseOrder::new(
            "PO-ALP-20260815-001".to_string(),
            "ORD-1".to_string(),
            "S001".to_string(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        );
        assert_eq!(po.status, PurchaseOrderStatus::Created);
        assert!(po.holds_reservation());
        assert!(po.estimated_delivery_date.is_none());
    }

    #[test]
    fn test_rejected_po_releases_reservation() {
        let mut po = PurchaseOrder::new(
            "PO-ALP-20260815-002".to_string(),
            "ORD-1".to_string(),
            "S001".to_string(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        );
        po.status = PurchaseOrderStatus::Rejected;
        assert!(po.is_terminal());
        assert!(!po.holds_reservation());
    }

    #[test]
    fn test_total_allocated_quantity() {
        let items = vec![
            PurchaseOrderItem::new("PO1".to_string(), "I1".to_string(), 30),
            PurchaseOrderItem::new("PO1".to_string(), "I2".to_string(), 27),
        ];
        assert_eq!(total_allocated_quantity(&items), 57);
    }
}
