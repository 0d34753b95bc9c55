// ==========================================
// 采购分发计划系统 - 客户订单领域模型
// ==========================================
// 红线: 订单明细在创建时固定,之后不可增删改
// ==========================================

use crate::domain::types::{CustomerOrderStatus, ProductType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// CustomerOrder - 客户订单
// ==========================================
// customer_id 为军方订单的 DODAAC 单位标识
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrder {
    pub order_id: String,
    pub customer_id: String,
    pub product_type: ProductType,
    pub requested_delivery_date: NaiveDate,
    pub status: CustomerOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerOrder {
    /// 创建新订单（初始状态 Submitted）
    pub fn new(
        customer_id: String,
        product_type: ProductType,
        requested_delivery_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: Uuid::new_v4().to_string(),
            customer_id,
            product_type,
            requested_delivery_date,
            status: CustomerOrderStatus::Submitted,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否处于终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            CustomerOrderStatus::Delivered | CustomerOrderStatus::Cancelled
        )
    }

    /// 是否可取消（除 Delivered 外的所有非终态）
    pub fn is_cancellable(&self) -> bool {
        !matches!(
            self.status,
            CustomerOrderStatus::Delivered | CustomerOrderStatus::Cancelled
        )
    }
}

// ==========================================
// OrderItem - 订单明细
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: String,
    pub order_id: String,
    pub product_code: String,
    pub quantity: i64,
    pub unit: String,
}

impl OrderItem {
    pub fn new(order_id: String, product_code: String, quantity: i64, unit: String) -> Self {
        Self {
            item_id: Uuid::new_v4().to_string(),
            order_id,
            product_code,
            quantity,
            unit,
        }
    }
}

// ==========================================
// CustomerOrderWithItems - 订单聚合视图
// ==========================================
// 以平铺 ID 引用组织,关联通过仓储查询解析,不做对象图导航
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrderWithItems {
    pub order: CustomerOrder,
    pub items: Vec<OrderItem>,
}

impl CustomerOrderWithItems {
    /// 订单明细数量合计
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_is_submitted() {
        let order = CustomerOrder::new(
            "W25G1T".to_string(),
            ProductType::Lmr,
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        );
        assert_eq!(order.status, CustomerOrderStatus::Submitted);
        assert!(order.is_cancellable());
        assert!(!order.is_terminal());
    }

    #[test]
    fn test_total_quantity() {
        let order = CustomerOrder::new(
            "W25G1T".to_string(),
            ProductType::Ffv,
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        );
        let items = vec![
            OrderItem::new(order.order_id.clone(), "FFV-001".to_string(), 40, "EA".to_string()),
            OrderItem::new(order.order_id.clone(), "FFV-002".to_string(), 60, "EA".to_string()),
        ];
        let with_items = CustomerOrderWithItems { order, items };
        assert_eq!(with_items.total_quantity(), 100);
    }
}
