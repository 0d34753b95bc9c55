// ==========================================
// 采购分发计划系统 - 领域类型定义
// ==========================================
// 红线: 状态机只认转换表,不认散落的条件判断
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 产品类型 (Product Type)
// ==========================================
// 系统支持的两类产品线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Lmr, // LMR 产品线
    Ffv, // FFV 产品线
}

impl ProductType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Lmr => "LMR",
            ProductType::Ffv => "FFV",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LMR" => Some(ProductType::Lmr),
            "FFV" => Some(ProductType::Ffv),
            _ => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 客户订单状态 (Customer Order Status)
// ==========================================
// 终态: Delivered, Cancelled
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerOrderStatus {
    Submitted,                    // 已提交
    UnderReview,                  // 审核中
    PlanningInProgress,           // 分配计划中
    PurchaseOrdersCreated,        // 采购订单已生成
    AwaitingSupplierConfirmation, // 等待供应商确认
    InProduction,                 // 生产中
    ReadyForDelivery,             // 待交付
    Delivered,                    // 已交付
    Cancelled,                    // 已取消
}

impl CustomerOrderStatus {
    /// 所有状态的固定枚举顺序（用于穷举测试与展示）
    pub const ALL: [CustomerOrderStatus; 9] = [
        CustomerOrderStatus::Submitted,
        CustomerOrderStatus::UnderReview,
        CustomerOrderStatus::PlanningInProgress,
        CustomerOrderStatus::PurchaseOrdersCreated,
        CustomerOrderStatus::AwaitingSupplierConfirmation,
        CustomerOrderStatus::InProduction,
        CustomerOrderStatus::ReadyForDelivery,
        CustomerOrderStatus::Delivered,
        CustomerOrderStatus::Cancelled,
    ];

    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerOrderStatus::Submitted => "SUBMITTED",
            CustomerOrderStatus::UnderReview => "UNDER_REVIEW",
            CustomerOrderStatus::PlanningInProgress => "PLANNING_IN_PROGRESS",
            CustomerOrderStatus::PurchaseOrdersCreated => "PURCHASE_ORDERS_CREATED",
            CustomerOrderStatus::AwaitingSupplierConfirmation => "AWAITING_SUPPLIER_CONFIRMATION",
            CustomerOrderStatus::InProduction => "IN_PRODUCTION",
            CustomerOrderStatus::ReadyForDelivery => "READY_FOR_DELIVERY",
            CustomerOrderStatus::Delivered => "DELIVERED",
            CustomerOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUBMITTED" => Some(CustomerOrderStatus::Submitted),
            "UNDER_REVIEW" => Some(CustomerOrderStatus::UnderReview),
            "PLANNING_IN_PROGRESS" => Some(CustomerOrderStatus::PlanningInProgress),
            "PURCHASE_ORDERS_CREATED" => Some(CustomerOrderStatus::PurchaseOrdersCreated),
            "AWAITING_SUPPLIER_CONFIRMATION" => {
                Some(CustomerOrderStatus::AwaitingSupplierConfirmation)
            }
            "IN_PRODUCTION" => Some(CustomerOrderStatus::InProduction),
            "READY_FOR_DELIVERY" => Some(CustomerOrderStatus::ReadyForDelivery),
            "DELIVERED" => Some(CustomerOrderStatus::Delivered),
            "CANCELLED" => Some(CustomerOrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for CustomerOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 采购订单状态 (Purchase Order Status)
// ==========================================
// 终态: Delivered, Cancelled, Rejected
// 与客户订单状态机相互独立,仅通过工作流级联
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Created,          // 已创建
    SentToSupplier,   // 已发送供应商
    Confirmed,        // 供应商已确认
    Rejected,         // 供应商已拒绝
    InProduction,     // 生产中
    ReadyForShipment, // 待发运
    Shipped,          // 已发运
    Delivered,        // 已交付
    Cancelled,        // 已取消
}

impl PurchaseOrderStatus {
    /// 所有状态的固定枚举顺序（用于穷举测试与展示）
    pub const ALL: [PurchaseOrderStatus; 9] = [
        PurchaseOrderStatus::Created,
        PurchaseOrderStatus::SentToSupplier,
        PurchaseOrderStatus::Confirmed,
        PurchaseOrderStatus::Rejected,
        PurchaseOrderStatus::InProduction,
        PurchaseOrderStatus::ReadyForShipment,
        PurchaseOrderStatus::Shipped,
        PurchaseOrderStatus::Delivered,
        PurchaseOrderStatus::Cancelled,
    ];

    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Created => "CREATED",
            PurchaseOrderStatus::SentToSupplier => "SENT_TO_SUPPLIER",
            PurchaseOrderStatus::Confirmed => "CONFIRMED",
            PurchaseOrderStatus::Rejected => "REJECTED",
            PurchaseOrderStatus::InProduction => "IN_PRODUCTION",
            PurchaseOrderStatus::ReadyForShipment => "READY_FOR_SHIPMENT",
            PurchaseOrderStatus::Shipped => "SHIPPED",
            PurchaseOrderStatus::Delivered => "DELIVERED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATED" => Some(PurchaseOrderStatus::Created),
            "SENT_TO_SUPPLIER" => Some(PurchaseOrderStatus::SentToSupplier),
            "CONFIRMED" => Some(PurchaseOrderStatus::Confirmed),
            "REJECTED" => Some(PurchaseOrderStatus::Rejected),
            "IN_PRODUCTION" => Some(PurchaseOrderStatus::InProduction),
            "READY_FOR_SHIPMENT" => Some(PurchaseOrderStatus::ReadyForShipment),
            "SHIPPED" => Some(PurchaseOrderStatus::Shipped),
            "DELIVERED" => Some(PurchaseOrderStatus::Delivered),
            "CANCELLED" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 分配策略 (Allocation Strategy)
// ==========================================
// 四种策略共用同一套约束注水分配过程,仅权重来源不同
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStrategy {
    EvenDistribution, // 均匀分配: 每个供应商权重相同
    CapacityBased,    // 产能优先: 权重 = 可用产能
    PerformanceBased, // 绩效优先: 权重 = 综合绩效得分
    Balanced,         // 均衡: 权重 = α·绩效 + (1-α)·产能
}

impl AllocationStrategy {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStrategy::EvenDistribution => "EVEN_DISTRIBUTION",
            AllocationStrategy::CapacityBased => "CAPACITY_BASED",
            AllocationStrategy::PerformanceBased => "PERFORMANCE_BASED",
            AllocationStrategy::Balanced => "BALANCED",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EVEN_DISTRIBUTION" => Some(AllocationStrategy::EvenDistribution),
            "CAPACITY_BASED" => Some(AllocationStrategy::CapacityBased),
            "PERFORMANCE_BASED" => Some(AllocationStrategy::PerformanceBased),
            "BALANCED" => Some(AllocationStrategy::Balanced),
            _ => None,
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
