// ==========================================
// 采购分发计划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod audit;
pub mod distribution;
pub mod order;
pub mod purchase_order;
pub mod supplier;
pub mod types;

// 重导出核心类型
pub use audit::{AuditAction, AuditEntry, ENTITY_CUSTOMER_ORDER, ENTITY_PURCHASE_ORDER};
pub use distribution::{
    DistributionPlan, DistributionSuggestion, ItemAllocation, SupplierAllocation,
};
pub use order::{CustomerOrder, CustomerOrderWithItems, OrderItem};
pub use purchase_order::{total_allocated_quantity, PurchaseOrder, PurchaseOrderItem};
pub use supplier::{CapacityCheck, Supplier, SupplierCapability, SupplierPerformanceMetrics};
pub use types::{AllocationStrategy, CustomerOrderStatus, ProductType, PurchaseOrderStatus};
