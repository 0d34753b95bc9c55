// ==========================================
// 采购分发计划系统 - 核心库
// ==========================================
// 系统定位: 决策支持系统 (计划员最终控制权)
// 核心职责: 供应商准入 → 数量分配 → 采购订单落地 → 状态机治理
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AllocationStrategy, CustomerOrderStatus, ProductType, PurchaseOrderStatus,
};

// 领域实体
pub use domain::{
    AuditAction, AuditEntry, CustomerOrder, CustomerOrderWithItems, DistributionPlan,
    DistributionSuggestion, ItemAllocation, OrderItem, PurchaseOrder, PurchaseOrderItem,
    Supplier, SupplierAllocation, SupplierCapability, SupplierPerformanceMetrics,
};

// 引擎
pub use engine::{
    AllocationEngine, CapacityLedger, CapacityLedgerOps, DistributionValidator,
    EligibilityFilter, OrderStatusMachine, PlanningError, PlanningRepositories,
    PurchaseOrderFactory, PurchaseOrderStatusMachine, SupplierConfirmationWorkflow,
    ValidationReport,
};

// API
pub use api::{DistributionApi, NewOrderItem};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "采购分发计划系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
