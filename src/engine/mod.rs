// ==========================================
// 采购分发计划系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有拒绝必须携带结构化原因
// ==========================================

pub mod allocation;
pub mod allocation_core;
pub mod confirmation;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod notifications;
pub mod po_factory;
pub mod repositories;
pub mod status_machine;
pub mod validator;

// 重导出核心引擎
pub use allocation::AllocationEngine;
pub use allocation_core::{AllocationCandidate, AllocationCore, AllocationOutcome};
pub use confirmation::{
    ConfirmationOutcome, ConfirmationRequest, ItemPackaging, RejectionOutcome,
    SupplierConfirmationWorkflow,
};
pub use eligibility::{EligibilityFilter, EligibleSupplier};
pub use error::{PlanningError, PlanningResult};
pub use ledger::{CapacityLedger, CapacityLedgerOps, DEFAULT_RESERVE_RETRY_ATTEMPTS};
pub use notifications::{
    NoOpNotificationSink, NotificationSink, OptionalNotificationSink, SupplierNotification,
    SupplierNotificationType,
};
pub use po_factory::PurchaseOrderFactory;
pub use repositories::PlanningRepositories;
pub use status_machine::{OrderStatusMachine, PurchaseOrderStatusMachine};
pub use validator::{DistributionValidator, ValidationReport};
