// ==========================================
// 采购分发计划系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod audit_log_repo;
pub mod error;
pub mod order_repo;
pub mod purchase_order_repo;
pub mod supplier_repo;
pub mod transition_log_repo;

// 重导出核心仓储
pub use audit_log_repo::AuditLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::CustomerOrderRepository;
pub use purchase_order_repo::PurchaseOrderRepository;
pub use supplier_repo::SupplierRepository;
pub use transition_log_repo::{StatusTransitionLogRepository, StatusTransitionRecord};
