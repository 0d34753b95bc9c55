// ==========================================
// 采购分发计划系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合计划引擎所需的所有 Repository
// 目标: 减少引擎构造函数参数数量,便于测试时整体注入
// ==========================================

use std::sync::Arc;

use crate::repository::{
    AuditLogRepository, CustomerOrderRepository, PurchaseOrderRepository,
    StatusTransitionLogRepository, SupplierRepository,
};

/// 计划引擎仓储集合
///
/// 聚合计划引擎所需的所有 Repository,简化依赖注入。
#[derive(Clone)]
pub struct PlanningRepositories {
    /// 客户订单仓储
    pub order_repo: Arc<CustomerOrderRepository>,
    /// 采购订单仓储
    pub purchase_order_repo: Arc<PurchaseOrderRepository>,
    /// 供应商/账本仓储
    pub supplier_repo: Arc<SupplierRepository>,
    /// 审计日志仓储
    pub audit_repo: Arc<AuditLogRepository>,
    /// 状态转换日志仓储
    pub transition_log_repo: Arc<StatusTransitionLogRepository>,
}

impl PlanningRepositories {
    /// 创建新的仓储集合
    pub fn new(
        order_repo: Arc<CustomerOrderRepository>,
        purchase_order_repo: Arc<PurchaseOrderRepository>,
        supplier_repo: Arc<SupplierRepository>,
        audit_repo: Arc<AuditLogRepository>,
        transition_log_repo: Arc<StatusTransitionLogRepository>,
    ) -> Self {
        Self {
            order_repo,
            purchase_order_repo,
            supplier_repo,
            audit_repo,
            transition_log_repo,
        }
    }
}

// 注: 聚合结构体本身无业务逻辑,其正确性由引擎层测试与
// 集成测试覆盖。
