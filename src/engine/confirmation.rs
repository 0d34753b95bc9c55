// ==========================================
// 采购分发计划系统 - 供应商确认工作流
// ==========================================
// 职责: 供应商确认/拒绝采购订单及其级联效应
// 规则: 确认需逐明细包装信息 + 预计交付日期;
//       预计日期晚于要求日期为阻断错误,距要求日期 2 天以内为告警
// 拒绝: 必须给出非空原因,释放账本预留,订单转 Rejected;
//       被拒数量不自动重新分配,由计划员显式重新计划
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::audit::{AuditAction, AuditEntry, ENTITY_CUSTOMER_ORDER, ENTITY_PURCHASE_ORDER};
use crate::domain::purchase_order::{total_allocated_quantity, PurchaseOrder};
use crate::domain::types::{CustomerOrderStatus, PurchaseOrderStatus};
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::ledger::CapacityLedgerOps;
use crate::engine::repositories::PlanningRepositories;
use crate::engine::status_machine::{OrderStatusMachine, PurchaseOrderStatusMachine};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// 确认请求/结果结构
// ==========================================

/// 明细级包装信息
#[derive(Debug, Clone)]
pub struct ItemPackaging {
    pub po_item_id: String,
    pub packaging_spec: String,
}

/// 供应商确认请求
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub estimated_delivery_date: NaiveDate,
    pub item_packaging: Vec<ItemPackaging>,
}

/// 确认结果（含非拦截性告警）
#[derive(Debug)]
pub struct ConfirmationOutcome {
    pub purchase_order: PurchaseOrder,
    pub warnings: Vec<String>,
}

/// 拒绝结果
#[derive(Debug)]
pub struct RejectionOutcome {
    pub purchase_order: PurchaseOrder,
    // 本次释放回账本的数量
    pub released_quantity: i64,
}

// ==========================================
// SupplierConfirmationWorkflow - 确认工作流
// ==========================================
pub struct SupplierConfirmationWorkflow<C>
where
    C: PlanningConfigReader,
{
    repos: PlanningRepositories,
    ledger: Arc<dyn CapacityLedgerOps>,
    config: Arc<C>,
}

impl<C> SupplierConfirmationWorkflow<C>
where
    C: PlanningConfigReader,
{
    /// 创建新的确认工作流实例
    pub fn new(
        repos: PlanningRepositories,
        ledger: Arc<dyn CapacityLedgerOps>,
        config: Arc<C>,
    ) -> Self {
        Self {
            repos,
            ledger,
            config,
        }
    }

    /// 供应商确认采购订单
    ///
    /// 校验: 状态机允许 → 包装信息覆盖全部明细 → 日期规则;
    /// 成功后账本预留转为正式承诺(数值不变,仅拒绝/取消流程可再释放)。
    /// 级联: 订单的全部采购订单确认完毕时,父订单推进到 InProduction。
    #[instrument(skip(self, request), fields(po_id = %po_id, actor = %actor))]
    pub async fn confirm(
        &self,
        po_id: &str,
        request: &ConfirmationRequest,
        actor: &str,
    ) -> PlanningResult<ConfirmationOutcome> {
        let po = self.load_po(po_id)?;
        PurchaseOrderStatusMachine::validate_transition(
            po.status,
            PurchaseOrderStatus::Confirmed,
        )?;

        // ===== 包装信息覆盖检查 =====
        let items = self.repos.purchase_order_repo.find_items(po_id)?;
        let packaging: HashMap<&str, &str> = request
            .item_packaging
            .iter()
            .map(|p| (p.po_item_id.as_str(), p.packaging_spec.as_str()))
            .collect();

        for p in &request.item_packaging {
            if p.packaging_spec.trim().is_empty() {
                return Err(PlanningError::Validation(format!(
                    "明细 {} 的包装信息不能为空",
                    p.po_item_id
                )));
            }
            if !items.iter().any(|item| item.po_item_id == p.po_item_id) {
                return Err(PlanningError::Validation(format!(
                    "包装信息引用了不存在的明细: {}",
                    p.po_item_id
                )));
            }
        }
        for item in &items {
            if !packaging.contains_key(item.po_item_id.as_str()) {
                return Err(PlanningError::Validation(format!(
                    "明细 {} 缺少包装信息",
                    item.po_item_id
                )));
            }
        }

        // ===== 日期规则 =====
        let mut warnings = Vec::new();
        let estimated = request.estimated_delivery_date;
        let required = po.required_delivery_date;
        if estimated > required {
            return Err(PlanningError::Validation(format!(
                "ESTIMATED_AFTER_REQUIRED: estimated={}, required={}",
                estimated, required
            )));
        }
        let window_days = self.config.get_delivery_warning_window_days().await?;
        let margin_days = (required - estimated).num_days();
        if margin_days <= window_days {
            warnings.push(format!(
                "DELIVERY_DATE_TIGHT: estimated={}, required={}, margin_days={}",
                estimated, required, margin_days
            ));
        }

        // ===== 落库 =====
        let pairs: Vec<(String, String)> = request
            .item_packaging
            .iter()
            .map(|p| (p.po_item_id.clone(), p.packaging_spec.clone()))
            .collect();
        self.repos
            .purchase_order_repo
            .apply_confirmation(po_id, estimated, &pairs)?;

        self.repos.transition_log_repo.append(
            ENTITY_PURCHASE_ORDER,
            po_id,
            po.status.as_str(),
            PurchaseOrderStatus::Confirmed.as_str(),
            actor,
            Some("供应商确认"),
        )?;

        let confirmed = self.load_po(po_id)?;
        let entry = AuditEntry::new(
            ENTITY_PURCHASE_ORDER,
            po_id.to_string(),
            AuditAction::ConfirmPurchaseOrder,
            actor.to_string(),
        )
        .with_before(&po)
        .with_after(&confirmed)
        .with_detail(format!("estimated_delivery_date={}", estimated));
        self.repos.audit_repo.append(&entry)?;

        // ===== 级联: 全部确认 → 父订单进入生产 =====
        self.cascade_all_confirmed(&confirmed.order_id, actor)?;

        info!(po_id = %po_id, warnings = warnings.len(), "采购订单确认完成");
        Ok(ConfirmationOutcome {
            purchase_order: confirmed,
            warnings,
        })
    }

    /// 供应商拒绝采购订单
    ///
    /// 释放该供应商/产品线的账本预留,订单转 Rejected。
    /// 被拒数量不自动触发重新分配: 父订单保持原状态,
    /// 由计划员基于拒绝审计显式发起新一轮计划。
    #[instrument(skip(self), fields(po_id = %po_id, actor = %actor))]
    pub async fn reject(
        &self,
        po_id: &str,
        reason: &str,
        actor: &str,
    ) -> PlanningResult<RejectionOutcome> {
        if reason.trim().is_empty() {
            return Err(PlanningError::Validation(
                "拒绝原因不能为空".to_string(),
            ));
        }

        let po = self.load_po(po_id)?;
        PurchaseOrderStatusMachine::validate_transition(
            po.status,
            PurchaseOrderStatus::Rejected,
        )?;

        let order = self
            .repos
            .order_repo
            .find_by_id(&po.order_id)?
            .ok_or_else(|| PlanningError::NotFound {
                entity: "customer_order".to_string(),
                id: po.order_id.clone(),
            })?;

        let items = self.repos.purchase_order_repo.find_items(po_id)?;
        let released_quantity = total_allocated_quantity(&items);
        let attempts = self.config.get_reserve_retry_attempts().await?;

        // 先释放账本,再落状态;释放是 CAS 原子操作,不会部分生效
        self.ledger.release(
            &po.supplier_id,
            order.product_type,
            released_quantity,
            attempts,
        )?;

        self.repos
            .purchase_order_repo
            .update_status(po_id, PurchaseOrderStatus::Rejected)?;
        self.repos.transition_log_repo.append(
            ENTITY_PURCHASE_ORDER,
            po_id,
            po.status.as_str(),
            PurchaseOrderStatus::Rejected.as_str(),
            actor,
            Some(reason),
        )?;

        let rejected = self.load_po(po_id)?;
        let entry = AuditEntry::new(
            ENTITY_PURCHASE_ORDER,
            po_id.to_string(),
            AuditAction::RejectPurchaseOrder,
            actor.to_string(),
        )
        .with_before(&po)
        .with_after(&rejected)
        .with_detail(format!(
            "reason={}; released_quantity={}; 需计划员重新计划被拒数量",
            reason, released_quantity
        ));
        self.repos.audit_repo.append(&entry)?;

        info!(
            po_id = %po_id,
            released_quantity = released_quantity,
            "采购订单已拒绝,账本预留已释放"
        );

        Ok(RejectionOutcome {
            purchase_order: rejected,
            released_quantity,
        })
    }

    fn load_po(&self, po_id: &str) -> PlanningResult<PurchaseOrder> {
        self.repos
            .purchase_order_repo
            .find_by_id(po_id)?
            .ok_or_else(|| PlanningError::NotFound {
                entity: "purchase_order".to_string(),
                id: po_id.to_string(),
            })
    }

    /// 全部采购订单确认后,父订单 AwaitingSupplierConfirmation → InProduction
    fn cascade_all_confirmed(&self, order_id: &str, actor: &str) -> PlanningResult<()> {
        let order = match self.repos.order_repo.find_by_id(order_id)? {
            Some(order) => order,
            None => return Ok(()),
        };
        if order.status != CustomerOrderStatus::AwaitingSupplierConfirmation {
            return Ok(());
        }

        let pos = self.repos.purchase_order_repo.find_by_order(order_id)?;
        let all_confirmed = !pos.is_empty()
            && pos
                .iter()
                .all(|po| po.status == PurchaseOrderStatus::Confirmed);
        if !all_confirmed {
            return Ok(());
        }

        OrderStatusMachine::validate_transition(
            order.status,
            CustomerOrderStatus::InProduction,
        )?;
        self.repos
            .order_repo
            .update_status(order_id, CustomerOrderStatus::InProduction)?;
        self.repos.transition_log_repo.append(
            ENTITY_CUSTOMER_ORDER,
            order_id,
            order.status.as_str(),
            CustomerOrderStatus::InProduction.as_str(),
            actor,
            Some("全部采购订单已确认"),
        )?;
        Ok(())
    }
}
