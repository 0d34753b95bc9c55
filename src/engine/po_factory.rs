// ==========================================
// 采购分发计划系统 - 采购订单工厂
// ==========================================
// 职责: 把通过校验的分配计划落地为采购订单
// 红线: 多供应商提交必须全量成功或全量回滚,
//       任何读者都不得观察到部分预留的账本状态
// 流程: 内联重校验 → 逐供应商预留(失败即补偿回滚) → 生成 PO 编号
//       → 批量落库 → 父订单状态推进 → 审计 → 通知
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::audit::{AuditAction, AuditEntry, ENTITY_CUSTOMER_ORDER, ENTITY_PURCHASE_ORDER};
use crate::domain::distribution::DistributionPlan;
use crate::domain::purchase_order::{PurchaseOrder, PurchaseOrderItem};
use crate::domain::types::{CustomerOrderStatus, ProductType};
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::ledger::CapacityLedgerOps;
use crate::engine::notifications::{
    OptionalNotificationSink, SupplierNotification, SupplierNotificationType,
};
use crate::engine::repositories::PlanningRepositories;
use crate::engine::status_machine::OrderStatusMachine;
use crate::engine::validator::DistributionValidator;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

// ==========================================
// PurchaseOrderFactory - 采购订单工厂
// ==========================================
pub struct PurchaseOrderFactory<C>
where
    C: PlanningConfigReader,
{
    repos: PlanningRepositories,
    ledger: Arc<dyn CapacityLedgerOps>,
    validator: DistributionValidator<C>,
    config: Arc<C>,
    notifications: OptionalNotificationSink,
}

impl<C> PurchaseOrderFactory<C>
where
    C: PlanningConfigReader,
{
    /// 创建新的采购订单工厂实例
    pub fn new(
        repos: PlanningRepositories,
        ledger: Arc<dyn CapacityLedgerOps>,
        config: Arc<C>,
        notifications: OptionalNotificationSink,
    ) -> Self {
        let validator = DistributionValidator::new(repos.supplier_repo.clone(), config.clone());
        Self {
            repos,
            ledger,
            validator,
            config,
            notifications,
        }
    }

    /// 提交分配计划,生成采购订单
    ///
    /// 全量成功或全量失败:
    /// - 第 i 个供应商预留失败时,先释放本次已完成的 1..i-1 预留再返回错误
    /// - 落库失败同样触发预留回滚
    ///
    /// # 返回
    /// 本次创建的全部采购订单
    #[instrument(skip(self, plan), fields(
        order_id = %plan.order_id,
        allocations = plan.allocations.len(),
        actor = %actor
    ))]
    pub async fn create_purchase_orders(
        &self,
        plan: &DistributionPlan,
        actor: &str,
    ) -> PlanningResult<Vec<PurchaseOrder>> {
        // ===== 步骤 1: 加载订单并预检状态机 =====
        let order = self
            .repos
            .order_repo
            .find_with_items(&plan.order_id)?
            .ok_or_else(|| PlanningError::NotFound {
                entity: "customer_order".to_string(),
                id: plan.order_id.clone(),
            })?;
        let from_status = order.order.status;
        OrderStatusMachine::validate_transition(
            from_status,
            CustomerOrderStatus::PurchaseOrdersCreated,
        )?;

        // ===== 步骤 2: 内联重校验 (防建议与提交之间的竞态) =====
        let report = self.validator.validate(plan, &order).await?;
        for warning in &report.warnings {
            warn!(order_id = %plan.order_id, "{}", warning);
        }
        if !report.is_valid {
            return Err(report
                .into_first_error()
                .unwrap_or_else(|| PlanningError::Validation("分配计划校验未通过".to_string())));
        }

        // ===== 步骤 3: 逐供应商预留,失败即补偿回滚 =====
        let attempts = self.config.get_reserve_retry_attempts().await?;
        let product_type = order.order.product_type;

        let mut reserved: Vec<(String, i64)> = Vec::new();
        for allocation in &plan.allocations {
            match self.ledger.reserve(
                &allocation.supplier_id,
                product_type,
                allocation.allocated_quantity,
                attempts,
            ) {
                Ok(()) => reserved.push((
                    allocation.supplier_id.clone(),
                    allocation.allocated_quantity,
                )),
                Err(e) => {
                    self.rollback_reservations(&reserved, product_type, attempts);
                    return Err(e);
                }
            }
        }

        // ===== 步骤 4: 生成 PO 编号并组装采购订单 =====
        let built = match self.build_purchase_orders(plan, &order.order.requested_delivery_date) {
            Ok(built) => built,
            Err(e) => {
                self.rollback_reservations(&reserved, product_type, attempts);
                return Err(e);
            }
        };
        let (purchase_orders, po_items) = built;

        // ===== 步骤 5: 批量落库 (单事务) =====
        if let Err(e) = self
            .repos
            .purchase_order_repo
            .insert_batch(&purchase_orders, &po_items)
        {
            self.rollback_reservations(&reserved, product_type, attempts);
            return Err(e.into());
        }

        // ===== 步骤 6: 父订单状态推进 =====
        self.repos
            .order_repo
            .update_status(&plan.order_id, CustomerOrderStatus::PurchaseOrdersCreated)?;
        self.repos.transition_log_repo.append(
            ENTITY_CUSTOMER_ORDER,
            &plan.order_id,
            from_status.as_str(),
            CustomerOrderStatus::PurchaseOrdersCreated.as_str(),
            actor,
            Some("分配计划提交,采购订单已生成"),
        )?;

        // ===== 步骤 7: 每张采购订单一条审计 =====
        for po in &purchase_orders {
            let entry = AuditEntry::new(
                ENTITY_PURCHASE_ORDER,
                po.po_id.clone(),
                AuditAction::CreatePurchaseOrder,
                actor.to_string(),
            )
            .with_after(po)
            .with_detail(format!("po_number={}", po.po_number));
            self.repos.audit_repo.append(&entry)?;
        }

        // ===== 步骤 8: 通知供应商 (失败只记日志) =====
        for po in &purchase_orders {
            self.notifications.notify_or_log(SupplierNotification {
                po_id: po.po_id.clone(),
                supplier_id: po.supplier_id.clone(),
                event_type: SupplierNotificationType::NewPurchaseOrder,
            });
        }

        info!(
            order_id = %plan.order_id,
            po_count = purchase_orders.len(),
            "采购订单提交完成"
        );

        Ok(purchase_orders)
    }

    /// 组装采购订单与明细（含 PO 编号生成）
    fn build_purchase_orders(
        &self,
        plan: &DistributionPlan,
        required_delivery_date: &chrono::NaiveDate,
    ) -> PlanningResult<(Vec<PurchaseOrder>, Vec<PurchaseOrderItem>)> {
        let today = Utc::now().date_naive();
        let mut purchase_orders = Vec::with_capacity(plan.allocations.len());
        let mut po_items = Vec::new();

        for allocation in &plan.allocations {
            let supplier = self
                .repos
                .supplier_repo
                .find_by_id(&allocation.supplier_id)?
                .ok_or_else(|| PlanningError::NotFound {
                    entity: "supplier".to_string(),
                    id: allocation.supplier_id.clone(),
                })?;

            let seq = self
                .repos
                .purchase_order_repo
                .next_sequence(&supplier.supplier_code, today)?;
            let po_number = format!(
                "PO-{}-{}-{:03}",
                supplier.supplier_code,
                today.format("%Y%m%d"),
                seq
            );

            let po = PurchaseOrder::new(
                po_number,
                plan.order_id.clone(),
                allocation.supplier_id.clone(),
                *required_delivery_date,
            );
            for ia in &allocation.item_allocations {
                po_items.push(PurchaseOrderItem::new(
                    po.po_id.clone(),
                    ia.order_item_id.clone(),
                    ia.quantity,
                ));
            }
            purchase_orders.push(po);
        }

        Ok((purchase_orders, po_items))
    }

    /// 补偿回滚本次提交已完成的预留
    fn rollback_reservations(
        &self,
        reserved: &[(String, i64)],
        product_type: ProductType,
        attempts: u32,
    ) {
        for (supplier_id, qty) in reserved {
            if let Err(e) = self.ledger.release(supplier_id, product_type, *qty, attempts) {
                // 回滚失败意味着账本需要人工校正,必须高可见度记录
                error!(
                    supplier_id = %supplier_id,
                    product_type = %product_type,
                    qty = qty,
                    error = %e,
                    "预留补偿回滚失败"
                );
            }
        }
    }
}
