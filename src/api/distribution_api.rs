// ==========================================
// 采购分发计划系统 - 分发计划 API
// ==========================================
// 职责: 订单接收、分配建议、计划提交、供应商确认/拒绝、
//       状态推进与取消的业务入口
// 说明: 本层只做编排,规则全部在引擎层;
//       错误直接以引擎类型化错误上抛,保证可解释性
// ==========================================

use crate::config::PlanningConfigReader;
use crate::domain::audit::{AuditAction, AuditEntry, ENTITY_CUSTOMER_ORDER, ENTITY_PURCHASE_ORDER};
use crate::domain::distribution::{DistributionPlan, DistributionSuggestion};
use crate::domain::order::{CustomerOrder, CustomerOrderWithItems, OrderItem};
use crate::domain::purchase_order::{total_allocated_quantity, PurchaseOrder};
use crate::domain::types::{
    AllocationStrategy, CustomerOrderStatus, ProductType, PurchaseOrderStatus,
};
use crate::engine::confirmation::{ConfirmationOutcome, ConfirmationRequest, RejectionOutcome};
use crate::engine::error::{PlanningError, PlanningResult};
use crate::engine::ledger::{CapacityLedger, CapacityLedgerOps};
use crate::engine::notifications::{
    NotificationSink, OptionalNotificationSink, SupplierNotification, SupplierNotificationType,
};
use crate::engine::repositories::PlanningRepositories;
use crate::engine::status_machine::{OrderStatusMachine, PurchaseOrderStatusMachine};
use crate::engine::validator::ValidationReport;
use crate::engine::{
    AllocationEngine, DistributionValidator, EligibilityFilter, PurchaseOrderFactory,
    SupplierConfirmationWorkflow,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument};

// ==========================================
// NewOrderItem - 建单入参
// ==========================================
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_code: String,
    pub quantity: i64,
    pub unit: String,
}

// ==========================================
// DistributionApi - 分发计划 API
// ==========================================
pub struct DistributionApi<C>
where
    C: PlanningConfigReader,
{
    repos: PlanningRepositories,
    config: Arc<C>,
    ledger: Arc<dyn CapacityLedgerOps>,
    eligibility: EligibilityFilter<C>,
    allocation: AllocationEngine<C>,
    validator: DistributionValidator<C>,
    factory: PurchaseOrderFactory<C>,
    confirmation: SupplierConfirmationWorkflow<C>,
    notifications: OptionalNotificationSink,
}

impl<C> DistributionApi<C>
where
    C: PlanningConfigReader,
{
    /// 创建新的 DistributionApi 实例
    pub fn new(
        repos: PlanningRepositories,
        config: Arc<C>,
        notification_sink: Option<Arc<dyn NotificationSink>>,
    ) -> Self {
        let ledger: Arc<dyn CapacityLedgerOps> =
            Arc::new(CapacityLedger::new(repos.supplier_repo.clone()));
        Self::with_ledger(repos, config, ledger, notification_sink)
    }

    /// 使用自定义账本实现创建实例（测试注入用）
    pub fn with_ledger(
        repos: PlanningRepositories,
        config: Arc<C>,
        ledger: Arc<dyn CapacityLedgerOps>,
        notification_sink: Option<Arc<dyn NotificationSink>>,
    ) -> Self {
        let factory_notifications = match &notification_sink {
            Some(sink) => OptionalNotificationSink::with_sink(sink.clone()),
            None => OptionalNotificationSink::none(),
        };
        let notifications = match notification_sink {
            Some(sink) => OptionalNotificationSink::with_sink(sink),
            None => OptionalNotificationSink::none(),
        };

        Self {
            eligibility: EligibilityFilter::new(repos.supplier_repo.clone(), config.clone()),
            allocation: AllocationEngine::new(config.clone()),
            validator: DistributionValidator::new(repos.supplier_repo.clone(), config.clone()),
            factory: PurchaseOrderFactory::new(
                repos.clone(),
                ledger.clone(),
                config.clone(),
                factory_notifications,
            ),
            confirmation: SupplierConfirmationWorkflow::new(
                repos.clone(),
                ledger.clone(),
                config.clone(),
            ),
            ledger,
            notifications,
            config,
            repos,
        }
    }

    // ==========================================
    // 订单接收与推进
    // ==========================================

    /// 创建客户订单（明细在创建时固定）
    #[instrument(skip(self, items), fields(customer_id = %customer_id, product_type = %product_type))]
    pub async fn create_customer_order(
        &self,
        customer_id: &str,
        product_type: ProductType,
        requested_delivery_date: NaiveDate,
        items: Vec<NewOrderItem>,
        actor: &str,
    ) -> PlanningResult<CustomerOrderWithItems> {
        if customer_id.trim().is_empty() {
            return Err(PlanningError::Validation(
                "customer_id 不能为空".to_string(),
            ));
        }
        if items.is_empty() {
            return Err(PlanningError::Validation(
                "订单必须至少包含一条明细".to_string(),
            ));
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(PlanningError::Validation(format!(
                    "明细 {} 的数量必须为正: {}",
                    item.product_code, item.quantity
                )));
            }
        }

        let order = CustomerOrder::new(
            customer_id.to_string(),
            product_type,
            requested_delivery_date,
        );
        let order_items = items
            .into_iter()
            .map(|item| {
                OrderItem::new(
                    order.order_id.clone(),
                    item.product_code,
                    item.quantity,
                    item.unit,
                )
            })
            .collect();
        let with_items = CustomerOrderWithItems {
            order,
            items: order_items,
        };

        self.repos.order_repo.insert_with_items(&with_items)?;
        let entry = AuditEntry::new(
            ENTITY_CUSTOMER_ORDER,
            with_items.order.order_id.clone(),
            AuditAction::CreateOrder,
            actor.to_string(),
        )
        .with_after(&with_items);
        self.repos.audit_repo.append(&entry)?;

        info!(order_id = %with_items.order.order_id, "客户订单创建完成");
        Ok(with_items)
    }

    /// 订单进入审核
    pub async fn start_review(&self, order_id: &str, actor: &str) -> PlanningResult<()> {
        self.advance_order(order_id, CustomerOrderStatus::UnderReview, actor, "进入审核")
    }

    /// 订单进入分配计划
    pub async fn start_planning(&self, order_id: &str, actor: &str) -> PlanningResult<()> {
        self.advance_order(
            order_id,
            CustomerOrderStatus::PlanningInProgress,
            actor,
            "进入分配计划",
        )
    }

    /// 客户订单状态推进（经状态机校验 + 转换日志）
    fn advance_order(
        &self,
        order_id: &str,
        to: CustomerOrderStatus,
        actor: &str,
        notes: &str,
    ) -> PlanningResult<()> {
        let order = self.load_order(order_id)?;
        OrderStatusMachine::validate_transition(order.status, to)?;
        self.repos.order_repo.update_status(order_id, to)?;
        self.repos.transition_log_repo.append(
            ENTITY_CUSTOMER_ORDER,
            order_id,
            order.status.as_str(),
            to.as_str(),
            actor,
            Some(notes),
        )?;
        Ok(())
    }

    // ==========================================
    // 分配建议与提交
    // ==========================================

    /// 生成分配建议（准入过滤 + 策略分配）
    ///
    /// 订单必须处于 PlanningInProgress;
    /// 市场产能不足时返回 is_fully_allocated=false 的建议而非报错。
    #[instrument(skip(self), fields(order_id = %order_id, strategy = %strategy))]
    pub async fn suggest_distribution(
        &self,
        order_id: &str,
        strategy: AllocationStrategy,
    ) -> PlanningResult<DistributionSuggestion> {
        let order = self.load_order_with_items(order_id)?;
        if order.order.status != CustomerOrderStatus::PlanningInProgress {
            return Err(PlanningError::Validation(format!(
                "订单 {} 当前状态 {} 不允许生成分配建议",
                order_id, order.order.status
            )));
        }

        let eligible = self
            .eligibility
            .find_eligible(order.order.product_type, order.total_quantity())
            .await?;
        self.allocation.suggest(&order, &eligible, strategy).await
    }

    /// 校验（可能被计划员编辑过的）分配计划,不产生副作用
    pub async fn validate_plan(
        &self,
        plan: &DistributionPlan,
    ) -> PlanningResult<ValidationReport> {
        let order = self.load_order_with_items(&plan.order_id)?;
        self.validator.validate(plan, &order).await
    }

    /// 提交分配计划,生成采购订单（全量成功或全量回滚）
    pub async fn commit_plan(
        &self,
        plan: &DistributionPlan,
        actor: &str,
    ) -> PlanningResult<Vec<PurchaseOrder>> {
        self.factory.create_purchase_orders(plan, actor).await
    }

    /// 把订单下全部采购订单发送给供应商,父订单进入等待确认
    #[instrument(skip(self), fields(order_id = %order_id, actor = %actor))]
    pub async fn send_purchase_orders(&self, order_id: &str, actor: &str) -> PlanningResult<()> {
        let order = self.load_order(order_id)?;
        OrderStatusMachine::validate_transition(
            order.status,
            CustomerOrderStatus::AwaitingSupplierConfirmation,
        )?;

        let pos = self.repos.purchase_order_repo.find_by_order(order_id)?;
        if pos.is_empty() {
            return Err(PlanningError::Validation(format!(
                "订单 {} 没有可发送的采购订单",
                order_id
            )));
        }
        for po in &pos {
            PurchaseOrderStatusMachine::validate_transition(
                po.status,
                PurchaseOrderStatus::SentToSupplier,
            )?;
        }
        for po in &pos {
            self.repos
                .purchase_order_repo
                .update_status(&po.po_id, PurchaseOrderStatus::SentToSupplier)?;
            self.repos.transition_log_repo.append(
                ENTITY_PURCHASE_ORDER,
                &po.po_id,
                po.status.as_str(),
                PurchaseOrderStatus::SentToSupplier.as_str(),
                actor,
                None,
            )?;
        }

        self.repos
            .order_repo
            .update_status(order_id, CustomerOrderStatus::AwaitingSupplierConfirmation)?;
        self.repos.transition_log_repo.append(
            ENTITY_CUSTOMER_ORDER,
            order_id,
            order.status.as_str(),
            CustomerOrderStatus::AwaitingSupplierConfirmation.as_str(),
            actor,
            Some("采购订单已全部发送供应商"),
        )?;
        Ok(())
    }

    // ==========================================
    // 供应商确认工作流
    // ==========================================

    /// 供应商确认采购订单
    pub async fn confirm_purchase_order(
        &self,
        po_id: &str,
        request: &ConfirmationRequest,
        actor: &str,
    ) -> PlanningResult<ConfirmationOutcome> {
        self.confirmation.confirm(po_id, request, actor).await
    }

    /// 供应商拒绝采购订单（释放账本预留;被拒数量由计划员显式重新计划）
    pub async fn reject_purchase_order(
        &self,
        po_id: &str,
        reason: &str,
        actor: &str,
    ) -> PlanningResult<RejectionOutcome> {
        self.confirmation.reject(po_id, reason, actor).await
    }

    // ==========================================
    // 生产/交付推进
    // ==========================================

    /// 采购订单生产链路推进
    ///
    /// 仅接受 InProduction / ReadyForShipment / Shipped / Delivered 四个目标;
    /// 确认、拒绝、取消走各自的专用入口。
    #[instrument(skip(self), fields(po_id = %po_id, to = %to, actor = %actor))]
    pub async fn advance_purchase_order(
        &self,
        po_id: &str,
        to: PurchaseOrderStatus,
        actor: &str,
    ) -> PlanningResult<()> {
        match to {
            PurchaseOrderStatus::InProduction
            | PurchaseOrderStatus::ReadyForShipment
            | PurchaseOrderStatus::Shipped
            | PurchaseOrderStatus::Delivered => {}
            other => {
                return Err(PlanningError::Validation(format!(
                    "状态 {} 必须通过专用流程变更",
                    other
                )));
            }
        }

        let po = self.load_po(po_id)?;
        PurchaseOrderStatusMachine::validate_transition(po.status, to)?;
        self.repos.purchase_order_repo.update_status(po_id, to)?;
        self.repos.transition_log_repo.append(
            ENTITY_PURCHASE_ORDER,
            po_id,
            po.status.as_str(),
            to.as_str(),
            actor,
            None,
        )?;

        if to == PurchaseOrderStatus::Delivered {
            self.cascade_order_delivered(&po.order_id, actor)?;
        }
        Ok(())
    }

    /// 全部采购订单交付后,父订单经 ReadyForDelivery 推进到 Delivered
    fn cascade_order_delivered(&self, order_id: &str, actor: &str) -> PlanningResult<()> {
        let pos = self.repos.purchase_order_repo.find_by_order(order_id)?;
        let all_delivered = !pos.is_empty()
            && pos
                .iter()
                .all(|po| po.status == PurchaseOrderStatus::Delivered);
        if !all_delivered {
            return Ok(());
        }

        let order = self.load_order(order_id)?;
        if order.status == CustomerOrderStatus::InProduction {
            self.advance_order(
                order_id,
                CustomerOrderStatus::ReadyForDelivery,
                actor,
                "全部采购订单已交付",
            )?;
        }
        let order = self.load_order(order_id)?;
        if order.status == CustomerOrderStatus::ReadyForDelivery {
            self.advance_order(order_id, CustomerOrderStatus::Delivered, actor, "订单交付")?;
        }
        Ok(())
    }

    // ==========================================
    // 取消流程
    // ==========================================

    /// 取消采购订单（幂等的账本释放语义）
    #[instrument(skip(self), fields(po_id = %po_id, actor = %actor))]
    pub async fn cancel_purchase_order(
        &self,
        po_id: &str,
        actor: &str,
        reason: &str,
    ) -> PlanningResult<()> {
        let po = self.load_po(po_id)?;
        PurchaseOrderStatusMachine::validate_transition(
            po.status,
            PurchaseOrderStatus::Cancelled,
        )?;

        // 仍持有预留的订单需释放账本;已拒绝/已取消的订单预留早已释放
        if po.holds_reservation() {
            let order = self.load_order(&po.order_id)?;
            let items = self.repos.purchase_order_repo.find_items(po_id)?;
            let qty = total_allocated_quantity(&items);
            if qty > 0 {
                let attempts = self.config.get_reserve_retry_attempts().await?;
                self.ledger
                    .release(&po.supplier_id, order.product_type, qty, attempts)?;
            }
        }

        self.repos
            .purchase_order_repo
            .update_status(po_id, PurchaseOrderStatus::Cancelled)?;
        self.repos.transition_log_repo.append(
            ENTITY_PURCHASE_ORDER,
            po_id,
            po.status.as_str(),
            PurchaseOrderStatus::Cancelled.as_str(),
            actor,
            Some(reason),
        )?;

        let entry = AuditEntry::new(
            ENTITY_PURCHASE_ORDER,
            po_id.to_string(),
            AuditAction::CancelPurchaseOrder,
            actor.to_string(),
        )
        .with_before(&po)
        .with_detail(format!("reason={}", reason));
        self.repos.audit_repo.append(&entry)?;

        self.notifications.notify_or_log(SupplierNotification {
            po_id: po_id.to_string(),
            supplier_id: po.supplier_id.clone(),
            event_type: SupplierNotificationType::PurchaseOrderCancelled,
        });
        Ok(())
    }

    /// 取消客户订单,级联取消全部非终态采购订单并释放账本
    #[instrument(skip(self), fields(order_id = %order_id, actor = %actor))]
    pub async fn cancel_customer_order(
        &self,
        order_id: &str,
        actor: &str,
        reason: &str,
    ) -> PlanningResult<()> {
        let order = self.load_order(order_id)?;
        OrderStatusMachine::validate_transition(order.status, CustomerOrderStatus::Cancelled)?;

        let pos = self.repos.purchase_order_repo.find_by_order(order_id)?;
        for po in &pos {
            if !po.is_terminal() {
                self.cancel_purchase_order(&po.po_id, actor, reason).await?;
            }
        }

        self.repos
            .order_repo
            .update_status(order_id, CustomerOrderStatus::Cancelled)?;
        self.repos.transition_log_repo.append(
            ENTITY_CUSTOMER_ORDER,
            order_id,
            order.status.as_str(),
            CustomerOrderStatus::Cancelled.as_str(),
            actor,
            Some(reason),
        )?;

        let entry = AuditEntry::new(
            ENTITY_CUSTOMER_ORDER,
            order_id.to_string(),
            AuditAction::CancelOrder,
            actor.to_string(),
        )
        .with_before(&order)
        .with_detail(format!("reason={}", reason));
        self.repos.audit_repo.append(&entry)?;

        info!(order_id = %order_id, cancelled_pos = pos.len(), "客户订单已取消");
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询订单及明细
    pub fn get_order_with_items(
        &self,
        order_id: &str,
    ) -> PlanningResult<CustomerOrderWithItems> {
        self.load_order_with_items(order_id)
    }

    /// 查询采购订单
    pub fn get_purchase_order(&self, po_id: &str) -> PlanningResult<PurchaseOrder> {
        self.load_po(po_id)
    }

    /// 查询订单下的全部采购订单
    pub fn list_purchase_orders(&self, order_id: &str) -> PlanningResult<Vec<PurchaseOrder>> {
        Ok(self.repos.purchase_order_repo.find_by_order(order_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn load_order(&self, order_id: &str) -> PlanningResult<CustomerOrder> {
        self.repos
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| PlanningError::NotFound {
                entity: "customer_order".to_string(),
                id: order_id.to_string(),
            })
    }

    fn load_order_with_items(&self, order_id: &str) -> PlanningResult<CustomerOrderWithItems> {
        self.repos
            .order_repo
            .find_with_items(order_id)?
            .ok_or_else(|| PlanningError::NotFound {
                entity: "customer_order".to_string(),
                id: order_id.to_string(),
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
}
