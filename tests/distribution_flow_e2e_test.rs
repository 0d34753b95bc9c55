// ==========================================
// 分发计划全流程端到端测试
// ==========================================
// 职责: 订单接收 → 建议 → 提交 → 发送 → 确认/拒绝 → 交付/取消
//       的完整业务链路,含账本与审计断言
// ==========================================


#[cfg(test)]
mod distribution_flow_e2e_test {
    use crate::test_helpers::{build_api, committed_qty, create_test_db, seed_supplier};
    use chrono::NaiveDate;
    use procurement_planner::api::{DistributionApi, NewOrderItem};
    use procurement_planner::config::ConfigManager;
    use procurement_planner::domain::audit::{ENTITY_CUSTOMER_ORDER, ENTITY_PURCHASE_ORDER};
    use procurement_planner::domain::purchase_order::PurchaseOrder;
    use procurement_planner::domain::types::{
        AllocationStrategy, CustomerOrderStatus, ProductType, PurchaseOrderStatus,
    };
    use procurement_planner::engine::confirmation::{ConfirmationRequest, ItemPackaging};
    use procurement_planner::engine::{PlanningError, PlanningRepositories};

    const REQUIRED_DATE: (i32, u32, u32) = (2026, 9, 1);

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn required_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(REQUIRED_DATE.0, REQUIRED_DATE.1, REQUIRED_DATE.2).unwrap()
    }

    /// 建单 → 审核 → 计划 → 建议 → 提交,返回 (order_id, 采购订单列表)
    async fn committed_order(
        api: &DistributionApi<ConfigManager>,
        quantities: &[i64],
    ) -> (String, Vec<PurchaseOrder>) {
        let items = quantities
            .iter()
            .enumerate()
            .map(|(i, qty)| NewOrderItem {
                product_code: format!("LMR-{:03}", i + 1),
                quantity: *qty,
                unit: "EA".to_string(),
            })
            .collect();
        let order = api
            .create_customer_order("W25G1T", ProductType::Lmr, required_date(), items, "planner")
            .await
            .unwrap();
        let order_id = order.order.order_id.clone();
        api.start_review(&order_id, "planner").await.unwrap();
        api.start_planning(&order_id, "planner").await.unwrap();

        let suggestion = api
            .suggest_distribution(&order_id, AllocationStrategy::Balanced)
            .await
            .unwrap();
        assert!(suggestion.is_fully_allocated);
        let pos = api
            .commit_plan(&suggestion.into_plan(), "planner")
            .await
            .unwrap();
        (order_id, pos)
    }

    /// 对单个采购订单构造覆盖全部明细的确认请求
    fn confirmation_for(
        repos: &PlanningRepositories,
        po_id: &str,
        estimated: NaiveDate,
    ) -> ConfirmationRequest {
        let item_packaging = repos
            .purchase_order_repo
            .find_items(po_id)
            .unwrap()
            .into_iter()
            .map(|item| ItemPackaging {
                po_item_id: item.po_item_id,
                packaging_spec: "CASE-24".to_string(),
            })
            .collect();
        ConfirmationRequest {
            estimated_delivery_date: estimated,
            item_packaging,
        }
    }

    // ==========================================
    // 提交: 采购订单生成与账本预留
    // ==========================================

    #[tokio::test]
    async fn test_commit_creates_pos_and_reserves_ledger() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[40, 60]).await;

        // 每个供应商一张采购订单
        assert_eq!(pos.len(), 2);
        assert!(pos.iter().all(|po| po.status == PurchaseOrderStatus::Created));
        assert!(pos.iter().all(|po| po.estimated_delivery_date.is_none()));

        // 编号格式 PO-{code}-{yyyyMMdd}-{seq:03}
        let alp_po = pos.iter().find(|po| po.supplier_id == "S001").unwrap();
        assert!(alp_po.po_number.starts_with("PO-ALP-"));
        assert!(alp_po.po_number.ends_with("-001"));

        // 账本预留 = 分配量 (Balanced 60/80 等绩效 → 46/54)
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 46);
        assert_eq!(committed_qty(&repos, "S002", ProductType::Lmr), 54);

        // 父订单状态推进
        let order = api.get_order_with_items(&order_id).unwrap();
        assert_eq!(order.order.status, CustomerOrderStatus::PurchaseOrdersCreated);

        // 每张采购订单一条创建审计
        for po in &pos {
            let trail = repos
                .audit_repo
                .list_by_entity(ENTITY_PURCHASE_ORDER, &po.po_id)
                .unwrap();
            assert!(trail.iter().any(|e| e.action_type == "CreatePurchaseOrder"));
        }

        // 明细守恒: 同一订单明细跨 PO 的分配量之和等于明细量
        let mut per_item = std::collections::HashMap::new();
        for po in &pos {
            for item in repos.purchase_order_repo.find_items(&po.po_id).unwrap() {
                *per_item.entry(item.order_item_id).or_insert(0i64) +=
                    item.allocated_quantity;
            }
        }
        let order = api.get_order_with_items(&order_id).unwrap();
        for item in &order.items {
            assert_eq!(per_item[&item.item_id], item.quantity);
        }
    }

    #[tokio::test]
    async fn test_po_numbers_unique_per_supplier_per_day() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 500, 0, Some((0.9, 4.0)));

        let (_o1, pos1) = committed_order(&api, &[50]).await;
        let (_o2, pos2) = committed_order(&api, &[50]).await;

        assert!(pos1[0].po_number.ends_with("-001"));
        assert!(pos2[0].po_number.ends_with("-002"));
        assert_ne!(pos1[0].po_number, pos2[0].po_number);
    }

    // ==========================================
    // 发送与确认
    // ==========================================

    #[tokio::test]
    async fn test_send_and_confirm_cascades_to_in_production() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();

        let order = api.get_order_with_items(&order_id).unwrap();
        assert_eq!(
            order.order.status,
            CustomerOrderStatus::AwaitingSupplierConfirmation
        );

        // 第一张确认后订单尚未进入生产
        let est = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        let outcome = api
            .confirm_purchase_order(
                &pos[0].po_id,
                &confirmation_for(&repos, &pos[0].po_id, est),
                "supplier_portal",
            )
            .await
            .unwrap();
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            outcome.purchase_order.status,
            PurchaseOrderStatus::Confirmed
        );
        assert_eq!(outcome.purchase_order.estimated_delivery_date, Some(est));
        assert_eq!(
            api.get_order_with_items(&order_id).unwrap().order.status,
            CustomerOrderStatus::AwaitingSupplierConfirmation
        );

        // 全部确认 → InProduction
        api.confirm_purchase_order(
            &pos[1].po_id,
            &confirmation_for(&repos, &pos[1].po_id, est),
            "supplier_portal",
        )
        .await
        .unwrap();
        assert_eq!(
            api.get_order_with_items(&order_id).unwrap().order.status,
            CustomerOrderStatus::InProduction
        );

        // 确认后包装字段已填写
        for item in repos.purchase_order_repo.find_items(&pos[0].po_id).unwrap() {
            assert_eq!(item.packaging_spec.as_deref(), Some("CASE-24"));
        }
    }

    #[tokio::test]
    async fn test_confirm_date_rules() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 200, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();
        let po_id = &pos[0].po_id;

        // 晚于要求日期 → 阻断
        let late = NaiveDate::from_ymd_opt(2026, 9, 2).unwrap();
        let err = api
            .confirm_purchase_order(po_id, &confirmation_for(&repos, po_id, late), "supplier")
            .await
            .unwrap_err();
        match err {
            PlanningError::Validation(msg) => {
                assert!(msg.contains("ESTIMATED_AFTER_REQUIRED"))
            }
            other => panic!("预期 Validation, 实际: {:?}", other),
        }

        // 距要求日期 2 天以内 → 告警但放行
        let tight = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let outcome = api
            .confirm_purchase_order(po_id, &confirmation_for(&repos, po_id, tight), "supplier")
            .await
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("DELIVERY_DATE_TIGHT"));
    }

    #[tokio::test]
    async fn test_confirm_requires_full_packaging() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 200, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[40, 60]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();
        let po_id = &pos[0].po_id;

        // 缺一条明细的包装信息 → 阻断
        let mut request =
            confirmation_for(&repos, po_id, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
        request.item_packaging.pop();
        let err = api
            .confirm_purchase_order(po_id, &request, "supplier")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
    }

    // ==========================================
    // 场景 C: 供应商拒绝释放账本
    // ==========================================

    #[tokio::test]
    async fn test_reject_releases_ledger_capacity() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();

        let rejected = pos.iter().find(|po| po.supplier_id == "S001").unwrap();
        let before = committed_qty(&repos, "S001", ProductType::Lmr);
        assert_eq!(before, 46);

        let outcome = api
            .reject_purchase_order(&rejected.po_id, "capacity conflict", "supplier_portal")
            .await
            .unwrap();

        // 账本恢复,状态落 Rejected
        assert_eq!(outcome.released_quantity, 46);
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 0);
        assert_eq!(
            outcome.purchase_order.status,
            PurchaseOrderStatus::Rejected
        );

        // 另一张不受影响
        assert_eq!(committed_qty(&repos, "S002", ProductType::Lmr), 54);

        // 父订单不自动回到计划状态,由计划员显式处理
        assert_eq!(
            api.get_order_with_items(&order_id).unwrap().order.status,
            CustomerOrderStatus::AwaitingSupplierConfirmation
        );

        // 拒绝审计含原因
        let trail = repos
            .audit_repo
            .list_by_entity(ENTITY_PURCHASE_ORDER, &rejected.po_id)
            .unwrap();
        let reject_entry = trail
            .iter()
            .find(|e| e.action_type == "RejectPurchaseOrder")
            .unwrap();
        assert!(reject_entry
            .detail
            .as_deref()
            .unwrap()
            .contains("capacity conflict"));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 200, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();

        let err = api
            .reject_purchase_order(&pos[0].po_id, "   ", "supplier")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
        // 状态与账本都未变
        assert_eq!(
            api.get_purchase_order(&pos[0].po_id).unwrap().status,
            PurchaseOrderStatus::SentToSupplier
        );
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 100);
    }

    // ==========================================
    // 交付链路与级联
    // ==========================================

    #[tokio::test]
    async fn test_delivery_chain_cascades_to_order_delivered() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();
        let est = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        for po in &pos {
            api.confirm_purchase_order(
                &po.po_id,
                &confirmation_for(&repos, &po.po_id, est),
                "supplier",
            )
            .await
            .unwrap();
        }

        for po in &pos {
            for status in [
                PurchaseOrderStatus::InProduction,
                PurchaseOrderStatus::ReadyForShipment,
                PurchaseOrderStatus::Shipped,
                PurchaseOrderStatus::Delivered,
            ] {
                api.advance_purchase_order(&po.po_id, status, "logistics")
                    .await
                    .unwrap();
            }
        }

        // 全部交付 → 订单经 ReadyForDelivery 到 Delivered
        let order = api.get_order_with_items(&order_id).unwrap();
        assert_eq!(order.order.status, CustomerOrderStatus::Delivered);

        // 交付后订单不可再取消
        let err = api
            .cancel_customer_order(&order_id, "planner", "too late")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidStatusTransition { .. }));
    }

    // ==========================================
    // 取消流程
    // ==========================================

    #[tokio::test]
    async fn test_cancel_order_releases_all_reservations() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 46);
        assert_eq!(committed_qty(&repos, "S002", ProductType::Lmr), 54);

        api.cancel_customer_order(&order_id, "planner", "customer withdrew")
            .await
            .unwrap();

        // 订单与全部采购订单取消,账本全量释放
        assert_eq!(
            api.get_order_with_items(&order_id).unwrap().order.status,
            CustomerOrderStatus::Cancelled
        );
        for po in &pos {
            assert_eq!(
                api.get_purchase_order(&po.po_id).unwrap().status,
                PurchaseOrderStatus::Cancelled
            );
        }
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 0);
        assert_eq!(committed_qty(&repos, "S002", ProductType::Lmr), 0);

        // 已拒绝的订单不再重复释放: 取消是幂等的账本语义
        let transitions = repos
            .transition_log_repo
            .list_by_entity(ENTITY_CUSTOMER_ORDER, &order_id)
            .unwrap();
        assert!(transitions
            .iter()
            .any(|t| t.to_status == "CANCELLED" && t.entity_id == order_id));
    }

    #[tokio::test]
    async fn test_cancel_after_rejection_does_not_double_release() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let (order_id, pos) = committed_order(&api, &[100]).await;
        api.send_purchase_orders(&order_id, "planner").await.unwrap();

        let rejected = pos.iter().find(|po| po.supplier_id == "S001").unwrap();
        api.reject_purchase_order(&rejected.po_id, "capacity conflict", "supplier")
            .await
            .unwrap();
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 0);

        // 取消订单: 已拒绝的 PO 保持 Rejected,其预留不会被二次释放
        api.cancel_customer_order(&order_id, "planner", "re-plan abandoned")
            .await
            .unwrap();
        assert_eq!(committed_qty(&repos, "S001", ProductType::Lmr), 0);
        assert_eq!(committed_qty(&repos, "S002", ProductType::Lmr), 0);
        assert_eq!(
            api.get_purchase_order(&rejected.po_id).unwrap().status,
            PurchaseOrderStatus::Rejected
        );
    }

    // ==========================================
    // 状态机防护
    // ==========================================

    #[tokio::test]
    async fn test_invalid_order_transitions_rejected() {
        let (_temp_file, db_path) = create_test_db();
        let (api, _repos) = build_api(&db_path);

        let order = api
            .create_customer_order(
                "W25G1T",
                ProductType::Lmr,
                required_date(),
                vec![NewOrderItem {
                    product_code: "LMR-001".to_string(),
                    quantity: 10,
                    unit: "EA".to_string(),
                }],
                "planner",
            )
            .await
            .unwrap();
        let order_id = order.order.order_id;

        // 跳步: Submitted → PlanningInProgress
        let err = api.start_planning(&order_id, "planner").await.unwrap_err();
        assert!(matches!(err, PlanningError::InvalidStatusTransition { .. }));

        // 正常推进后不可重复
        api.start_review(&order_id, "planner").await.unwrap();
        let err = api.start_review(&order_id, "planner").await.unwrap_err();
        assert!(matches!(err, PlanningError::InvalidStatusTransition { .. }));
    }
}
