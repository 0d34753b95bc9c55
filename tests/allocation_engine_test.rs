// ==========================================
// 分配引擎集成测试
// ==========================================
// 职责: 验证准入过滤 + 策略分配在真实仓储上的端到端行为
// ==========================================


#[cfg(test)]
mod allocation_engine_test {
    use crate::test_helpers::{build_api, create_test_db, seed_supplier};
    use chrono::NaiveDate;
    use procurement_planner::api::NewOrderItem;
    use procurement_planner::domain::order::CustomerOrderWithItems;
    use procurement_planner::domain::types::{AllocationStrategy, ProductType};
    use procurement_planner::engine::PlanningError;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn order_items(quantities: &[i64]) -> Vec<NewOrderItem> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, qty)| NewOrderItem {
                product_code: format!("LMR-{:03}", i + 1),
                quantity: *qty,
                unit: "EA".to_string(),
            })
            .collect()
    }

    /// 建单并推进到 PlanningInProgress
    async fn planned_order(
        api: &procurement_planner::api::DistributionApi<
            procurement_planner::config::ConfigManager,
        >,
        quantities: &[i64],
    ) -> CustomerOrderWithItems {
        let order = api
            .create_customer_order(
                "W25G1T",
                ProductType::Lmr,
                NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                order_items(quantities),
                "planner",
            )
            .await
            .unwrap();
        api.start_review(&order.order.order_id, "planner").await.unwrap();
        api.start_planning(&order.order.order_id, "planner").await.unwrap();
        order
    }

    // ==========================================
    // 场景 A: 均衡策略确定性拆分
    // ==========================================

    #[tokio::test]
    async fn test_balanced_split_is_deterministic() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        // 两家绩效相同,产能 60/80
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 80, 0, Some((0.9, 4.0)));

        let order = planned_order(&api, &[100]).await;

        let suggestion = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::Balanced)
            .await
            .unwrap();

        assert!(suggestion.is_fully_allocated);
        assert_eq!(suggestion.unallocated_quantity, 0);
        assert_eq!(suggestion.total_allocated(), 100);

        // 确定性拆分: 绩效同分,产能权重归一化 0.75/1.0 → 46/54
        assert_eq!(suggestion.allocations.len(), 2);
        assert_eq!(suggestion.allocations[0].supplier_id, "S001");
        assert_eq!(suggestion.allocations[0].allocated_quantity, 46);
        assert_eq!(suggestion.allocations[1].supplier_id, "S002");
        assert_eq!(suggestion.allocations[1].allocated_quantity, 54);

        // 重复执行结果一致
        let again = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::Balanced)
            .await
            .unwrap();
        assert_eq!(again.allocations[0].allocated_quantity, 46);
        assert_eq!(again.allocations[1].allocated_quantity, 54);
    }

    #[tokio::test]
    async fn test_even_split_remainder_to_lower_supplier_id() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 200, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 200, 0, Some((0.9, 4.0)));

        let order = planned_order(&api, &[101]).await;
        let suggestion = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::EvenDistribution)
            .await
            .unwrap();

        // 同权重零头给 supplier_id 较小的一方
        assert_eq!(suggestion.allocations[0].supplier_id, "S001");
        assert_eq!(suggestion.allocations[0].allocated_quantity, 51);
        assert_eq!(suggestion.allocations[1].allocated_quantity, 50);
    }

    // ==========================================
    // 场景 B: 市场产能不足
    // ==========================================

    #[tokio::test]
    async fn test_insufficient_capacity_reported_and_commit_blocked() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        // 总产能 300 < 需求 500
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 100, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 200, 0, Some((0.9, 4.0)));

        let order = planned_order(&api, &[500]).await;
        let suggestion = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::CapacityBased)
            .await
            .unwrap();

        // 缺口如实上报,不抛异常
        assert!(!suggestion.is_fully_allocated);
        assert_eq!(suggestion.unallocated_quantity, 200);
        assert_eq!(suggestion.total_allocated(), 300);

        // 原样提交必须被守恒律拦截
        let plan = suggestion.into_plan();
        let report = api.validate_plan(&plan).await.unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| matches!(
            e,
            PlanningError::QuantityMismatch {
                expected: 500,
                actual: 300
            }
        )));

        let err = api.commit_plan(&plan, "planner").await.unwrap_err();
        assert!(matches!(err, PlanningError::QuantityMismatch { .. }));
    }

    // ==========================================
    // 准入与建议的衔接
    // ==========================================

    #[tokio::test]
    async fn test_no_eligible_supplier_surfaces_error() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        // 唯一候选绩效不达标
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 100, 0, Some((0.5, 2.0)));

        let order = planned_order(&api, &[50]).await;
        let err = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::Balanced)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::NotEligible { .. }));
    }

    #[tokio::test]
    async fn test_unranked_supplier_used_as_last_resort() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        // 有绩效的产能不够,无绩效的供应商兜底
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 60, 0, Some((0.9, 4.0)));
        seed_supplier(&repos, "S002", "BRV", ProductType::Lmr, 100, 0, None);

        let order = planned_order(&api, &[100]).await;
        let suggestion = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::PerformanceBased)
            .await
            .unwrap();

        assert!(suggestion.is_fully_allocated);
        let s001 = suggestion
            .allocations
            .iter()
            .find(|a| a.supplier_id == "S001")
            .unwrap();
        let s002 = suggestion
            .allocations
            .iter()
            .find(|a| a.supplier_id == "S002")
            .unwrap();
        // 绩效权重把有数据的一方打满,其余落到无绩效供应商
        assert_eq!(s001.allocated_quantity, 60);
        assert_eq!(s002.allocated_quantity, 40);
    }

    #[tokio::test]
    async fn test_suggest_requires_planning_status() {
        let (_temp_file, db_path) = create_test_db();
        let (api, repos) = build_api(&db_path);
        seed_supplier(&repos, "S001", "ALP", ProductType::Lmr, 100, 0, Some((0.9, 4.0)));

        let order = api
            .create_customer_order(
                "W25G1T",
                ProductType::Lmr,
                NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                order_items(&[50]),
                "planner",
            )
            .await
            .unwrap();

        // 仍处 Submitted,不允许生成建议
        let err = api
            .suggest_distribution(&order.order.order_id, AllocationStrategy::Balanced)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanningError::Validation(_)));
    }
}
