// ==========================================
// 采购分发计划系统 - 分配算法核心
// ==========================================
// 算法: 约束注水 (比例试分配 → 产能钳制 → 开放集收缩 → 残量递归)
// 红线: 单个供应商分配量不得超过其计算时点的可用产能;
//       分配不完的数量如实上报,不静默丢弃
// 性质: 确定性;最多 N 轮收敛 (N = 供应商数)
// ==========================================

use crate::domain::types::AllocationStrategy;

// ==========================================
// AllocationCandidate - 分配候选供应商
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationCandidate {
    pub supplier_id: String,
    pub available_capacity: i64,
    // 无绩效数据的供应商得分为 None,参与分配但权重为 0
    pub performance_score: Option<f64>,
}

// ==========================================
// AllocationOutcome - 核心算法输出
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    // 与候选列表同序的分配量
    pub quantities: Vec<i64>,
    // 市场总产能不足时的未分配量
    pub unallocated: i64,
}

// ==========================================
// AllocationCore - 纯函数算法核心
// ==========================================
// 红线: 不读配置,不碰仓储,只做计算
pub struct AllocationCore;

impl AllocationCore {
    /// 约束注水分配
    ///
    /// 过程:
    /// 1) 在开放集上归一化权重
    /// 2) 试分配 floor(weight_i × remaining)
    /// 3) 钳制到各自可用产能,钳满者关闭出局
    /// 4) 有人关闭且残量>0 时,在缩小后的开放集上重复
    /// 5) 无人关闭时,残量即取整零头,按权重降序(同权重按 supplier_id 升序)
    ///    逐单位指派,直至耗尽或产能用尽
    ///
    /// # 返回
    /// 与候选同序的分配量,以及未能分配的数量
    pub fn water_fill(
        candidates: &[AllocationCandidate],
        total_quantity: i64,
        strategy: AllocationStrategy,
        balanced_alpha: f64,
    ) -> AllocationOutcome {
        let n = candidates.len();
        let mut quantities = vec![0i64; n];
        let mut remaining = total_quantity.max(0);

        // 初始开放集: 有可用产能的候选
        let mut open: Vec<usize> = (0..n)
            .filter(|&i| candidates[i].available_capacity > 0)
            .collect();

        while remaining > 0 && !open.is_empty() {
            let mut weights =
                Self::compute_weights(candidates, &quantities, &open, strategy, balanced_alpha);
            let mut weight_sum: f64 = weights.iter().sum();
            if weight_sum <= f64::EPSILON {
                // 权重退化 (例如全员无绩效数据) 时按均匀分配兜底
                weights = vec![1.0; open.len()];
                weight_sum = open.len() as f64;
            }

            let mut closed: Vec<usize> = Vec::new();
            let mut granted_total = 0i64;
            for (slot, &idx) in open.iter().enumerate() {
                let tentative =
                    ((weights[slot] / weight_sum) * remaining as f64).floor() as i64;
                let headroom = candidates[idx].available_capacity - quantities[idx];
                let granted = tentative.min(headroom);
                quantities[idx] += granted;
                granted_total += granted;
                if quantities[idx] >= candidates[idx].available_capacity {
                    closed.push(idx);
                }
            }
            remaining -= granted_total;

            if closed.is_empty() {
                // 无人钳满: 残量为取整零头 (< 开放集大小),逐单位指派后结束
                remaining =
                    Self::assign_remainder(candidates, &mut quantities, &open, &weights, remaining);
                break;
            }
            open.retain(|idx| !closed.contains(idx));
        }

        AllocationOutcome {
            quantities,
            unallocated: remaining,
        }
    }

    /// 计算开放集上的策略权重
    ///
    /// - EvenDistribution: 全员 1
    /// - CapacityBased: 剩余可用产能
    /// - PerformanceBased: 综合绩效得分 (缺失按 0)
    /// - Balanced: α·norm(绩效) + (1-α)·norm(产能),norm 为除以开放集最大值
    fn compute_weights(
        candidates: &[AllocationCandidate],
        quantities: &[i64],
        open: &[usize],
        strategy: AllocationStrategy,
        balanced_alpha: f64,
    ) -> Vec<f64> {
        let headroom = |idx: usize| -> f64 {
            (candidates[idx].available_capacity - quantities[idx]).max(0) as f64
        };
        let score = |idx: usize| -> f64 {
            candidates[idx].performance_score.unwrap_or(0.0).max(0.0)
        };

        match strategy {
            AllocationStrategy::EvenDistribution => vec![1.0; open.len()],
            AllocationStrategy::CapacityBased => open.iter().map(|&i| headroom(i)).collect(),
            AllocationStrategy::PerformanceBased => open.iter().map(|&i| score(i)).collect(),
            AllocationStrategy::Balanced => {
                let capacity_max = open.iter().map(|&i| headroom(i)).fold(0.0_f64, f64::max);
                let score_max = open.iter().map(|&i| score(i)).fold(0.0_f64, f64::max);
                let alpha = balanced_alpha.clamp(0.0, 1.0);

                open.iter()
                    .map(|&i| {
                        let capacity_norm = if capacity_max > 0.0 {
                            headroom(i) / capacity_max
                        } else {
                            0.0
                        };
                        let score_norm = if score_max > 0.0 { score(i) / score_max } else { 0.0 };
                        alpha * score_norm + (1.0 - alpha) * capacity_norm
                    })
                    .collect()
            }
        }
    }

    /// 取整零头逐单位指派
    ///
    /// 顺序: 权重降序,同权重按 supplier_id 升序;
    /// 多轮循环直至残量耗尽或所有开放供应商产能用尽。
    fn assign_remainder(
        candidates: &[AllocationCandidate],
        quantities: &mut [i64],
        open: &[usize],
        weights: &[f64],
        mut remaining: i64,
    ) -> i64 {
        let mut order: Vec<(usize, f64)> = open
            .iter()
            .enumerate()
            .map(|(slot, &idx)| (idx, weights[slot]))
            .collect();
        order.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| candidates[a.0].supplier_id.cmp(&candidates[b.0].supplier_id))
        });

        while remaining > 0 {
            let mut progressed = false;
            for &(idx, _) in &order {
                if remaining == 0 {
                    break;
                }
                if quantities[idx] < candidates[idx].available_capacity {
                    quantities[idx] += 1;
                    remaining -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        remaining
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, capacity: i64, score: Option<f64>) -> AllocationCandidate {
        AllocationCandidate {
            supplier_id: id.to_string(),
            available_capacity: capacity,
            performance_score: score,
        }
    }

    fn total(outcome: &AllocationOutcome) -> i64 {
        outcome.quantities.iter().sum()
    }

    #[test]
    fn test_even_distribution_exact_split() {
        let candidates = vec![
            candidate("S001", 100, Some(0.8)),
            candidate("S002", 100, Some(0.6)),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            100,
            AllocationStrategy::EvenDistribution,
            0.5,
        );
        assert_eq!(outcome.quantities, vec![50, 50]);
        assert_eq!(outcome.unallocated, 0);
    }

    #[test]
    fn test_even_distribution_remainder_goes_to_lower_id() {
        let candidates = vec![
            candidate("S001", 100, Some(0.8)),
            candidate("S002", 100, Some(0.8)),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            101,
            AllocationStrategy::EvenDistribution,
            0.5,
        );
        // 同权重零头按 supplier_id 升序指派
        assert_eq!(outcome.quantities, vec![51, 50]);
        assert_eq!(outcome.unallocated, 0);
    }

    #[test]
    fn test_balanced_scenario_two_suppliers() {
        // 数量 100,产能 60/80,绩效相同,Balanced 策略:
        // w1 = 0.5·1 + 0.5·0.75 = 0.875, w2 = 1.0 → 试分配 46/53,零头给高权重方
        let candidates = vec![
            candidate("S001", 60, Some(0.7)),
            candidate("S002", 80, Some(0.7)),
        ];
        let outcome =
            AllocationCore::water_fill(&candidates, 100, AllocationStrategy::Balanced, 0.5);
        assert_eq!(outcome.quantities, vec![46, 54]);
        assert_eq!(outcome.unallocated, 0);
        assert_eq!(total(&outcome), 100);
    }

    #[test]
    fn test_insufficient_market_capacity_reported() {
        // 需求 500,总产能 300 → 全部钳满,未分配 200
        let candidates = vec![
            candidate("S001", 100, Some(0.9)),
            candidate("S002", 200, Some(0.9)),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            500,
            AllocationStrategy::EvenDistribution,
            0.5,
        );
        assert_eq!(outcome.quantities, vec![100, 200]);
        assert_eq!(outcome.unallocated, 200);
    }

    #[test]
    fn test_clamp_then_redistribute() {
        // 均匀试分配 100/100 把 S001 (产能 30) 钳满,
        // 残量 70 在 {S002, S003} 上继续注水
        let candidates = vec![
            candidate("S001", 30, None),
            candidate("S002", 200, None),
            candidate("S003", 200, None),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            210,
            AllocationStrategy::EvenDistribution,
            0.5,
        );
        assert_eq!(outcome.quantities[0], 30);
        assert_eq!(total(&outcome), 210);
        assert_eq!(outcome.unallocated, 0);
        // 残量在剩余两家间均分
        assert_eq!(outcome.quantities[1], 90);
        assert_eq!(outcome.quantities[2], 90);
    }

    #[test]
    fn test_capacity_based_weights() {
        let candidates = vec![
            candidate("S001", 60, Some(0.5)),
            candidate("S002", 80, Some(0.5)),
        ];
        let outcome =
            AllocationCore::water_fill(&candidates, 100, AllocationStrategy::CapacityBased, 0.5);
        // w = 60/80 → 试分配 42/57,零头给产能更大的 S002
        assert_eq!(outcome.quantities, vec![42, 58]);
        assert_eq!(outcome.unallocated, 0);
    }

    #[test]
    fn test_performance_based_weights() {
        let candidates = vec![
            candidate("S001", 500, Some(0.9)),
            candidate("S002", 500, Some(0.3)),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            120,
            AllocationStrategy::PerformanceBased,
            0.5,
        );
        // w = 0.9/0.3 → 90/30
        assert_eq!(outcome.quantities, vec![90, 30]);
        assert_eq!(outcome.unallocated, 0);
    }

    #[test]
    fn test_all_scores_missing_falls_back_to_even() {
        let candidates = vec![
            candidate("S001", 100, None),
            candidate("S002", 100, None),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            80,
            AllocationStrategy::PerformanceBased,
            0.5,
        );
        assert_eq!(outcome.quantities, vec![40, 40]);
        assert_eq!(outcome.unallocated, 0);
    }

    #[test]
    fn test_no_allocation_exceeds_capacity() {
        let grid = [
            (vec![("S001", 7), ("S002", 13), ("S003", 29)], 45),
            (vec![("S001", 1), ("S002", 1), ("S003", 1)], 10),
            (vec![("S001", 1000), ("S002", 3), ("S003", 500)], 777),
        ];
        for (spec_row, qty) in grid {
            let candidates: Vec<AllocationCandidate> = spec_row
                .iter()
                .map(|(id, cap)| candidate(id, *cap, Some(0.5)))
                .collect();
            for strategy in [
                AllocationStrategy::EvenDistribution,
                AllocationStrategy::CapacityBased,
                AllocationStrategy::PerformanceBased,
                AllocationStrategy::Balanced,
            ] {
                let outcome = AllocationCore::water_fill(&candidates, qty, strategy, 0.5);
                for (i, allocated) in outcome.quantities.iter().enumerate() {
                    assert!(
                        *allocated <= candidates[i].available_capacity,
                        "策略 {} 下 {} 超出产能",
                        strategy,
                        candidates[i].supplier_id
                    );
                    assert!(*allocated >= 0);
                }
                // 守恒: 已分配 + 未分配 == 需求
                assert_eq!(total(&outcome) + outcome.unallocated, qty);
                // 总产能足够时必须完全分配
                let capacity_sum: i64 =
                    candidates.iter().map(|c| c.available_capacity).sum();
                if capacity_sum >= qty {
                    assert_eq!(outcome.unallocated, 0, "策略 {} 产能充足却未分满", strategy);
                }
            }
        }
    }

    #[test]
    fn test_zero_capacity_candidates_excluded() {
        let candidates = vec![
            candidate("S001", 0, Some(0.9)),
            candidate("S002", 50, Some(0.1)),
        ];
        let outcome = AllocationCore::water_fill(
            &candidates,
            30,
            AllocationStrategy::PerformanceBased,
            0.5,
        );
        assert_eq!(outcome.quantities, vec![0, 30]);
        assert_eq!(outcome.unallocated, 0);
    }

    #[test]
    fn test_deterministic_repeat() {
        let candidates = vec![
            candidate("S001", 37, Some(0.61)),
            candidate("S002", 91, Some(0.84)),
            candidate("S003", 55, None),
        ];
        let first =
            AllocationCore::water_fill(&candidates, 150, AllocationStrategy::Balanced, 0.5);
        for _ in 0..10 {
            let again =
                AllocationCore::water_fill(&candidates, 150, AllocationStrategy::Balanced, 0.5);
            assert_eq!(first.quantities, again.quantities);
            assert_eq!(first.unallocated, again.unallocated);
        }
    }
}
