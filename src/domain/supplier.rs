// ==========================================
// 采购分发计划系统 - 供应商领域模型
// ==========================================
// 红线: 产能账本只通过 reserve/release 变更,不允许直接改写
// ==========================================

use crate::domain::types::ProductType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Supplier - 供应商
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: String,
    // 短码,用于采购订单编号 PO-{code}-{date}-{seq}
    pub supplier_code: String,
    pub supplier_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// SupplierCapability - 供应商产能账本条目
// ==========================================
// 每个 (supplier_id, product_type) 一条,committed_qty 即账本余额
// revision 用于乐观锁 CAS 更新
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierCapability {
    pub supplier_id: String,
    pub product_type: ProductType,
    pub max_monthly_capacity: i64,
    pub committed_qty: i64,
    pub quality_rating: f64,
    pub is_active: bool,
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// Trait: CapacityCheck
// ==========================================
// 用途: 账本约束检查接口
pub trait CapacityCheck {
    /// 检查是否可预留指定数量
    fn can_reserve(&self, qty: i64) -> bool;

    /// 检查是否超额承诺（数据异常,预留操作不会产生此状态）
    fn is_over_committed(&self) -> bool;

    /// 计算可用产能
    fn available_capacity(&self) -> i64;

    /// 计算产能利用率
    fn utilization_ratio(&self) -> f64;
}

impl CapacityCheck for SupplierCapability {
    fn can_reserve(&self, qty: i64) -> bool {
        qty > 0 && self.committed_qty + qty <= self.max_monthly_capacity
    }

    fn is_over_committed(&self) -> bool {
        self.committed_qty > self.max_monthly_capacity
    }

    fn available_capacity(&self) -> i64 {
        (self.max_monthly_capacity - self.committed_qty).max(0)
    }

    fn utilization_ratio(&self) -> f64 {
        if self.max_monthly_capacity <= 0 {
            return 0.0;
        }
        self.committed_qty as f64 / self.max_monthly_capacity as f64
    }
}

// ==========================================
// SupplierPerformanceMetrics - 供应商绩效
// ==========================================
// on_time_rate 取值 0~1,quality_score / customer_satisfaction 取值 0~5
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierPerformanceMetrics {
    pub supplier_id: String,
    pub on_time_rate: f64,
    pub quality_score: f64,
    pub customer_satisfaction: Option<f64>,
    pub completed_count: i64,
    pub late_count: i64,
    pub cancelled_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl SupplierPerformanceMetrics {
    /// 综合绩效得分（0~1）
    ///
    /// 加权混合: 准时率 0.45 + 质量 0.45 + 客户满意度 0.10;
    /// 无满意度数据时退化为 准时率 0.5 + 质量 0.5。
    pub fn overall_performance_score(&self) -> f64 {
        let quality_norm = (self.quality_score / 5.0).clamp(0.0, 1.0);
        let on_time_norm = self.on_time_rate.clamp(0.0, 1.0);

        match self.customer_satisfaction {
            Some(satisfaction) => {
                let satisfaction_norm = (satisfaction / 5.0).clamp(0.0, 1.0);
                0.45 * on_time_norm + 0.45 * quality_norm + 0.10 * satisfaction_norm
            }
            None => 0.5 * on_time_norm + 0.5 * quality_norm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(max: i64, committed: i64) -> SupplierCapability {
        SupplierCapability {
            supplier_id: "S001".to_string(),
            product_type: ProductType::Lmr,
            max_monthly_capacity: max,
            committed_qty: committed,
            quality_rating: 4.0,
            is_active: true,
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_reserve() {
        let cap = capability(100, 80);
        assert!(cap.can_reserve(20)); // 80 + 20 = 100
        assert!(!cap.can_reserve(21)); // 80 + 21 > 100
        assert!(!cap.can_reserve(0)); // 非正数量不可预留
    }

    #[test]
    fn test_available_capacity_clamped() {
        // 超额承诺属于数据异常,可用产能按 0 上报
        let cap = capability(100, 130);
        assert!(cap.is_over_committed());
        assert_eq!(cap.available_capacity(), 0);
    }

    #[test]
    fn test_utilization_ratio() {
        let cap = capability(200, 90);
        assert!((cap.utilization_ratio() - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score_with_satisfaction() {
        let metrics = SupplierPerformanceMetrics {
            supplier_id: "S001".to_string(),
            on_time_rate: 0.9,
            quality_score: 4.0,
            customer_satisfaction: Some(5.0),
            completed_count: 10,
            late_count: 1,
            cancelled_count: 0,
            updated_at: Utc::now(),
        };
        // 0.45*0.9 + 0.45*0.8 + 0.10*1.0 = 0.865
        assert!((metrics.overall_performance_score() - 0.865).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score_without_satisfaction() {
        let metrics = SupplierPerformanceMetrics {
            supplier_id: "S001".to_string(),
            on_time_rate: 0.8,
            quality_score: 3.0,
            customer_satisfaction: None,
            completed_count: 10,
            late_count: 2,
            cancelled_count: 1,
            updated_at: Utc::now(),
        };
        // 0.5*0.8 + 0.5*0.6 = 0.7
        assert!((metrics.overall_performance_score() - 0.7).abs() < 1e-9);
    }
}
