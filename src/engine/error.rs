// ==========================================
// 采购分发计划系统 - 引擎层错误类型
// ==========================================
// 红线: 引擎错误必须以类型化结果返回,不允许静默吞错
// 工具: thiserror 派生宏
// ==========================================

use crate::config::ConfigError;
use crate::domain::types::ProductType;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum PlanningError {
    // ===== 输入校验错误 =====
    #[error("数据验证失败: {0}")]
    Validation(String),

    // ===== 准入错误 =====
    #[error("无合格供应商: product_type={product_type}, required_qty={required_qty}")]
    NotEligible {
        product_type: ProductType,
        required_qty: i64,
    },

    // ===== 产能错误 =====
    #[error(
        "产能不足: supplier_id={supplier_id}, requested={requested}, available={available}, shortfall={shortfall}"
    )]
    CapacityExceeded {
        supplier_id: String,
        requested: i64,
        available: i64,
        shortfall: i64,
    },

    #[error("供应商不可用: supplier_id={supplier_id}")]
    InactiveSupplier { supplier_id: String },

    // ===== 守恒律错误 =====
    #[error("分配数量不守恒: expected={expected}, actual={actual}")]
    QuantityMismatch { expected: i64, actual: i64 },

    // ===== 状态机错误 =====
    #[error("无效的状态转换: {entity} from={from} to={to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    // ===== 并发错误 (有限重试后上抛) =====
    #[error("并发冲突: {0}")]
    ConcurrencyConflict(String),

    // ===== 通用错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type PlanningResult<T> = Result<T, PlanningError>;
