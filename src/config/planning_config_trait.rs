// ==========================================
// 采购分发计划系统 - 计划配置读取接口
// ==========================================
// 职责: 定义引擎层消费的配置读取 trait
// 说明: 引擎只依赖 trait,具体存储由 ConfigManager 适配
// ==========================================

use async_trait::async_trait;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置存储访问失败: {0}")]
    Storage(String),

    #[error("配置值解析失败 (key={key}): {message}")]
    Parse { key: String, message: String },
}

// ==========================================
// PlanningConfigReader - 计划配置读取接口
// ==========================================
#[async_trait]
pub trait PlanningConfigReader: Send + Sync {
    /// 供应商准入: 最低准时率阈值（默认 0.8）
    async fn get_min_on_time_rate(&self) -> Result<f64, ConfigError>;

    /// 供应商准入: 最低质量得分阈值（默认 3.0,0~5 分制）
    async fn get_min_quality_score(&self) -> Result<f64, ConfigError>;

    /// Balanced 策略的绩效权重 α（默认 0.5）
    async fn get_balanced_alpha(&self) -> Result<f64, ConfigError>;

    /// 近满产告警阈值（利用率,默认 0.9）
    async fn get_near_capacity_warning_ratio(&self) -> Result<f64, ConfigError>;

    /// 预计交付日期临近告警窗口（天,默认 2）
    async fn get_delivery_warning_window_days(&self) -> Result<i64, ConfigError>;

    /// 账本预留 CAS 重试次数上限（默认 3）
    async fn get_reserve_retry_attempts(&self) -> Result<u32, ConfigError>;
}
