// ==========================================
// 采购分发计划系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

pub mod config_manager;
pub mod planning_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use planning_config_trait::{ConfigError, PlanningConfigReader};
