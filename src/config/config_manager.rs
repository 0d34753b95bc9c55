// ==========================================
// 采购分发计划系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::planning_config_trait::{ConfigError, PlanningConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 配置键全集
pub mod config_keys {
    pub const MIN_ON_TIME_RATE: &str = "eligibility/min_on_time_rate";
    pub const MIN_QUALITY_SCORE: &str = "eligibility/min_quality_score";
    pub const BALANCED_ALPHA: &str = "allocation/balanced_alpha";
    pub const NEAR_CAPACITY_WARNING_RATIO: &str = "validation/near_capacity_warning_ratio";
    pub const DELIVERY_WARNING_WINDOW_DAYS: &str = "confirmation/delivery_warning_window_days";
    pub const RESERVE_RETRY_ATTEMPTS: &str = "ledger/reserve_retry_attempts";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn =
            open_sqlite_connection(db_path).map_err(|e| ConfigError::Storage(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&conn_guard)
                .map_err(|e| ConfigError::Storage(e.to_string()))?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ConfigError::Storage(e.to_string())),
        }
    }

    /// 写入 config_kv 表的配置值（scope_id='global',UPSERT 语义）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )
        .map_err(|e| ConfigError::Storage(e.to_string()))?;

        Ok(())
    }

    /// 读取 f64 配置,缺失时返回默认值
    fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.get_config_value(key)? {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| ConfigError::Parse {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// 读取 i64 配置,缺失时返回默认值
    fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.get_config_value(key)? {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::Parse {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// 获取所有全局配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 提交分配计划时随审计负载记录配置快照
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")
            .map_err(|e| ConfigError::Storage(e.to_string()))?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| ConfigError::Storage(e.to_string()))?;

        for row in rows {
            let (key, value) = row.map_err(|e| ConfigError::Storage(e.to_string()))?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map)).map_err(|e| ConfigError::Parse {
            key: "<snapshot>".to_string(),
            message: e.to_string(),
        })
    }
}

// ==========================================
// PlanningConfigReader 实现
// ==========================================
#[async_trait]
impl PlanningConfigReader for ConfigManager {
    async fn get_min_on_time_rate(&self) -> Result<f64, ConfigError> {
        self.get_f64_or(config_keys::MIN_ON_TIME_RATE, 0.8)
    }

    async fn get_min_quality_score(&self) -> Result<f64, ConfigError> {
        self.get_f64_or(config_keys::MIN_QUALITY_SCORE, 3.0)
    }

    async fn get_balanced_alpha(&self) -> Result<f64, ConfigError> {
        self.get_f64_or(config_keys::BALANCED_ALPHA, 0.5)
    }

    async fn get_near_capacity_warning_ratio(&self) -> Result<f64, ConfigError> {
        self.get_f64_or(config_keys::NEAR_CAPACITY_WARNING_RATIO, 0.9)
    }

    async fn get_delivery_warning_window_days(&self) -> Result<i64, ConfigError> {
        self.get_i64_or(config_keys::DELIVERY_WARNING_WINDOW_DAYS, 2)
    }

    async fn get_reserve_retry_attempts(&self) -> Result<u32, ConfigError> {
        let attempts = self.get_i64_or(config_keys::RESERVE_RETRY_ATTEMPTS, 3)?;
        if attempts < 1 {
            return Err(ConfigError::Parse {
                key: config_keys::RESERVE_RETRY_ATTEMPTS.to_string(),
                message: format!("重试次数必须 >= 1, 实际: {}", attempts),
            });
        }
        Ok(attempts as u32)
    }
}
