// ==========================================
// 采购分发计划系统 - 状态转换日志数据仓储
// ==========================================
// 说明: 两个订单族共用一张转换日志表,entity_type 区分
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// StatusTransitionRecord - 转换日志实体
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransitionRecord {
    pub log_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub from_status: String,
    pub to_status: String,
    pub actor: String,
    pub notes: Option<String>,
    pub transition_ts: NaiveDateTime,
}

// ==========================================
// StatusTransitionLogRepository - 转换日志仓储
// ==========================================

/// 状态转换日志仓储
/// 职责: 记录每一次被接受的状态转换
pub struct StatusTransitionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StatusTransitionLogRepository {
    /// 创建新的转换日志仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加转换记录
    pub fn append(
        &self,
        entity_type: &str,
        entity_id: &str,
        from_status: &str,
        to_status: &str,
        actor: &str,
        notes: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO status_transition_log (
                log_id, entity_type, entity_id, from_status, to_status,
                actor, notes, transition_ts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                Uuid::new_v4().to_string(),
                entity_type,
                entity_id,
                from_status,
                to_status,
                actor,
                notes,
                chrono::Utc::now().naive_utc(),
            ],
        )?;
        Ok(())
    }

    /// 按实体查询转换记录（按时间升序）
    pub fn list_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<StatusTransitionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT log_id, entity_type, entity_id, from_status, to_status,
                   actor, notes, transition_ts
            FROM status_transition_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY transition_ts, log_id
            "#,
        )?;

        let records = stmt
            .query_map(params![entity_type, entity_id], |row| {
                Ok(StatusTransitionRecord {
                    log_id: row.get(0)?,
                    entity_type: row.get(1)?,
                    entity_id: row.get(2)?,
                    from_status: row.get(3)?,
                    to_status: row.get(4)?,
                    actor: row.get(5)?,
                    notes: row.get(6)?,
                    transition_ts: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<StatusTransitionRecord>>>()?;

        Ok(records)
    }
}
