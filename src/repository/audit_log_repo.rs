// ==========================================
// 采购分发计划系统 - 审计日志数据仓储
// ==========================================
// 红线: 审计日志只追加,不提供更新/删除接口
// ==========================================

use crate::domain::audit::AuditEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// AuditLogRepository - 审计日志仓储
// ==========================================

/// 审计日志仓储
/// 职责: 管理 audit_log 表的追加与查询
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    /// 创建新的审计日志仓储实例
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

    /// 追加审计条目
    pub fn append(&self, entry: &AuditEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let before_json = entry
            .before_json
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_default());
        let after_json = entry
            .after_json
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_default());

        conn.execute(
            r#"
            INSERT INTO audit_log (
                audit_id, entity_type, entity_id, action_type, actor,
                action_ts, before_json, after_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.audit_id,
                entry.entity_type,
                entry.entity_id,
                entry.action_type,
                entry.actor,
                entry.action_ts,
                before_json,
                after_json,
                entry.detail,
            ],
        )?;
        Ok(())
    }

    /// 按实体查询审计条目（按时间升序）
    pub fn list_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT audit_id, entity_type, entity_id, action_type, actor,
                   action_ts, before_json, after_json, detail
            FROM audit_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY action_ts, audit_id
            "#,
        )?;

        let entries = stmt
            .query_map(params![entity_type, entity_id], |row| {
                let before_raw: Option<String> = row.get(6)?;
                let after_raw: Option<String> = row.get(7)?;
                Ok(AuditEntry {
                    audit_id: row.get(0)?,
                    entity_type: row.get(1)?,
                    entity_id: row.get(2)?,
                    action_type: row.get(3)?,
                    actor: row.get(4)?,
                    action_ts: row.get(5)?,
                    before_json: before_raw.and_then(|raw| serde_json::from_str(&raw).ok()),
                    after_json: after_raw.and_then(|raw| serde_json::from_str(&raw).ok()),
                    detail: row.get(8)?,
                })
            })?
            .collect::<SqliteResult<Vec<AuditEntry>>>()?;

        Ok(entries)
    }
}
