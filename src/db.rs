// ==========================================
// 采购分发计划系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供建表入口，保证仓储层与测试环境使用同一套 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：版本号用于提示/告警（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 所有仓储依赖的表在此集中定义，测试环境与生产环境共用同一入口。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS supplier (
            supplier_id     TEXT PRIMARY KEY,
            supplier_code   TEXT NOT NULL UNIQUE,
            supplier_name   TEXT NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS supplier_capability (
            supplier_id          TEXT NOT NULL,
            product_type         TEXT NOT NULL,
            max_monthly_capacity INTEGER NOT NULL,
            committed_qty        INTEGER NOT NULL DEFAULT 0,
            quality_rating       REAL NOT NULL DEFAULT 0,
            is_active            INTEGER NOT NULL DEFAULT 1,
            revision             INTEGER NOT NULL DEFAULT 0,
            updated_at           TEXT NOT NULL,
            PRIMARY KEY (supplier_id, product_type),
            FOREIGN KEY (supplier_id) REFERENCES supplier(supplier_id)
        );

        CREATE TABLE IF NOT EXISTS supplier_performance (
            supplier_id           TEXT PRIMARY KEY,
            on_time_rate          REAL NOT NULL,
            quality_score         REAL NOT NULL,
            customer_satisfaction REAL,
            completed_count       INTEGER NOT NULL DEFAULT 0,
            late_count            INTEGER NOT NULL DEFAULT 0,
            cancelled_count       INTEGER NOT NULL DEFAULT 0,
            updated_at            TEXT NOT NULL,
            FOREIGN KEY (supplier_id) REFERENCES supplier(supplier_id)
        );

        CREATE TABLE IF NOT EXISTS customer_order (
            order_id                TEXT PRIMARY KEY,
            customer_id             TEXT NOT NULL,
            product_type            TEXT NOT NULL,
            requested_delivery_date TEXT NOT NULL,
            status                  TEXT NOT NULL,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS order_item (
            item_id       TEXT PRIMARY KEY,
            order_id      TEXT NOT NULL,
            product_code  TEXT NOT NULL,
            quantity      INTEGER NOT NULL,
            unit          TEXT NOT NULL,
            FOREIGN KEY (order_id) REFERENCES customer_order(order_id)
        );
        CREATE INDEX IF NOT EXISTS idx_order_item_order ON order_item(order_id);

        CREATE TABLE IF NOT EXISTS purchase_order (
            po_id                   TEXT PRIMARY KEY,
            po_number               TEXT NOT NULL UNIQUE,
            order_id                TEXT NOT NULL,
            supplier_id             TEXT NOT NULL,
            status                  TEXT NOT NULL,
            required_delivery_date  TEXT NOT NULL,
            estimated_delivery_date TEXT,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL,
            FOREIGN KEY (order_id) REFERENCES customer_order(order_id),
            FOREIGN KEY (supplier_id) REFERENCES supplier(supplier_id)
        );
        CREATE INDEX IF NOT EXISTS idx_po_order ON purchase_order(order_id);

        CREATE TABLE IF NOT EXISTS purchase_order_item (
            po_item_id         TEXT PRIMARY KEY,
            po_id              TEXT NOT NULL,
            order_item_id      TEXT NOT NULL,
            allocated_quantity INTEGER NOT NULL,
            packaging_spec     TEXT,
            FOREIGN KEY (po_id) REFERENCES purchase_order(po_id),
            FOREIGN KEY (order_item_id) REFERENCES order_item(item_id)
        );
        CREATE INDEX IF NOT EXISTS idx_po_item_po ON purchase_order_item(po_id);

        CREATE TABLE IF NOT EXISTS po_sequence (
            supplier_code TEXT NOT NULL,
            seq_date      TEXT NOT NULL,
            next_seq      INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (supplier_code, seq_date)
        );

        CREATE TABLE IF NOT EXISTS status_transition_log (
            log_id        TEXT PRIMARY KEY,
            entity_type   TEXT NOT NULL,
            entity_id     TEXT NOT NULL,
            from_status   TEXT NOT NULL,
            to_status     TEXT NOT NULL,
            actor         TEXT NOT NULL,
            notes         TEXT,
            transition_ts TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transition_entity
            ON status_transition_log(entity_type, entity_id);

        CREATE TABLE IF NOT EXISTS audit_log (
            audit_id    TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL,
            entity_id   TEXT NOT NULL,
            action_type TEXT NOT NULL,
            actor       TEXT NOT NULL,
            action_ts   TEXT NOT NULL,
            before_json TEXT,
            after_json  TEXT,
            detail      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, entity_id);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key      TEXT NOT NULL,
            value    TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );
        "#,
    )?;

    // 首次建库时写入 schema_version
    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
