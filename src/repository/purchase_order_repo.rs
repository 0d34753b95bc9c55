// ==========================================
// 采购分发计划系统 - 采购订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 同一次计划提交产生的采购订单批量同事务写入
// ==========================================

use crate::domain::purchase_order::{PurchaseOrder, PurchaseOrderItem};
use crate::domain::types::PurchaseOrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// PurchaseOrderRepository - 采购订单仓储
// ==========================================

/// 采购订单仓储
/// 职责: 管理 purchase_order / purchase_order_item / po_sequence 三表的数据访问
pub struct PurchaseOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

fn map_purchase_order(row: &Row<'_>) -> SqliteResult<PurchaseOrder> {
    let status_raw: String = row.get(4)?;
    Ok(PurchaseOrder {
        po_id: row.get(0)?,
        po_number: row.get(1)?,
        order_id: row.get(2)?,
        supplier_id: row.get(3)?,
        status: PurchaseOrderStatus::from_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("未知的采购订单状态: {}", status_raw).into(),
            )
        })?,
        required_delivery_date: row.get(5)?,
        estimated_delivery_date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const PO_COLUMNS: &str = r#"po_id, po_number, order_id, supplier_id, status,
       required_delivery_date, estimated_delivery_date, created_at, updated_at"#;

impl PurchaseOrderRepository {
    /// 创建新的采购订单仓储实例
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

    /// 批量插入采购订单及明细（同一事务,全部成功或全部失败）
    pub fn insert_batch(
        &self,
        purchase_orders: &[PurchaseOrder],
        items: &[PurchaseOrderItem],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for po in purchase_orders {
            tx.execute(
                r#"
                INSERT INTO purchase_order (
                    po_id, po_number, order_id, supplier_id, status,
                    required_delivery_date, estimated_delivery_date, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    po.po_id,
                    po.po_number,
                    po.order_id,
                    po.supplier_id,
                    po.status.as_str(),
                    po.required_delivery_date,
                    po.estimated_delivery_date,
                    po.created_at,
                    po.updated_at,
                ],
            )?;
        }

        for item in items {
            tx.execute(
                r#"
                INSERT INTO purchase_order_item (
                    po_item_id, po_id, order_item_id, allocated_quantity, packaging_spec
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    item.po_item_id,
                    item.po_id,
                    item.order_item_id,
                    item.allocated_quantity,
                    item.packaging_spec,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 按 ID 查询采购订单
    pub fn find_by_id(&self, po_id: &str) -> RepositoryResult<Option<PurchaseOrder>> {
        let conn = self.get_conn()?;
        let po = conn
            .query_row(
                &format!("SELECT {} FROM purchase_order WHERE po_id = ?1", PO_COLUMNS),
                params![po_id],
                map_purchase_order,
            )
            .optional()?;
        Ok(po)
    }

    /// 查询客户订单下的全部采购订单
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<PurchaseOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchase_order WHERE order_id = ?1 ORDER BY po_number",
            PO_COLUMNS
        ))?;

        let pos = stmt
            .query_map(params![order_id], map_purchase_order)?
            .collect::<SqliteResult<Vec<PurchaseOrder>>>()?;
        Ok(pos)
    }

    /// 查询采购订单明细
    pub fn find_items(&self, po_id: &str) -> RepositoryResult<Vec<PurchaseOrderItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT po_item_id, po_id, order_item_id, allocated_quantity, packaging_spec
            FROM purchase_order_item
            WHERE po_id = ?1
            ORDER BY po_item_id
            "#,
        )?;

        let items = stmt
            .query_map(params![po_id], |row| {
                Ok(PurchaseOrderItem {
                    po_item_id: row.get(0)?,
                    po_id: row.get(1)?,
                    order_item_id: row.get(2)?,
                    allocated_quantity: row.get(3)?,
                    packaging_spec: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<PurchaseOrderItem>>>()?;
        Ok(items)
    }

    /// 更新采购订单状态
    ///
    /// 转换合法性由引擎层状态机负责,仓储只负责落库。
    pub fn update_status(
        &self,
        po_id: &str,
        status: PurchaseOrderStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE purchase_order SET status = ?2, updated_at = ?3 WHERE po_id = ?1",
            params![po_id, status.as_str(), Utc::now()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "purchase_order".to_string(),
                id: po_id.to_string(),
            });
        }
        Ok(())
    }

    /// 写入供应商确认信息（预计交付日期 + 明细包装,同一事务）
    pub fn apply_confirmation(
        &self,
        po_id: &str,
        estimated_delivery_date: NaiveDate,
        item_packaging: &[(String, String)],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let affected = tx.execute(
            r#"
            UPDATE purchase_order
            SET estimated_delivery_date = ?2, status = ?3, updated_at = ?4
            WHERE po_id = ?1
            "#,
            params![
                po_id,
                estimated_delivery_date,
                PurchaseOrderStatus::Confirmed.as_str(),
                Utc::now(),
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "purchase_order".to_string(),
                id: po_id.to_string(),
            });
        }

        for (po_item_id, packaging_spec) in item_packaging {
            tx.execute(
                "UPDATE purchase_order_item SET packaging_spec = ?2 WHERE po_item_id = ?1",
                params![po_item_id, packaging_spec],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 获取采购订单序号（按供应商短码 + 日期递增,保证唯一）
    pub fn next_sequence(
        &self,
        supplier_code: &str,
        seq_date: NaiveDate,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO po_sequence (supplier_code, seq_date, next_seq)
            VALUES (?1, ?2, 1)
            ON CONFLICT(supplier_code, seq_date) DO UPDATE SET next_seq = next_seq + 1
            "#,
            params![supplier_code, seq_date],
        )?;

        let seq: i64 = tx.query_row(
            "SELECT next_seq FROM po_sequence WHERE supplier_code = ?1 AND seq_date = ?2",
            params![supplier_code, seq_date],
            |row| row.get(0),
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(seq)
    }
}
