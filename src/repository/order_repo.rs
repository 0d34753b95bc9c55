// ==========================================
// 采购分发计划系统 - 客户订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 订单与明细同事务写入,明细创建后只读
// ==========================================

use crate::domain::order::{CustomerOrder, CustomerOrderWithItems, OrderItem};
use crate::domain::types::{CustomerOrderStatus, ProductType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// CustomerOrderRepository - 客户订单仓储
// ==========================================

/// 客户订单仓储
/// 职责: 管理 customer_order / order_item 两表的数据访问
pub struct CustomerOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

fn map_order(row: &Row<'_>) -> SqliteResult<CustomerOrder> {
    let product_type_raw: String = row.get(2)?;
    let status_raw: String = row.get(4)?;
    Ok(CustomerOrder {
        order_id: row.get(0)?,
        customer_id: row.get(1)?,
        product_type: ProductType::from_str(&product_type_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知的产品类型: {}", product_type_raw).into(),
            )
        })?,
        requested_delivery_date: row.get(3)?,
        status: CustomerOrderStatus::from_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("未知的订单状态: {}", status_raw).into(),
            )
        })?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl CustomerOrderRepository {
    /// 创建新的订单仓储实例
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

    /// 插入订单及其明细（同一事务）
    pub fn insert_with_items(&self, order: &CustomerOrderWithItems) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO customer_order (
                order_id, customer_id, product_type, requested_delivery_date,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                order.order.order_id,
                order.order.customer_id,
                order.order.product_type.as_str(),
                order.order.requested_delivery_date,
                order.order.status.as_str(),
                order.order.created_at,
                order.order.updated_at,
            ],
        )?;

        for item in &order.items {
            tx.execute(
                r#"
                INSERT INTO order_item (item_id, order_id, product_code, quantity, unit)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    item.item_id,
                    item.order_id,
                    item.product_code,
                    item.quantity,
                    item.unit,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 按 ID 查询订单
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<CustomerOrder>> {
        let conn = self.get_conn()?;
        let order = conn
            .query_row(
                r#"
                SELECT order_id, customer_id, product_type, requested_delivery_date,
                       status, created_at, updated_at
                FROM customer_order
                WHERE order_id = ?1
                "#,
                params![order_id],
                map_order,
            )
            .optional()?;
        Ok(order)
    }

    /// 查询订单明细
    pub fn find_items(&self, order_id: &str) -> RepositoryResult<Vec<OrderItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT item_id, order_id, product_code, quantity, unit
            FROM order_item
            WHERE order_id = ?1
            ORDER BY item_id
            "#,
        )?;

        let items = stmt
            .query_map(params![order_id], |row| {
                Ok(OrderItem {
                    item_id: row.get(0)?,
                    order_id: row.get(1)?,
                    product_code: row.get(2)?,
                    quantity: row.get(3)?,
                    unit: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<OrderItem>>>()?;

        Ok(items)
    }

    /// 查询订单及其明细
    pub fn find_with_items(
        &self,
        order_id: &str,
    ) -> RepositoryResult<Option<CustomerOrderWithItems>> {
        let order = match self.find_by_id(order_id)? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = self.find_items(order_id)?;
        Ok(Some(CustomerOrderWithItems { order, items }))
    }

    /// 更新订单状态
    ///
    /// 转换合法性由引擎层状态机负责,仓储只负责落库。
    pub fn update_status(
        &self,
        order_id: &str,
        status: CustomerOrderStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE customer_order SET status = ?2, updated_at = ?3 WHERE order_id = ?1",
            params![order_id, status.as_str(), Utc::now()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "customer_order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }
}
