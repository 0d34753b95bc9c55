// ==========================================
// 采购分发计划系统 - 供应商数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: committed_qty 仅允许通过 CAS 更新,承载账本乐观锁
// ==========================================

use crate::domain::supplier::{Supplier, SupplierCapability, SupplierPerformanceMetrics};
use crate::domain::types::ProductType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// SupplierRepository - 供应商仓储
// ==========================================

/// 供应商仓储
/// 职责: 管理 supplier / supplier_capability / supplier_performance 三表的数据访问
pub struct SupplierRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 行内 product_type 字段解析
fn parse_product_type(idx: usize, raw: &str) -> SqliteResult<ProductType> {
    ProductType::from_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("未知的产品类型: {}", raw).into(),
        )
    })
}

fn map_capability(row: &Row<'_>, offset: usize) -> SqliteResult<SupplierCapability> {
    let product_type_raw: String = row.get(offset + 1)?;
    Ok(SupplierCapability {
        supplier_id: row.get(offset)?,
        product_type: parse_product_type(offset + 1, &product_type_raw)?,
        max_monthly_capacity: row.get(offset + 2)?,
        committed_qty: row.get(offset + 3)?,
        quality_rating: row.get(offset + 4)?,
        is_active: row.get(offset + 5)?,
        revision: row.get(offset + 6)?,
        updated_at: row.get(offset + 7)?,
    })
}

impl SupplierRepository {
    /// 创建新的供应商仓储实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // supplier 表
    // ==========================================

    /// 插入或更新供应商
    pub fn upsert_supplier(&self, supplier: &Supplier) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO supplier (
                supplier_id, supplier_code, supplier_name, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(supplier_id) DO UPDATE SET
                supplier_code = ?2, supplier_name = ?3, is_active = ?4, updated_at = ?6
            "#,
            params![
                supplier.supplier_id,
                supplier.supplier_code,
                supplier.supplier_name,
                supplier.is_active,
                supplier.created_at,
                supplier.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查询供应商
    pub fn find_by_id(&self, supplier_id: &str) -> RepositoryResult<Option<Supplier>> {
        let conn = self.get_conn()?;
        let supplier = conn
            .query_row(
                r#"
                SELECT supplier_id, supplier_code, supplier_name, is_active, created_at, updated_at
                FROM supplier
                WHERE supplier_id = ?1
                "#,
                params![supplier_id],
                |row| {
                    Ok(Supplier {
                        supplier_id: row.get(0)?,
                        supplier_code: row.get(1)?,
                        supplier_name: row.get(2)?,
                        is_active: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(supplier)
    }

    // ==========================================
    // supplier_capability 表 (产能账本)
    // ==========================================

    /// 插入或更新产能账本条目
    pub fn upsert_capability(&self, capability: &SupplierCapability) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO supplier_capability (
                supplier_id, product_type, max_monthly_capacity, committed_qty,
                quality_rating, is_active, revision, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(supplier_id, product_type) DO UPDATE SET
                max_monthly_capacity = ?3, committed_qty = ?4,
                quality_rating = ?5, is_active = ?6, revision = ?7, updated_at = ?8
            "#,
            params![
                capability.supplier_id,
                capability.product_type.as_str(),
                capability.max_monthly_capacity,
                capability.committed_qty,
                capability.quality_rating,
                capability.is_active,
                capability.revision,
                capability.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 查询账本条目
    pub fn find_capability(
        &self,
        supplier_id: &str,
        product_type: ProductType,
    ) -> RepositoryResult<Option<SupplierCapability>> {
        let conn = self.get_conn()?;
        let capability = conn
            .query_row(
                r#"
                SELECT supplier_id, product_type, max_monthly_capacity, committed_qty,
                       quality_rating, is_active, revision, updated_at
                FROM supplier_capability
                WHERE supplier_id = ?1 AND product_type = ?2
                "#,
                params![supplier_id, product_type.as_str()],
                |row| map_capability(row, 0),
            )
            .optional()?;
        Ok(capability)
    }

    /// CAS 更新账本承诺量（乐观锁）
    ///
    /// # 返回
    /// - Ok(true): 更新成功,revision 自增
    /// - Ok(false): revision 已被他人变更,调用方应重读后重试
    pub fn cas_update_committed(
        &self,
        supplier_id: &str,
        product_type: ProductType,
        new_committed: i64,
        expected_revision: i64,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let now: DateTime<Utc> = Utc::now();
        let affected = conn.execute(
            r#"
            UPDATE supplier_capability
            SET committed_qty = ?3, revision = revision + 1, updated_at = ?4
            WHERE supplier_id = ?1 AND product_type = ?2 AND revision = ?5
            "#,
            params![
                supplier_id,
                product_type.as_str(),
                new_committed,
                now,
                expected_revision,
            ],
        )?;
        Ok(affected == 1)
    }

    // ==========================================
    // supplier_performance 表
    // ==========================================

    /// 插入或更新供应商绩效
    pub fn upsert_performance(
        &self,
        metrics: &SupplierPerformanceMetrics,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO supplier_performance (
                supplier_id, on_time_rate, quality_score, customer_satisfaction,
                completed_count, late_count, cancelled_count, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(supplier_id) DO UPDATE SET
                on_time_rate = ?2, quality_score = ?3, customer_satisfaction = ?4,
                completed_count = ?5, late_count = ?6, cancelled_count = ?7, updated_at = ?8
            "#,
            params![
                metrics.supplier_id,
                metrics.on_time_rate,
                metrics.quality_score,
                metrics.customer_satisfaction,
                metrics.completed_count,
                metrics.late_count,
                metrics.cancelled_count,
                metrics.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 查询供应商绩效
    pub fn find_performance(
        &self,
        supplier_id: &str,
    ) -> RepositoryResult<Option<SupplierPerformanceMetrics>> {
        let conn = self.get_conn()?;
        let metrics = conn
            .query_row(
                r#"
                SELECT supplier_id, on_time_rate, quality_score, customer_satisfaction,
                       completed_count, late_count, cancelled_count, updated_at
                FROM supplier_performance
                WHERE supplier_id = ?1
                "#,
                params![supplier_id],
                |row| {
                    Ok(SupplierPerformanceMetrics {
                        supplier_id: row.get(0)?,
                        on_time_rate: row.get(1)?,
                        quality_score: row.get(2)?,
                        customer_satisfaction: row.get(3)?,
                        completed_count: row.get(4)?,
                        late_count: row.get(5)?,
                        cancelled_count: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(metrics)
    }

    // ==========================================
    // 联合查询 (准入引擎用)
    // ==========================================

    /// 查询某产品类型下所有活跃供应商及其账本条目与绩效
    ///
    /// 仅返回 supplier.is_active 且 capability.is_active 的记录;
    /// 绩效缺失时返回 None（准入引擎负责"无绩效排末位"的排序语义）。
    pub fn find_active_with_capability(
        &self,
        product_type: ProductType,
    ) -> RepositoryResult<Vec<(Supplier, SupplierCapability, Option<SupplierPerformanceMetrics>)>>
    {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                s.supplier_id, s.supplier_code, s.supplier_name, s.is_active,
                s.created_at, s.updated_at,
                c.supplier_id, c.product_type, c.max_monthly_capacity, c.committed_qty,
                c.quality_rating, c.is_active, c.revision, c.updated_at,
                p.on_time_rate, p.quality_score, p.customer_satisfaction,
                p.completed_count, p.late_count, p.cancelled_count, p.updated_at
            FROM supplier s
            JOIN supplier_capability c ON c.supplier_id = s.supplier_id
            LEFT JOIN supplier_performance p ON p.supplier_id = s.supplier_id
            WHERE s.is_active = 1 AND c.is_active = 1 AND c.product_type = ?1
            ORDER BY s.supplier_id
            "#,
        )?;

        let rows = stmt
            .query_map(params![product_type.as_str()], |row| {
                let supplier = Supplier {
                    supplier_id: row.get(0)?,
                    supplier_code: row.get(1)?,
                    supplier_name: row.get(2)?,
                    is_active: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                };
                let capability = map_capability(row, 6)?;

                let on_time_rate: Option<f64> = row.get(14)?;
                let metrics = match on_time_rate {
                    Some(rate) => Some(SupplierPerformanceMetrics {
                        supplier_id: supplier.supplier_id.clone(),
                        on_time_rate: rate,
                        quality_score: row.get(15)?,
                        customer_satisfaction: row.get(16)?,
                        completed_count: row.get(17)?,
                        late_count: row.get(18)?,
                        cancelled_count: row.get(19)?,
                        updated_at: row.get(20)?,
                    }),
                    None => None,
                };

                Ok((supplier, capability, metrics))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(rows)
    }
}
