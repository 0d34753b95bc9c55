// ==========================================
// 采购分发计划系统 - 产能账本引擎
// ==========================================
// 红线: 账本变更只允许经 reserve/release,预留必须先检查产能
// 并发: 按 (supplier_id, product_type) 键乐观锁 CAS,有限重试
// ==========================================

use crate::domain::supplier::{CapacityCheck, SupplierCapability};
use crate::domain::types::ProductType;
use crate::engine::error::{PlanningError, PlanningResult};
use crate::repository::SupplierRepository;
use std::sync::Arc;
use tracing::{instrument, warn};

/// 账本预留 CAS 默认重试次数
pub const DEFAULT_RESERVE_RETRY_ATTEMPTS: u32 = 3;

// ==========================================
// CapacityLedgerOps - 账本操作契约
// ==========================================
// 引擎只依赖此契约;具体实现由持久化适配提供
pub trait CapacityLedgerOps: Send + Sync {
    /// 查询可用产能
    fn available(&self, supplier_id: &str, product_type: ProductType) -> PlanningResult<i64>;

    /// 预留产能（check-and-act 原子）
    fn reserve(
        &self,
        supplier_id: &str,
        product_type: ProductType,
        qty: i64,
        attempts: u32,
    ) -> PlanningResult<()>;

    /// 释放产能（幂等安全）
    fn release(
        &self,
        supplier_id: &str,
        product_type: ProductType,
        qty: i64,
        attempts: u32,
    ) -> PlanningResult<()>;
}

// ==========================================
// CapacityLedger - 产能账本
// ==========================================
// 对引擎暴露原子化的 reserve/release,屏蔽乐观锁细节
pub struct CapacityLedger {
    supplier_repo: Arc<SupplierRepository>,
}

impl CapacityLedger {
    /// 创建新的产能账本实例
    pub fn new(supplier_repo: Arc<SupplierRepository>) -> Self {
        Self { supplier_repo }
    }

    /// 读取账本条目,缺失时返回 NotFound
    fn load_capability(
        &self,
        supplier_id: &str,
        product_type: ProductType,
    ) -> PlanningResult<SupplierCapability> {
        self.supplier_repo
            .find_capability(supplier_id, product_type)?
            .ok_or_else(|| PlanningError::NotFound {
                entity: "supplier_capability".to_string(),
                id: format!("{}/{}", supplier_id, product_type),
            })
    }
}

impl CapacityLedgerOps for CapacityLedger {
    /// 查询可用产能
    fn available(&self, supplier_id: &str, product_type: ProductType) -> PlanningResult<i64> {
        Ok(self.load_capability(supplier_id, product_type)?.available_capacity())
    }

    /// 预留产能（check-and-act 原子,CAS 失败时有限重试）
    ///
    /// # 参数
    /// - `qty`: 预留数量,必须为正
    /// - `attempts`: CAS 重试次数上限
    ///
    /// # 错误
    /// - `CapacityExceeded`: 可用产能不足（预留从不把 committed 推过 max）
    /// - `InactiveSupplier`: 账本条目已停用
    /// - `ConcurrencyConflict`: 重试耗尽仍未完成 CAS
    #[instrument(skip(self), fields(supplier_id = %supplier_id, product_type = %product_type, qty = qty))]
    fn reserve(
        &self,
        supplier_id: &str,
        product_type: ProductType,
        qty: i64,
        attempts: u32,
    ) -> PlanningResult<()> {
        if qty <= 0 {
            return Err(PlanningError::Validation(format!(
                "预留数量必须为正: {}",
                qty
            )));
        }

        for _ in 0..attempts.max(1) {
            let capability = self.load_capability(supplier_id, product_type)?;

            if !capability.is_active {
                return Err(PlanningError::InactiveSupplier {
                    supplier_id: supplier_id.to_string(),
                });
            }

            if !capability.can_reserve(qty) {
                let available = capability.available_capacity();
                return Err(PlanningError::CapacityExceeded {
                    supplier_id: supplier_id.to_string(),
                    requested: qty,
                    available,
                    shortfall: qty - available,
                });
            }

            let updated = self.supplier_repo.cas_update_committed(
                supplier_id,
                product_type,
                capability.committed_qty + qty,
                capability.revision,
            )?;
            if updated {
                return Ok(());
            }
            // revision 已变,重读后重试
        }

        Err(PlanningError::ConcurrencyConflict(format!(
            "账本预留重试耗尽: supplier_id={}, product_type={}, qty={}",
            supplier_id, product_type, qty
        )))
    }

    /// 释放产能（幂等安全: 超量释放钳制到 0 并上报异常,不会下溢）
    #[instrument(skip(self), fields(supplier_id = %supplier_id, product_type = %product_type, qty = qty))]
    fn release(
        &self,
        supplier_id: &str,
        product_type: ProductType,
        qty: i64,
        attempts: u32,
    ) -> PlanningResult<()> {
        if qty <= 0 {
            return Err(PlanningError::Validation(format!(
                "释放数量必须为正: {}",
                qty
            )));
        }

        for _ in 0..attempts.max(1) {
            let capability = self.load_capability(supplier_id, product_type)?;

            if qty > capability.committed_qty {
                warn!(
                    supplier_id = %supplier_id,
                    product_type = %product_type,
                    committed = capability.committed_qty,
                    release_qty = qty,
                    "账本释放量超过当前承诺量,按钳制处理"
                );
            }
            let new_committed = (capability.committed_qty - qty).max(0);

            let updated = self.supplier_repo.cas_update_committed(
                supplier_id,
                product_type,
                new_committed,
                capability.revision,
            )?;
            if updated {
                return Ok(());
            }
        }

        Err(PlanningError::ConcurrencyConflict(format!(
            "账本释放重试耗尽: supplier_id={}, product_type={}, qty={}",
            supplier_id, product_type, qty
        )))
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::supplier::Supplier;
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup_ledger(max: i64, committed: i64) -> (CapacityLedger, Arc<SupplierRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        let repo = Arc::new(SupplierRepository::from_connection(Arc::new(Mutex::new(conn))));

        let now = Utc::now();
        repo.upsert_supplier(&Supplier {
            supplier_id: "S001".to_string(),
            supplier_code: "ALP".to_string(),
            supplier_name: "Alpha".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
        repo.upsert_capability(&SupplierCapability {
            supplier_id: "S001".to_string(),
            product_type: ProductType::Lmr,
            max_monthly_capacity: max,
            committed_qty: committed,
            quality_rating: 4.0,
            is_active: true,
            revision: 0,
            updated_at: now,
        })
        .unwrap();

        (CapacityLedger::new(repo.clone()), repo)
    }

    #[test]
    fn test_reserve_within_capacity() {
        let (ledger, repo) = setup_ledger(100, 0);

        ledger
            .reserve("S001", ProductType::Lmr, 60, DEFAULT_RESERVE_RETRY_ATTEMPTS)
            .unwrap();

        let capability = repo.find_capability("S001", ProductType::Lmr).unwrap().unwrap();
        assert_eq!(capability.committed_qty, 60);
        assert_eq!(ledger.available("S001", ProductType::Lmr).unwrap(), 40);
    }

    #[test]
    fn test_reserve_over_capacity_is_rejected() {
        let (ledger, repo) = setup_ledger(100, 80);

        let err = ledger
            .reserve("S001", ProductType::Lmr, 30, DEFAULT_RESERVE_RETRY_ATTEMPTS)
            .unwrap_err();
        match err {
            PlanningError::CapacityExceeded {
                requested,
                available,
                shortfall,
                ..
            } => {
                assert_eq!(requested, 30);
                assert_eq!(available, 20);
                assert_eq!(shortfall, 10);
            }
            other => panic!("预期 CapacityExceeded, 实际: {:?}", other),
        }

        // 失败的预留不得改变账本
        let capability = repo.find_capability("S001", ProductType::Lmr).unwrap().unwrap();
        assert_eq!(capability.committed_qty, 80);
    }

    #[test]
    fn test_release_and_clamp() {
        let (ledger, repo) = setup_ledger(100, 50);

        ledger
            .release("S001", ProductType::Lmr, 20, DEFAULT_RESERVE_RETRY_ATTEMPTS)
            .unwrap();
        assert_eq!(
            repo.find_capability("S001", ProductType::Lmr).unwrap().unwrap().committed_qty,
            30
        );

        // 超量释放钳制到 0,不下溢
        ledger
            .release("S001", ProductType::Lmr, 999, DEFAULT_RESERVE_RETRY_ATTEMPTS)
            .unwrap();
        assert_eq!(
            repo.find_capability("S001", ProductType::Lmr).unwrap().unwrap().committed_qty,
            0
        );
    }

    #[test]
    fn test_reserve_inactive_capability() {
        let (ledger, repo) = setup_ledger(100, 0);
        let mut capability = repo.find_capability("S001", ProductType::Lmr).unwrap().unwrap();
        capability.is_active = false;
        repo.upsert_capability(&capability).unwrap();

        let err = ledger
            .reserve("S001", ProductType::Lmr, 10, DEFAULT_RESERVE_RETRY_ATTEMPTS)
            .unwrap_err();
        assert!(matches!(err, PlanningError::InactiveSupplier { .. }));
    }

    #[test]
    fn test_reserve_missing_capability() {
        let (ledger, _repo) = setup_ledger(100, 0);
        let err = ledger
            .reserve("S001", ProductType::Ffv, 10, DEFAULT_RESERVE_RETRY_ATTEMPTS)
            .unwrap_err();
        assert!(matches!(err, PlanningError::NotFound { .. }));
    }

    #[test]
    fn test_reserve_rejects_non_positive_qty() {
        let (ledger, _repo) = setup_ledger(100, 0);
        assert!(matches!(
            ledger.reserve("S001", ProductType::Lmr, 0, DEFAULT_RESERVE_RETRY_ATTEMPTS),
            Err(PlanningError::Validation(_))
        ));
    }
}
