// ==========================================
// 采购分发计划系统 - 审计日志领域模型
// ==========================================
// 红线: 所有写入必须记录,日志只追加不修改
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// 审计条目关联的实体类别
pub const ENTITY_CUSTOMER_ORDER: &str = "CUSTOMER_ORDER";
pub const ENTITY_PURCHASE_ORDER: &str = "PURCHASE_ORDER";

// ==========================================
// AuditAction - 审计动作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    CreateOrder,          // 创建客户订单
    CreatePurchaseOrder,  // 生成采购订单
    StatusChange,         // 状态变更
    ConfirmPurchaseOrder, // 供应商确认
    RejectPurchaseOrder,  // 供应商拒绝
    CancelOrder,          // 取消客户订单
    CancelPurchaseOrder,  // 取消采购订单
}

impl AuditAction {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateOrder => "CreateOrder",
            AuditAction::CreatePurchaseOrder => "CreatePurchaseOrder",
            AuditAction::StatusChange => "StatusChange",
            AuditAction::ConfirmPurchaseOrder => "ConfirmPurchaseOrder",
            AuditAction::RejectPurchaseOrder => "RejectPurchaseOrder",
            AuditAction::CancelOrder => "CancelOrder",
            AuditAction::CancelPurchaseOrder => "CancelPurchaseOrder",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CreateOrder" => Some(AuditAction::CreateOrder),
            "CreatePurchaseOrder" => Some(AuditAction::CreatePurchaseOrder),
            "StatusChange" => Some(AuditAction::StatusChange),
            "ConfirmPurchaseOrder" => Some(AuditAction::ConfirmPurchaseOrder),
            "RejectPurchaseOrder" => Some(AuditAction::RejectPurchaseOrder),
            "CancelOrder" => Some(AuditAction::CancelOrder),
            "CancelPurchaseOrder" => Some(AuditAction::CancelPurchaseOrder),
            _ => None,
        }
    }
}

// ==========================================
// AuditEntry - 审计条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action_type: String,
    pub actor: String,
    pub action_ts: NaiveDateTime,

    // ===== 变更快照 =====
    pub before_json: Option<JsonValue>,
    pub after_json: Option<JsonValue>,

    // ===== 补充说明 =====
    pub detail: Option<String>,
}

impl AuditEntry {
    /// 创建新的审计条目
    pub fn new(entity_type: &str, entity_id: String, action: AuditAction, actor: String) -> Self {
        Self {
            audit_id: Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            action_type: action.as_str().to_string(),
            actor,
            action_ts: chrono::Utc::now().naive_utc(),
            before_json: None,
            after_json: None,
            detail: None,
        }
    }

    /// 设置变更前快照 (转换为JSON)
    pub fn with_before<T: Serialize>(mut self, before: &T) -> Self {
        self.before_json = serde_json::to_value(before).ok();
        self
    }

    /// 设置变更后快照 (转换为JSON)
    pub fn with_after<T: Serialize>(mut self, after: &T) -> Self {
        self.after_json = serde_json::to_value(after).ok();
        self
    }

    /// 设置补充说明
    pub fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry_builder() {
        let entry = AuditEntry::new(
            ENTITY_PURCHASE_ORDER,
            "PO-1".to_string(),
            AuditAction::RejectPurchaseOrder,
            "supplier_portal".to_string(),
        )
        .with_detail("capacity conflict".to_string());

        assert_eq!(entry.entity_type, ENTITY_PURCHASE_ORDER);
        assert_eq!(entry.action_type, "RejectPurchaseOrder");
        assert_eq!(entry.detail.as_deref(), Some("capacity conflict"));
        assert!(entry.before_json.is_none());
    }

    #[test]
    fn test_audit_action_roundtrip() {
        for action in [
            AuditAction::CreateOrder,
            AuditAction::CreatePurchaseOrder,
            AuditAction::StatusChange,
            AuditAction::ConfirmPurchaseOrder,
            AuditAction::RejectPurchaseOrder,
            AuditAction::CancelOrder,
            AuditAction::CancelPurchaseOrder,
        ] {
            assert_eq!(AuditAction::from_str(action.as_str()), Some(action));
        }
    }
}
