// ==========================================
// 采购分发计划系统 - 引擎层通知发布
// ==========================================
// 职责: 定义供应商通知 trait,实现依赖倒置
// 说明: Engine 层定义 trait,传输适配由外部系统实现
// 红线: 通知失败只记日志,绝不回滚已提交的业务操作
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tracing::warn;

// ==========================================
// 通知事件类型
// ==========================================

/// 供应商通知事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierNotification {
    /// 采购订单 ID
    pub po_id: String,
    /// 目标供应商 ID
    pub supplier_id: String,
    /// 事件类型
    pub event_type: SupplierNotificationType,
}

/// 供应商通知触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierNotificationType {
    /// 新采购订单已生成
    NewPurchaseOrder,
    /// 采购订单已取消
    PurchaseOrderCancelled,
}

impl SupplierNotificationType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            SupplierNotificationType::NewPurchaseOrder => "NewPurchaseOrder",
            SupplierNotificationType::PurchaseOrderCancelled => "PurchaseOrderCancelled",
        }
    }
}

// ==========================================
// 通知发布 Trait
// ==========================================

/// 供应商通知发布者 Trait
///
/// Engine 层定义,传输层(邮件/消息队列等)实现
pub trait NotificationSink: Send + Sync {
    /// 发布供应商通知
    fn notify(&self, notification: SupplierNotification)
        -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作通知发布者
///
/// 用于不需要通知的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn notify(
        &self,
        notification: SupplierNotification,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpNotificationSink: 跳过通知 - po_id={}, event_type={}",
            notification.po_id,
            notification.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的通知发布者包装
///
/// 简化 Option<Arc<dyn NotificationSink>> 的使用;
/// 发布失败在此处记日志并吞掉,调用方无需处理
pub struct OptionalNotificationSink {
    inner: Option<Arc<dyn NotificationSink>>,
}

impl OptionalNotificationSink {
    /// 创建带发布者的实例
    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self { inner: Some(sink) }
    }

    /// 创建空实例（不发布通知）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布通知;失败只告警,不向上传播
    pub fn notify_or_log(&self, notification: SupplierNotification) {
        if let Some(sink) = &self.inner {
            if let Err(e) = sink.notify(notification.clone()) {
                warn!(
                    po_id = %notification.po_id,
                    supplier_id = %notification.supplier_id,
                    event_type = notification.event_type.as_str(),
                    error = %e,
                    "供应商通知发送失败,业务操作不回滚"
                );
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalNotificationSink {
    fn default() -> Self {
        Self::none()
    }
}
