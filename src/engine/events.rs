// ==========================================
// 牲畜减员核算系统 - 引擎层事件发布
// ==========================================
// 职责: 定义减员事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，通知/报表等外部协作方实现适配器
// 红线: 事件在事务提交后发布，发布失败只记日志，不影响提交结果
// ==========================================

use crate::domain::types::{DepletionMethod, DepletionType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 减员事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepletionEventType {
    /// 减员已提交
    DepletionCommitted,
    /// 减员已冲销
    DepletionReversed,
    /// 成本记录已计算
    CostRecorded,
}

impl DepletionEventType {
    pub fn as_str(&self) -> &str {
        match self {
            DepletionEventType::DepletionCommitted => "DepletionCommitted",
            DepletionEventType::DepletionReversed => "DepletionReversed",
            DepletionEventType::CostRecorded => "CostRecorded",
        }
    }
}

/// 减员事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepletionEvent {
    pub event_type: DepletionEventType,
    pub livestock_id: String,
    /// 减员记录ID或成本记录ID
    pub record_id: String,
    pub date: NaiveDate,
    pub depletion_type: Option<DepletionType>,
    pub method: Option<DepletionMethod>,
    /// 本次变动头数（冲销时为回补头数）
    pub quantity: i64,
    /// 变动后的当前存栏
    pub current_stock: i64,
}

impl DepletionEvent {
    pub fn committed(
        livestock_id: &str,
        record_id: &str,
        date: NaiveDate,
        depletion_type: DepletionType,
        method: DepletionMethod,
        quantity: i64,
        current_stock: i64,
    ) -> Self {
        Self {
            event_type: DepletionEventType::DepletionCommitted,
            livestock_id: livestock_id.to_string(),
            record_id: record_id.to_string(),
            date,
            depletion_type: Some(depletion_type),
            method: Some(method),
            quantity,
            current_stock,
        }
    }

    pub fn reversed(
        livestock_id: &str,
        record_id: &str,
        date: NaiveDate,
        depletion_type: DepletionType,
        restored: i64,
        current_stock: i64,
    ) -> Self {
        Self {
            event_type: DepletionEventType::DepletionReversed,
            livestock_id: livestock_id.to_string(),
            record_id: record_id.to_string(),
            date,
            depletion_type: Some(depletion_type),
            method: None,
            quantity: restored,
            current_stock,
        }
    }

    pub fn cost_recorded(livestock_id: &str, record_id: &str, date: NaiveDate, stock_after: i64) -> Self {
        Self {
            event_type: DepletionEventType::CostRecorded,
            livestock_id: livestock_id.to_string(),
            record_id: record_id.to_string(),
            date,
            depletion_type: None,
            method: None,
            quantity: 0,
            current_stock: stock_after,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 减员事件发布者 Trait
///
/// # 实现说明
/// - 通知桥接（SSE/轮询）、报表缓存失效等由外部实现
pub trait DepletionEventPublisher: Send + Sync {
    /// 发布事件
    ///
    /// # 返回
    /// - `Ok(id)`: 下游分配的任务/消息 ID（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: DepletionEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl DepletionEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: DepletionEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - record_id={}, event_type={}",
            event.record_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn DepletionEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn DepletionEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn DepletionEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: DepletionEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - record_id={}, event_type={}",
                    event.record_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 提交后发布：失败只记 warn
    pub fn publish_after_commit(&self, event: DepletionEvent) {
        let record_id = event.record_id.clone();
        let event_type = event.event_type;
        if let Err(e) = self.publish(event) {
            tracing::warn!(
                record_id = %record_id,
                event_type = event_type.as_str(),
                error = %e,
                "事件发布失败（已提交的数据不受影响）"
            );
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
