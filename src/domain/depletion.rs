// ==========================================
// 牲畜减员核算系统 - 减员领域模型
// ==========================================
// 红线: DepletionRecord 一经写入不可修改,冲销只打标记并写补偿分录
// ==========================================

use crate::domain::types::{DepletionMethod, DepletionType};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ManualBatchSelection - 人工指定批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualBatchSelection {
    pub batch_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl ManualBatchSelection {
    pub fn new(batch_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            batch_id: batch_id.into(),
            quantity,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// ==========================================
// DepletionRequest - 减员请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepletionRequest {
    pub livestock_id: String,
    pub depletion_type: DepletionType,
    pub date: NaiveDate,
    /// 请求扣减总数（人工模式下可为 0,表示取各批次之和）
    #[serde(default)]
    pub quantity: i64,
    /// 未指定时由 ConfigurationResolver 决定
    #[serde(default)]
    pub method: Option<DepletionMethod>,
    #[serde(default)]
    pub manual_batches: Vec<ManualBatchSelection>,
    #[serde(default)]
    pub reason: Option<String>,
    /// 是否接受部分扣减
    #[serde(default)]
    pub allow_partial: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

impl DepletionRequest {
    /// 按数量扣减的请求（方法由配置决定）
    pub fn new(
        livestock_id: impl Into<String>,
        depletion_type: DepletionType,
        date: NaiveDate,
        quantity: i64,
    ) -> Self {
        Self {
            livestock_id: livestock_id.into(),
            depletion_type,
            date,
            quantity,
            method: None,
            manual_batches: Vec::new(),
            reason: None,
            allow_partial: false,
            actor: None,
        }
    }

    /// 人工指定批次的请求
    pub fn manual(
        livestock_id: impl Into<String>,
        depletion_type: DepletionType,
        date: NaiveDate,
        selections: Vec<ManualBatchSelection>,
    ) -> Self {
        let mut req = Self::new(livestock_id, depletion_type, date, 0);
        req.method = Some(DepletionMethod::Manual);
        req.manual_batches = selections;
        req
    }

    pub fn with_method(mut self, method: DepletionMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn allowing_partial(mut self) -> Self {
        self.allow_partial = true;
        self
    }

    /// 人工模式下各批次数量之和
    pub fn manual_total(&self) -> i64 {
        self.manual_batches.iter().map(|s| s.quantity).sum()
    }
}

// ==========================================
// DepletionAllocation - 分配分录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepletionAllocation {
    pub batch_id: String,
    pub quantity: i64,
    pub note: Option<String>,
}

// ==========================================
// DepletionRecord - 减员记录（不可变事务）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepletionRecord {
    pub id: String,
    pub livestock_id: String,
    pub date: NaiveDate,
    pub depletion_type: DepletionType,
    pub method: DepletionMethod,
    pub requested_quantity: i64,
    pub total_depleted: i64,
    pub partial: bool,                          // 已接受部分扣减
    pub allocations: Vec<DepletionAllocation>,  // 扣减分录（按分配顺序）
    pub reason: Option<String>,
    pub actor: Option<String>,
    pub reversed: bool,
    pub reversed_at: Option<NaiveDateTime>,
    pub reversal_reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl DepletionRecord {
    /// 分录合计
    pub fn allocated_total(&self) -> i64 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }
}
