// ==========================================
// 牲畜减员核算系统 - 成本领域模型
// ==========================================
// 红线: 当日减员按"昨日"累计单头成本估值
// 红线: 每条成本记录显式引用前一日记录 (prior_cost_record_id)
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// CostBreakdown - 成本明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub feed_cost: f64,
    pub medicine_cost: f64,
    pub deplesi_cost: f64,
    pub deplesi_head_count: i64,
    pub prior_cumulative_cost_per_head: f64,
}

// ==========================================
// CostRecord - 每日累计成本
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub id: String,
    pub livestock_id: String,
    pub date: NaiveDate,
    pub total_cost: f64,
    pub cost_per_head: f64,
    pub breakdown: CostBreakdown,
    pub stock_before: i64,
    pub stock_after: i64,
    pub total_value: f64,                     // cost_per_head × stock_after
    pub prior_cost_record_id: Option<String>, // 第一天为 None
    pub calculated_at: NaiveDateTime,
}

// ==========================================
// DailyActivity - 每日饲料/药品投入
// ==========================================
// 来源: 日常记录服务（外部协作方）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub feed_cost: f64,
    pub medicine_cost: f64,
}

impl DailyActivity {
    pub fn upkeep_cost(&self) -> f64 {
        self.feed_cost + self.medicine_cost
    }
}
