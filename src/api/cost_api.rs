// ==========================================
// 牲畜减员核算系统 - 成本 API
// ==========================================
// 职责: 每日累计成本计算、区间补算、查询
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::cost::{CostRecord, DailyActivity};
use crate::engine::cost::CostAccumulator;
use crate::engine::repositories::DepletionRepositories;

/// 单次区间补算天数上限
pub const MAX_RANGE_DAYS: i64 = 366;

/// 成本API
pub struct CostApi {
    repos: DepletionRepositories,
    accumulator: Arc<CostAccumulator>,
}

impl CostApi {
    pub fn new(repos: DepletionRepositories, accumulator: Arc<CostAccumulator>) -> Self {
        Self { repos, accumulator }
    }

    /// 计算并保存某日成本记录（已存在则覆盖,保留原ID）
    pub fn calculate_for_date(&self, livestock_id: &str, date: NaiveDate) -> ApiResult<CostRecord> {
        check_livestock_id(livestock_id)?;
        Ok(self.accumulator.calculate_for_date(livestock_id, date)?)
    }

    /// 按日期顺序补算区间（含两端）
    ///
    /// # 返回
    /// - Err(ApiError::CostDependencyMissing): 区间起点的前一日无成本记录
    pub fn calculate_range(
        &self,
        livestock_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<CostRecord>> {
        check_livestock_id(livestock_id)?;
        let days = (to - from).num_days() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(ApiError::InvalidInput(format!(
                "补算区间 {} 天超过上限 {} 天",
                days, MAX_RANGE_DAYS
            )));
        }
        Ok(self.accumulator.calculate_range(livestock_id, from, to)?)
    }

    pub fn get_cost_record(
        &self,
        livestock_id: &str,
        date: NaiveDate,
    ) -> ApiResult<Option<CostRecord>> {
        check_livestock_id(livestock_id)?;
        Ok(self.repos.cost_repo.find_by_date(livestock_id, date)?)
    }

    pub fn list_cost_records(
        &self,
        livestock_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<CostRecord>> {
        check_livestock_id(livestock_id)?;
        Ok(self.repos.cost_repo.list_range(livestock_id, from, to)?)
    }

    /// 录入每日饲料/药品投入（日常记录服务的落库入口）
    pub fn record_daily_activity(
        &self,
        livestock_id: &str,
        date: NaiveDate,
        activity: &DailyActivity,
    ) -> ApiResult<()> {
        check_livestock_id(livestock_id)?;
        if activity.feed_cost < 0.0 || activity.medicine_cost < 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "投入成本不能为负数: feed={}, medicine={}",
                activity.feed_cost, activity.medicine_cost
            )));
        }
        self.repos
            .recording_repo
            .upsert(livestock_id, date, activity)?;
        Ok(())
    }
}

fn check_livestock_id(livestock_id: &str) -> ApiResult<()> {
    if livestock_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("livestock_id 不能为空".to_string()));
    }
    Ok(())
}
