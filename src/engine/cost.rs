// ==========================================
// 牲畜减员核算系统 - 累计成本核算引擎
// ==========================================
// 红线: 当日减员按"前一日"累计单头成本估值
// 红线: 非第一天必须存在前一日成本记录,缺失即报错,不默认为 0
// 红线: 同一牲畜群的成本计算在牲畜群锁内,按日期顺序执行
// ==========================================
// 递推公式:
//   deplesi_cost  = deplesi_head_count × prior
//   total_cost    = feed + medicine + deplesi_cost
//   stock_after   = stock_before + arrived_heads - removed_today
//   cost_per_head = (prior × stock_before + arrived_value + feed + medicine) / max(stock_after, 1)
// 批次入栏口径:
//   入栏日 <= 牲畜群入栏日 的批次为期初存栏,其余批次在各自入栏日计入当日调入
// ==========================================

use crate::db::now_timestamp;
use crate::domain::cost::{CostBreakdown, CostRecord, DailyActivity};
use crate::domain::livestock::{Livestock, LivestockBatch};
use crate::engine::error::{DepletionError, EngineResult};
use crate::engine::events::{DepletionEvent, OptionalEventPublisher};
use crate::engine::livestock_lock::LivestockLockRegistry;
use crate::engine::repositories::DepletionRepositories;
use crate::repository::DailyRecordingRepository;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// DailyActivitySource - 每日投入来源
// ==========================================
// 实现者: DailyRecordingRepository（日常记录服务为外部协作方）
pub trait DailyActivitySource: Send + Sync {
    /// 当日无记录视为 0 投入
    fn daily_activity(&self, livestock_id: &str, date: NaiveDate) -> EngineResult<DailyActivity>;
}

impl DailyActivitySource for DailyRecordingRepository {
    fn daily_activity(&self, livestock_id: &str, date: NaiveDate) -> EngineResult<DailyActivity> {
        Ok(self.find(livestock_id, date)?.unwrap_or_default())
    }
}

// ==========================================
// 纯计算
// ==========================================

/// 单日成本计算输入
#[derive(Debug, Clone, PartialEq)]
pub struct CostInputs {
    pub livestock_id: String,
    pub date: NaiveDate,
    pub prior_cost_per_head: f64,
    pub prior_cost_record_id: Option<String>,
    pub activity: DailyActivity,
    pub stock_before: i64,
    /// 当日调入头数
    pub arrived_heads: i64,
    /// 当日调入批次的入栏价值
    pub arrived_value: f64,
    /// 当日全部减员（含销售/转群）
    pub removed_today: i64,
    /// 当日死亡+淘汰
    pub deplesi_head_count: i64,
}

/// 按递推公式生成成本记录
pub fn compute_cost_record(
    inputs: &CostInputs,
    id: String,
    calculated_at: NaiveDateTime,
) -> EngineResult<CostRecord> {
    let feed = inputs.activity.feed_cost;
    let medicine = inputs.activity.medicine_cost;
    for (name, value) in [("feed_cost", feed), ("medicine_cost", medicine)] {
        if !value.is_finite() || value < 0.0 {
            return Err(DepletionError::Validation(format!(
                "{}必须为非负数: livestock_id={}, date={}, value={}",
                name, inputs.livestock_id, inputs.date, value
            )));
        }
    }

    let prior = inputs.prior_cost_per_head.max(0.0);
    let stock_before = inputs.stock_before.max(0);
    let arrived_heads = inputs.arrived_heads.max(0);
    let arrived_value = if arrived_heads > 0 {
        inputs.arrived_value.max(0.0)
    } else {
        0.0
    };
    let stock_after = (stock_before + arrived_heads - inputs.removed_today).max(0);

    let deplesi_cost = inputs.deplesi_head_count as f64 * prior;
    let total_cost = feed + medicine + deplesi_cost;
    let cost_per_head =
        (prior * stock_before as f64 + arrived_value + feed + medicine) / stock_after.max(1) as f64;

    Ok(CostRecord {
        id,
        livestock_id: inputs.livestock_id.clone(),
        date: inputs.date,
        total_cost,
        cost_per_head,
        breakdown: CostBreakdown {
            feed_cost: feed,
            medicine_cost: medicine,
            deplesi_cost,
            deplesi_head_count: inputs.deplesi_head_count,
            prior_cumulative_cost_per_head: prior,
        },
        stock_before,
        stock_after,
        total_value: cost_per_head * stock_after as f64,
        prior_cost_record_id: inputs.prior_cost_record_id.clone(),
        calculated_at,
    })
}

// ==========================================
// BatchEntries - 截至某日的批次入栏汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchEntries {
    /// 当日开始时已在栏的入栏头数（未扣减员）
    pub entered_heads: i64,
    pub arrived_heads: i64,
    pub arrived_value: f64,
}

/// 按批次入栏日期汇总某日的期初入栏与当日调入
///
/// `opening_date` 为牲畜群入栏日;早于或等于该日的批次一律视为期初存栏。
pub fn batch_entries(batches: &[LivestockBatch], opening_date: NaiveDate, date: NaiveDate) -> BatchEntries {
    let mut entries = BatchEntries::default();
    for batch in batches {
        let heads = batch.initial_quantity.max(0);
        let entry_date = batch.start_date.max(opening_date);
        if entry_date < date || entry_date == opening_date {
            entries.entered_heads += heads;
        } else if entry_date == date {
            entries.arrived_heads += heads;
            entries.arrived_value += batch.price_per_head * heads as f64;
        }
    }
    entries
}

/// 入栏单价（多批次按入栏头数加权）
pub fn weighted_purchase_price(batches: &[LivestockBatch]) -> f64 {
    let heads: i64 = batches.iter().map(|b| b.initial_quantity.max(0)).sum();
    if heads == 0 {
        return 0.0;
    }
    let value: f64 = batches
        .iter()
        .map(|b| b.price_per_head * b.initial_quantity.max(0) as f64)
        .sum();
    value / heads as f64
}

// ==========================================
// CostAccumulator
// ==========================================
pub struct CostAccumulator {
    repos: DepletionRepositories,
    activity: Arc<dyn DailyActivitySource>,
    locks: Arc<LivestockLockRegistry>,
    events: OptionalEventPublisher,
}

impl CostAccumulator {
    pub fn new(
        repos: DepletionRepositories,
        activity: Arc<dyn DailyActivitySource>,
        locks: Arc<LivestockLockRegistry>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            repos,
            activity,
            locks,
            events,
        }
    }

    /// 计算并保存某日成本记录
    #[instrument(skip(self), fields(livestock_id = %livestock_id, date = %date))]
    pub fn calculate_for_date(&self, livestock_id: &str, date: NaiveDate) -> EngineResult<CostRecord> {
        let record = self
            .locks
            .with_lock(livestock_id, || self.calculate_locked(livestock_id, date))?;
        self.publish(&record);
        Ok(record)
    }

    /// 按日期顺序补算区间（含两端）,遇错即停
    #[instrument(skip(self), fields(livestock_id = %livestock_id, from = %from, to = %to))]
    pub fn calculate_range(
        &self,
        livestock_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<CostRecord>> {
        if from > to {
            return Err(DepletionError::Validation(format!(
                "日期区间非法: from={} > to={}",
                from, to
            )));
        }

        let records = self.locks.with_lock(livestock_id, || {
            let mut records = Vec::new();
            let mut date = from;
            while date <= to {
                records.push(self.calculate_locked(livestock_id, date)?);
                date += Duration::days(1);
            }
            Ok(records)
        })?;

        for record in &records {
            self.publish(record);
        }
        tracing::info!(days = records.len(), "成本区间补算完成");
        Ok(records)
    }

    fn calculate_locked(&self, livestock_id: &str, date: NaiveDate) -> EngineResult<CostRecord> {
        let livestock = self
            .repos
            .livestock_repo
            .find_by_id(livestock_id)?
            .ok_or_else(|| DepletionError::LivestockNotFound(livestock_id.to_string()))?;

        let batches = self.repos.livestock_repo.list_batches(livestock_id)?;
        let (prior_cost_per_head, prior_cost_record_id) =
            self.prior_cost(&livestock, &batches, date)?;
        let entries = batch_entries(&batches, livestock.start_date, date);
        let activity = self.activity.daily_activity(livestock_id, date)?;

        let removed_before = self
            .repos
            .depletion_repo
            .sum_removed_before(livestock_id, date)?;
        let removals = self.repos.depletion_repo.daily_removals(livestock_id, date)?;

        let inputs = CostInputs {
            livestock_id: livestock_id.to_string(),
            date,
            prior_cost_per_head,
            prior_cost_record_id,
            activity,
            stock_before: (entries.entered_heads - removed_before).max(0),
            arrived_heads: entries.arrived_heads,
            arrived_value: entries.arrived_value,
            removed_today: removals.total,
            deplesi_head_count: removals.deplesi,
        };

        // 重算时沿用原记录ID
        let id = match self.repos.cost_repo.find_by_date(livestock_id, date)? {
            Some(existing) => existing.id,
            None => Uuid::new_v4().to_string(),
        };

        let record = compute_cost_record(&inputs, id, now_timestamp())?;
        self.repos.cost_repo.upsert(&record)?;

        tracing::info!(
            record_id = %record.id,
            cost_per_head = record.cost_per_head,
            total_cost = record.total_cost,
            stock_after = record.stock_after,
            "成本记录已保存"
        );
        Ok(record)
    }

    /// 前一日累计单头成本
    ///
    /// # 返回
    /// (prior_cost_per_head, prior_cost_record_id)
    fn prior_cost(
        &self,
        livestock: &Livestock,
        batches: &[LivestockBatch],
        date: NaiveDate,
    ) -> EngineResult<(f64, Option<String>)> {
        if date < livestock.start_date {
            return Err(DepletionError::Validation(format!(
                "日期{}早于入栏日期{}",
                date, livestock.start_date
            )));
        }

        if date == livestock.start_date {
            let opening: Vec<LivestockBatch> = batches
                .iter()
                .filter(|b| b.start_date <= livestock.start_date)
                .cloned()
                .collect();
            return Ok((weighted_purchase_price(&opening), None));
        }

        let prior_date = date - Duration::days(1);
        match self.repos.cost_repo.find_by_date(&livestock.id, prior_date)? {
            Some(prior) => Ok((prior.cost_per_head, Some(prior.id))),
            None => Err(DepletionError::CostDependencyMissing {
                livestock_id: livestock.id.clone(),
                missing_date: prior_date,
            }),
        }
    }

    fn publish(&self, record: &CostRecord) {
        self.events.publish_after_commit(DepletionEvent::cost_recorded(
            &record.livestock_id,
            &record.id,
            record.date,
            record.stock_after,
        ));
    }
}
