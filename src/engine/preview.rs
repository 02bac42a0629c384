// ==========================================
// 牲畜减员核算系统 - 减员预览引擎
// ==========================================
// 红线: 只读,不加牲畜群锁,不修改任何状态
// 红线: 数量不足不抛错,返回 can_fulfill=false; 结构性错误仍然抛出
// ==========================================

use crate::config::method_config_trait::MethodConfigReader;
use crate::domain::depletion::DepletionRequest;
use crate::domain::types::{DepletionMethod, DepletionType};
use crate::engine::allocator::{AllocationPlan, PlanEntry};
use crate::engine::error::{DepletionError, EngineResult};
use crate::engine::planning::DepletionPlanner;
use crate::engine::repositories::DepletionRepositories;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 预览结果
// ==========================================

/// 单批次预览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPreview {
    pub batch_id: String,
    pub batch_name: String,
    pub age_days: i64,
    pub available_quantity: i64,
    pub requested_quantity: i64,
    pub allocated_quantity: i64,
    pub remaining_after: i64,
    pub can_fulfill: bool,
    pub shortfall: i64,
    pub will_be_depleted: bool,
    pub note: Option<String>,
}

impl From<&PlanEntry> for BatchPreview {
    fn from(entry: &PlanEntry) -> Self {
        Self {
            batch_id: entry.batch_id.clone(),
            batch_name: entry.batch_name.clone(),
            age_days: entry.age_days,
            available_quantity: entry.available_quantity,
            requested_quantity: entry.requested_quantity,
            allocated_quantity: entry.quantity,
            remaining_after: entry.remaining_after,
            can_fulfill: entry.can_fulfill(),
            shortfall: entry.shortfall,
            will_be_depleted: entry.will_be_depleted(),
            note: entry.note.clone(),
        }
    }
}

/// 减员预览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub livestock_id: String,
    pub depletion_type: DepletionType,
    pub date: NaiveDate,
    pub method: DepletionMethod,
    pub plan: AllocationPlan,
    pub can_fulfill: bool,
    pub shortfall: i64,
    pub batches_preview: Vec<BatchPreview>,
}

/// 人工选择用的批次清单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSelectionBatches {
    pub livestock_id: String,
    pub livestock_name: String,
    pub as_of: NaiveDate,
    pub total_batches: usize,
    pub total_available: i64,
    pub batches: Vec<SelectableBatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectableBatch {
    pub batch_id: String,
    pub batch_name: String,
    pub start_date: NaiveDate,
    pub age_days: i64,
    pub initial_quantity: i64,
    pub available_quantity: i64,
    pub depleted_quantity: i64,
    pub utilization_rate: f64,
    pub price_per_head: f64,
}

// ==========================================
// PreviewEngine
// ==========================================
pub struct PreviewEngine<C>
where
    C: MethodConfigReader,
{
    repos: DepletionRepositories,
    planner: DepletionPlanner<C>,
}

impl<C> PreviewEngine<C>
where
    C: MethodConfigReader,
{
    pub fn new(repos: DepletionRepositories, config: Arc<C>) -> Self {
        Self {
            planner: DepletionPlanner::new(repos.clone(), config),
            repos,
        }
    }

    /// 预览减员（方法可由配置决定）
    #[instrument(skip(self, request), fields(
        livestock_id = %request.livestock_id,
        depletion_type = %request.depletion_type,
        quantity = request.quantity
    ))]
    pub fn preview_depletion(&self, request: &DepletionRequest) -> EngineResult<Preview> {
        let prepared = self.planner.prepare(request)?;
        let preview = build_preview(request, prepared.plan);

        tracing::debug!(
            method = %preview.method,
            can_fulfill = preview.can_fulfill,
            shortfall = preview.shortfall,
            "减员预览完成"
        );
        Ok(preview)
    }

    /// 预览人工指定批次减员（强制 manual 方法）
    #[instrument(skip(self, request), fields(
        livestock_id = %request.livestock_id,
        selections = request.manual_batches.len()
    ))]
    pub fn preview_manual_batch_depletion(&self, request: &DepletionRequest) -> EngineResult<Preview> {
        let mut forced = request.clone();
        forced.method = Some(DepletionMethod::Manual);
        self.preview_depletion(&forced)
    }

    /// 列出可供人工选择的批次（从老到新,只含 as_of 当日已入栏的批次）
    pub fn get_available_batches_for_manual_selection(
        &self,
        livestock_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<ManualSelectionBatches> {
        let livestock = self
            .repos
            .livestock_repo
            .find_by_id(livestock_id)?
            .ok_or_else(|| DepletionError::LivestockNotFound(livestock_id.to_string()))?;

        let batches: Vec<SelectableBatch> = self
            .repos
            .livestock_repo
            .load_active_batches_ordered_by_age(livestock_id)?
            .into_iter()
            .filter(|b| b.has_entered(as_of))
            .map(|b| SelectableBatch {
                age_days: b.age_days(as_of),
                depleted_quantity: b.depleted_quantity(),
                utilization_rate: b.utilization_rate(),
                batch_id: b.id,
                batch_name: b.name,
                start_date: b.start_date,
                initial_quantity: b.initial_quantity,
                available_quantity: b.available_quantity,
                price_per_head: b.price_per_head,
            })
            .collect();

        Ok(ManualSelectionBatches {
            livestock_id: livestock.id,
            livestock_name: livestock.name,
            as_of,
            total_batches: batches.len(),
            total_available: batches.iter().map(|b| b.available_quantity).sum(),
            batches,
        })
    }
}

fn build_preview(request: &DepletionRequest, plan: AllocationPlan) -> Preview {
    Preview {
        livestock_id: request.livestock_id.clone(),
        depletion_type: request.depletion_type,
        date: request.date,
        method: plan.method,
        can_fulfill: plan.fulfilled,
        shortfall: plan.shortfall,
        batches_preview: plan.entries.iter().map(BatchPreview::from).collect(),
        plan,
    }
}
