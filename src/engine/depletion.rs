// ==========================================
// 牲畜减员核算系统 - 减员事务处理器
// ==========================================
// 红线: 提交在牲畜群锁内,基于最新批次快照重新分配
// 红线: 有缺口且未显式接受部分扣减 → InsufficientQuantity,不产生任何写入
// 红线: 减员记录不可修改,冲销只打标记并写补偿分录
// ==========================================
// 流程:
// 1) 结构校验（加锁之前）
// 2) 牲畜群锁
// 3) 方法解析（一次）+ 批次分配
// 4) 单事务写入: 批次/计数器/记录/分录/当前存栏
// 5) 提交后发布事件（失败只记日志）
// ==========================================

use crate::config::method_config_trait::MethodConfigReader;
use crate::db::now_timestamp;
use crate::domain::depletion::{DepletionAllocation, DepletionRecord, DepletionRequest};
use crate::domain::types::{DepletionMethod, DepletionType};
use crate::engine::config_resolver::ConfigSource;
use crate::engine::error::{DepletionError, EngineResult};
use crate::engine::events::{DepletionEvent, OptionalEventPublisher};
use crate::engine::livestock_lock::LivestockLockRegistry;
use crate::engine::planning::{validate_request, DepletionPlanner};
use crate::engine::repositories::DepletionRepositories;
use crate::repository::error::RepositoryError;
use crate::repository::StockSnapshot;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// 处理结果
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepletionResult {
    pub success: bool,
    pub record_id: String,
    pub livestock_id: String,
    pub date: NaiveDate,
    pub depletion_type: DepletionType,
    pub method: DepletionMethod,
    /// 方法来自配置解析时记录来源
    pub method_source: Option<ConfigSource>,
    pub requested_quantity: i64,
    pub total_depleted: i64,
    pub partial: bool,
    pub allocations: Vec<DepletionAllocation>,
    pub current_stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalResult {
    pub success: bool,
    pub record_id: String,
    pub livestock_id: String,
    pub restored: Vec<DepletionAllocation>,
    pub total_restored: i64,
    pub reversed_at: NaiveDateTime,
    pub current_stock: i64,
}

// ==========================================
// DepletionTransactionProcessor
// ==========================================
pub struct DepletionTransactionProcessor<C>
where
    C: MethodConfigReader,
{
    repos: DepletionRepositories,
    planner: DepletionPlanner<C>,
    locks: Arc<LivestockLockRegistry>,
    events: OptionalEventPublisher,
}

impl<C> DepletionTransactionProcessor<C>
where
    C: MethodConfigReader,
{
    pub fn new(
        repos: DepletionRepositories,
        config: Arc<C>,
        locks: Arc<LivestockLockRegistry>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            planner: DepletionPlanner::new(repos.clone(), config),
            repos,
            locks,
            events,
        }
    }

    // ==========================================
    // 提交减员
    // ==========================================

    #[instrument(skip(self, request), fields(
        livestock_id = %request.livestock_id,
        depletion_type = %request.depletion_type,
        date = %request.date,
        quantity = request.quantity
    ))]
    pub fn process_depletion(&self, request: &DepletionRequest) -> EngineResult<DepletionResult> {
        validate_request(request)?;

        let result = self
            .locks
            .with_lock(&request.livestock_id, || self.commit_locked(request))?;

        self.events.publish_after_commit(DepletionEvent::committed(
            &result.livestock_id,
            &result.record_id,
            result.date,
            result.depletion_type,
            result.method,
            result.total_depleted,
            result.current_stock,
        ));
        Ok(result)
    }

    fn commit_locked(&self, request: &DepletionRequest) -> EngineResult<DepletionResult> {
        let prepared = self.planner.prepare(request)?;
        let plan = prepared.plan;

        if !plan.fulfilled {
            if !request.allow_partial || plan.total_allocated == 0 {
                tracing::info!(
                    requested = plan.requested_quantity,
                    allocated = plan.total_allocated,
                    shortfall = plan.shortfall,
                    allow_partial = request.allow_partial,
                    "减员数量不足，拒绝提交"
                );
                return Err(plan.shortfall_error());
            }
            tracing::warn!(
                requested = plan.requested_quantity,
                allocated = plan.total_allocated,
                shortfall = plan.shortfall,
                "接受部分扣减"
            );
        }

        let record = DepletionRecord {
            id: Uuid::new_v4().to_string(),
            livestock_id: request.livestock_id.clone(),
            date: request.date,
            depletion_type: request.depletion_type,
            method: prepared.method,
            requested_quantity: plan.requested_quantity,
            total_depleted: plan.total_allocated,
            partial: !plan.fulfilled,
            allocations: plan.allocations(),
            reason: request.reason.clone(),
            actor: request.actor.clone(),
            reversed: false,
            reversed_at: None,
            reversal_reason: None,
            created_at: now_timestamp(),
        };

        let snapshot = self
            .repos
            .depletion_repo
            .commit_depletion(&record, request.depletion_type.counter())?;
        warn_on_drift(&record.livestock_id, &snapshot);

        tracing::info!(
            record_id = %record.id,
            method = %record.method,
            total_depleted = record.total_depleted,
            partial = record.partial,
            current_stock = snapshot.current_stock,
            "减员已提交"
        );

        Ok(DepletionResult {
            success: true,
            record_id: record.id,
            livestock_id: record.livestock_id,
            date: record.date,
            depletion_type: record.depletion_type,
            method: record.method,
            method_source: prepared.resolved_config.map(|c| c.source),
            requested_quantity: record.requested_quantity,
            total_depleted: record.total_depleted,
            partial: record.partial,
            allocations: record.allocations,
            current_stock: snapshot.current_stock,
        })
    }

    // ==========================================
    // 冲销减员
    // ==========================================

    #[instrument(skip(self, reason), fields(record_id = %record_id))]
    pub fn reverse_depletion(&self, record_id: &str, reason: &str) -> EngineResult<ReversalResult> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DepletionError::Validation("冲销原因不能为空".to_string()));
        }
        if record_id.trim().is_empty() {
            return Err(DepletionError::Validation("record_id 不能为空".to_string()));
        }

        let record = self
            .repos
            .depletion_repo
            .find_by_id(record_id)?
            .ok_or_else(|| DepletionError::RecordNotFound(record_id.to_string()))?;

        let result = self
            .locks
            .with_lock(&record.livestock_id, || self.reverse_locked(record_id, reason))?;

        self.events.publish_after_commit(DepletionEvent::reversed(
            &result.livestock_id,
            &result.record_id,
            record.date,
            record.depletion_type,
            result.total_restored,
            result.current_stock,
        ));
        Ok(result)
    }

    fn reverse_locked(&self, record_id: &str, reason: &str) -> EngineResult<ReversalResult> {
        // 锁内重新读取,避免并发冲销
        let record = self
            .repos
            .depletion_repo
            .find_by_id(record_id)?
            .ok_or_else(|| DepletionError::RecordNotFound(record_id.to_string()))?;
        if record.reversed {
            return Err(DepletionError::AlreadyReversed(record_id.to_string()));
        }

        let reversed_at = now_timestamp();
        let outcome = self
            .repos
            .depletion_repo
            .commit_reversal(record_id, reason, reversed_at)
            .map_err(|e| match e {
                RepositoryError::InvalidStateTransition { .. } => {
                    DepletionError::AlreadyReversed(record_id.to_string())
                }
                other => DepletionError::from(other),
            })?;
        warn_on_drift(&record.livestock_id, &outcome.snapshot);

        let total_restored = outcome.restored_total();
        if total_restored != record.total_depleted {
            tracing::warn!(
                record_id,
                total_depleted = record.total_depleted,
                total_restored,
                "回补数量受批次入栏数上限约束"
            );
        }

        tracing::info!(
            record_id,
            total_restored,
            current_stock = outcome.snapshot.current_stock,
            "减员已冲销"
        );

        Ok(ReversalResult {
            success: true,
            record_id: record.id,
            livestock_id: record.livestock_id,
            restored: outcome.restored,
            total_restored,
            reversed_at,
            current_stock: outcome.snapshot.current_stock,
        })
    }

    /// 查询减员记录（含扣减分录）
    pub fn get_record(&self, record_id: &str) -> EngineResult<DepletionRecord> {
        self.repos
            .depletion_repo
            .find_by_id(record_id)?
            .ok_or_else(|| DepletionError::RecordNotFound(record_id.to_string()))
    }
}

/// 批次余量之和与计数器口径不一致时告警（修复脚本为外部工具）
fn warn_on_drift(livestock_id: &str, snapshot: &StockSnapshot) {
    if !snapshot.is_consistent() {
        tracing::warn!(
            livestock_id,
            current_stock = snapshot.current_stock,
            counter_stock = snapshot.counter_stock,
            "当前存栏与计数器口径不一致"
        );
    }
}
