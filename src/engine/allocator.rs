// ==========================================
// 牲畜减员核算系统 - 批次分配引擎
// ==========================================
// 红线: 纯函数,不读写存储,预览与提交共用同一份算法
// 红线: 人工指定批次不足时只报告缺口,不向其它批次溢出
// ==========================================
// 输入: 分配请求 + 批次快照
// 输出: AllocationPlan（逐批次分配 + 缺口）
// ==========================================

use crate::domain::depletion::{DepletionAllocation, ManualBatchSelection};
use crate::domain::livestock::LivestockBatch;
use crate::domain::types::{BatchStatus, DepletionMethod};
use crate::engine::error::{DepletionError, EngineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::instrument;

// ==========================================
// AllocationRequest - 分配请求
// ==========================================
#[derive(Debug, Clone)]
pub struct AllocationRequest<'a> {
    pub livestock_id: &'a str,
    /// 日龄计算基准日（减员日期）
    pub as_of: NaiveDate,
    pub method: DepletionMethod,
    /// FIFO/LIFO: 请求总数; MANUAL: 声明总数（0 表示取各批次之和）
    pub quantity: i64,
    pub manual: &'a [ManualBatchSelection],
}

// ==========================================
// PlanEntry - 单批次分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub batch_id: String,
    pub batch_name: String,
    pub age_days: i64,
    pub available_quantity: i64,
    pub requested_quantity: i64,
    pub quantity: i64,        // 实际分配
    pub remaining_after: i64, // 分配后余量
    pub shortfall: i64,       // 本批次缺口（仅人工模式可能 > 0）
    pub note: Option<String>,
}

impl PlanEntry {
    pub fn can_fulfill(&self) -> bool {
        self.shortfall == 0
    }

    pub fn will_be_depleted(&self) -> bool {
        self.quantity > 0 && self.remaining_after == 0
    }
}

// ==========================================
// AllocationPlan - 分配方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub livestock_id: String,
    pub method: DepletionMethod,
    pub requested_quantity: i64,
    pub entries: Vec<PlanEntry>,
    pub total_allocated: i64,
    pub fulfilled: bool,
    pub shortfall: i64,
}

impl AllocationPlan {
    /// 可落库的扣减分录（跳过 0 数量条目）
    pub fn allocations(&self) -> Vec<DepletionAllocation> {
        self.entries
            .iter()
            .filter(|e| e.quantity > 0)
            .map(|e| DepletionAllocation {
                batch_id: e.batch_id.clone(),
                quantity: e.quantity,
                note: e.note.clone(),
            })
            .collect()
    }

    /// 第一个存在缺口的批次（人工模式）
    pub fn first_short_entry(&self) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.shortfall > 0)
    }

    /// 缺口转为结构化错误
    pub fn shortfall_error(&self) -> DepletionError {
        match self.first_short_entry() {
            Some(entry) => DepletionError::InsufficientQuantity {
                batch_id: Some(entry.batch_id.clone()),
                batch_name: Some(entry.batch_name.clone()),
                requested: entry.requested_quantity,
                available: entry.available_quantity,
                shortfall: entry.shortfall,
            },
            None => DepletionError::insufficient_total(self.requested_quantity, self.total_allocated),
        }
    }
}

// ==========================================
// BatchAllocator - 批次分配引擎
// ==========================================
pub struct BatchAllocator {
    // 无状态引擎，不需要注入依赖
}

impl BatchAllocator {
    pub fn new() -> Self {
        Self {}
    }

    /// 生成分配方案
    ///
    /// # 参数
    /// - `request`: 分配请求
    /// - `batches`: FIFO/LIFO 传入牲畜群批次快照; MANUAL 传入按选择ID查到的批次
    ///
    /// # 返回
    /// - Ok(plan): 可能 fulfilled=false（数量不足不视为错误）
    /// - Err: 结构性错误（参数非法、批次不存在、批次不属于该牲畜群）
    #[instrument(skip(self, request, batches), fields(
        livestock_id = %request.livestock_id,
        method = %request.method,
        quantity = request.quantity,
        batch_count = batches.len()
    ))]
    pub fn plan(
        &self,
        request: &AllocationRequest<'_>,
        batches: &[LivestockBatch],
    ) -> EngineResult<AllocationPlan> {
        let plan = match request.method {
            DepletionMethod::Fifo | DepletionMethod::Lifo => self.plan_ordered(request, batches)?,
            DepletionMethod::Manual => self.plan_manual(request, batches)?,
        };

        tracing::debug!(
            total_allocated = plan.total_allocated,
            shortfall = plan.shortfall,
            entries = plan.entries.len(),
            "分配方案生成"
        );
        Ok(plan)
    }

    /// 按日龄顺序分配（FIFO 从老到新, LIFO 从新到老）
    fn plan_ordered(
        &self,
        request: &AllocationRequest<'_>,
        batches: &[LivestockBatch],
    ) -> EngineResult<AllocationPlan> {
        if request.quantity <= 0 {
            return Err(DepletionError::Validation(format!(
                "减员数量必须大于 0: {}",
                request.quantity
            )));
        }
        if !request.manual.is_empty() {
            return Err(DepletionError::Validation(format!(
                "{} 方法不接受人工批次列表",
                request.method
            )));
        }

        let as_of = request.as_of;
        let mut eligible: Vec<&LivestockBatch> = batches
            .iter()
            .filter(|b| b.livestock_id == request.livestock_id && b.is_eligible(as_of))
            .collect();
        let lifo = request.method == DepletionMethod::Lifo;
        eligible.sort_by(|a, b| compare_by_age(a, b, as_of, lifo));

        let mut remaining = request.quantity;
        let mut entries = Vec::new();
        for batch in eligible {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.available_quantity);
            remaining -= take;
            entries.push(PlanEntry {
                batch_id: batch.id.clone(),
                batch_name: batch.name.clone(),
                age_days: batch.age_days(as_of),
                available_quantity: batch.available_quantity,
                requested_quantity: take,
                quantity: take,
                remaining_after: batch.available_quantity - take,
                shortfall: 0,
                note: None,
            });
        }

        Ok(AllocationPlan {
            livestock_id: request.livestock_id.to_string(),
            method: request.method,
            requested_quantity: request.quantity,
            total_allocated: request.quantity - remaining,
            fulfilled: remaining == 0,
            shortfall: remaining,
            entries,
        })
    }

    /// 人工指定批次分配
    fn plan_manual(
        &self,
        request: &AllocationRequest<'_>,
        batches: &[LivestockBatch],
    ) -> EngineResult<AllocationPlan> {
        validate_manual_selections(request.manual, request.quantity)?;

        let mut entries = Vec::with_capacity(request.manual.len());
        for selection in request.manual {
            let batch = batches
                .iter()
                .find(|b| b.id == selection.batch_id)
                .ok_or_else(|| DepletionError::BatchNotFound {
                    batch_id: selection.batch_id.clone(),
                })?;
            if batch.livestock_id != request.livestock_id {
                return Err(DepletionError::BatchNotOwned {
                    batch_id: batch.id.clone(),
                    livestock_id: request.livestock_id.to_string(),
                });
            }

            // 已扣完或减员日尚未入栏的批次按 0 可用处理
            let available = match batch.status {
                BatchStatus::Active if batch.has_entered(request.as_of) => {
                    batch.available_quantity.max(0)
                }
                _ => 0,
            };
            let take = selection.quantity.min(available);
            entries.push(PlanEntry {
                batch_id: batch.id.clone(),
                batch_name: batch.name.clone(),
                age_days: batch.age_days(request.as_of),
                available_quantity: available,
                requested_quantity: selection.quantity,
                quantity: take,
                remaining_after: available - take,
                shortfall: selection.quantity - take,
                note: selection.note.clone(),
            });
        }

        let requested: i64 = entries.iter().map(|e| e.requested_quantity).sum();
        let total_allocated: i64 = entries.iter().map(|e| e.quantity).sum();
        let shortfall: i64 = entries.iter().map(|e| e.shortfall).sum();

        Ok(AllocationPlan {
            livestock_id: request.livestock_id.to_string(),
            method: DepletionMethod::Manual,
            requested_quantity: requested,
            total_allocated,
            fulfilled: shortfall == 0,
            shortfall,
            entries,
        })
    }
}

impl Default for BatchAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// 日龄排序: FIFO 日龄大者在前, LIFO 日龄小者在前; 同日龄按批次ID升序
fn compare_by_age(a: &LivestockBatch, b: &LivestockBatch, as_of: NaiveDate, lifo: bool) -> Ordering {
    let by_age = if lifo {
        a.age_days(as_of).cmp(&b.age_days(as_of))
    } else {
        b.age_days(as_of).cmp(&a.age_days(as_of))
    };
    by_age.then_with(|| a.id.cmp(&b.id))
}

/// 人工选择结构校验（在任何查询之前执行）
pub fn validate_manual_selections(
    selections: &[ManualBatchSelection],
    declared_total: i64,
) -> EngineResult<()> {
    if selections.is_empty() {
        return Err(DepletionError::Validation(
            "人工模式必须至少指定一个批次".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(selections.len());
    for selection in selections {
        if selection.batch_id.trim().is_empty() {
            return Err(DepletionError::Validation("批次ID不能为空".to_string()));
        }
        if selection.quantity <= 0 {
            return Err(DepletionError::Validation(format!(
                "批次{}的减员数量必须大于 0: {}",
                selection.batch_id, selection.quantity
            )));
        }
        if !seen.insert(selection.batch_id.as_str()) {
            return Err(DepletionError::Validation(format!(
                "批次{}重复出现",
                selection.batch_id
            )));
        }
    }

    let sum: i64 = selections.iter().map(|s| s.quantity).sum();
    if declared_total > 0 && declared_total != sum {
        return Err(DepletionError::Validation(format!(
            "声明总数{}与各批次之和{}不一致",
            declared_total, sum
        )));
    }
    Ok(())
}
