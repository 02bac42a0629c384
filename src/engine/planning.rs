// ==========================================
// 牲畜减员核算系统 - 减员方案准备（预览/提交共用）
// ==========================================
// 流程: 结构校验 → 牲畜群 → 方法解析 → 批次快照 → BatchAllocator
// 红线: 结构校验在任何查询之前完成
// ==========================================

use crate::config::method_config_trait::MethodConfigReader;
use crate::domain::depletion::DepletionRequest;
use crate::domain::livestock::{Livestock, LivestockBatch};
use crate::domain::types::DepletionMethod;
use crate::engine::allocator::{
    validate_manual_selections, AllocationPlan, AllocationRequest, BatchAllocator,
};
use crate::engine::config_resolver::{ConfigurationResolver, ResolvedMethodConfig};
use crate::engine::error::{DepletionError, EngineResult};
use crate::engine::repositories::DepletionRepositories;
use std::sync::Arc;

/// 准备好的减员方案
#[derive(Debug, Clone)]
pub struct PreparedDepletion {
    pub livestock: Livestock,
    pub method: DepletionMethod,
    /// 仅当请求未显式指定方法时存在
    pub resolved_config: Option<ResolvedMethodConfig>,
    pub plan: AllocationPlan,
}

// ==========================================
// DepletionPlanner
// ==========================================
pub struct DepletionPlanner<C>
where
    C: MethodConfigReader,
{
    repos: DepletionRepositories,
    resolver: ConfigurationResolver<C>,
    allocator: BatchAllocator,
}

impl<C> DepletionPlanner<C>
where
    C: MethodConfigReader,
{
    pub fn new(repos: DepletionRepositories, config: Arc<C>) -> Self {
        Self {
            repos,
            resolver: ConfigurationResolver::new(config),
            allocator: BatchAllocator::new(),
        }
    }

    /// 从存储读取快照并生成方案
    pub fn prepare(&self, request: &DepletionRequest) -> EngineResult<PreparedDepletion> {
        let explicit = validate_request(request)?;

        let livestock = self
            .repos
            .livestock_repo
            .find_by_id(&request.livestock_id)?
            .ok_or_else(|| DepletionError::LivestockNotFound(request.livestock_id.clone()))?;

        let (method, resolved_config) = match explicit {
            Some(method) => (method, None),
            None => {
                let config = self.resolve_config(&request.livestock_id)?;
                if config.depletion_method == DepletionMethod::Manual {
                    return Err(DepletionError::Validation(format!(
                        "牲畜群{}配置为人工指定批次，请求必须提供批次列表",
                        request.livestock_id
                    )));
                }
                (config.depletion_method, Some(config))
            }
        };

        let batches = self.load_batches(request, method)?;
        let plan = self.allocator.plan(
            &AllocationRequest {
                livestock_id: &request.livestock_id,
                as_of: request.date,
                method,
                quantity: request.quantity,
                manual: &request.manual_batches,
            },
            &batches,
        )?;

        Ok(PreparedDepletion {
            livestock,
            method,
            resolved_config,
            plan,
        })
    }

    /// 解析牲畜群方法配置（只读）
    pub fn resolve_config(&self, livestock_id: &str) -> EngineResult<ResolvedMethodConfig> {
        let active_batch_count = self.repos.livestock_repo.count_active_batches(livestock_id)?;
        self.resolver.resolve(livestock_id, active_batch_count)
    }

    fn load_batches(
        &self,
        request: &DepletionRequest,
        method: DepletionMethod,
    ) -> EngineResult<Vec<LivestockBatch>> {
        match method {
            DepletionMethod::Fifo | DepletionMethod::Lifo => Ok(self
                .repos
                .livestock_repo
                .load_active_batches_ordered_by_age(&request.livestock_id)?),
            DepletionMethod::Manual => {
                // 按ID逐个查询,不存在的批次由分配器报告 BatchNotFound
                let mut batches = Vec::with_capacity(request.manual_batches.len());
                for selection in &request.manual_batches {
                    if let Some(batch) = self.repos.livestock_repo.find_batch(&selection.batch_id)? {
                        batches.push(batch);
                    }
                }
                Ok(batches)
            }
        }
    }
}

/// 结构校验
///
/// # 返回
/// - Some(method): 请求可直接确定方法
/// - None: 需要由 ConfigurationResolver 决定
pub fn validate_request(request: &DepletionRequest) -> EngineResult<Option<DepletionMethod>> {
    if request.livestock_id.trim().is_empty() {
        return Err(DepletionError::Validation("livestock_id 不能为空".to_string()));
    }

    let has_selections = !request.manual_batches.is_empty();
    let method = match (request.method, has_selections) {
        (Some(DepletionMethod::Manual), false) => {
            return Err(DepletionError::Validation(
                "人工模式必须至少指定一个批次".to_string(),
            ))
        }
        (Some(method @ (DepletionMethod::Fifo | DepletionMethod::Lifo)), true) => {
            return Err(DepletionError::Validation(format!(
                "{} 方法不接受人工批次列表",
                method
            )))
        }
        (Some(method), _) => Some(method),
        (None, true) => Some(DepletionMethod::Manual),
        (None, false) => None,
    };

    if method == Some(DepletionMethod::Manual) {
        validate_manual_selections(&request.manual_batches, request.quantity)?;
    } else if request.quantity <= 0 {
        return Err(DepletionError::Validation(format!(
            "减员数量必须大于 0: {}",
            request.quantity
        )));
    }

    Ok(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::depletion::ManualBatchSelection;
    use crate::domain::types::DepletionType;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    #[test]
    fn test_method_inferred_from_selections() {
        let req = DepletionRequest {
            method: None,
            ..DepletionRequest::manual(
                "L001",
                DepletionType::Culling,
                date(),
                vec![ManualBatchSelection::new("B1", 2)],
            )
        };
        assert_eq!(validate_request(&req).unwrap(), Some(DepletionMethod::Manual));
    }

    #[test]
    fn test_method_left_to_resolver() {
        let req = DepletionRequest::new("L001", DepletionType::Mortality, date(), 3);
        assert_eq!(validate_request(&req).unwrap(), None);
    }

    #[test]
    fn test_structural_errors() {
        let blank = DepletionRequest::new(" ", DepletionType::Mortality, date(), 3);
        assert!(validate_request(&blank).is_err());

        let zero = DepletionRequest::new("L001", DepletionType::Sales, date(), 0);
        assert!(validate_request(&zero).is_err());

        let manual_without_list =
            DepletionRequest::new("L001", DepletionType::Sales, date(), 3).with_method(DepletionMethod::Manual);
        assert!(validate_request(&manual_without_list).is_err());

        let fifo_with_list = DepletionRequest::manual(
            "L001",
            DepletionType::Sales,
            date(),
            vec![ManualBatchSelection::new("B1", 2)],
        )
        .with_method(DepletionMethod::Fifo);
        assert!(validate_request(&fifo_with_list).is_err());
    }
}
