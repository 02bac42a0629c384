// ==========================================
// 牲畜减员核算系统 - 减员 API
// ==========================================
// 职责: 减员提交/预览/批量/冲销,方法配置查询
// 红线: 请求在进入引擎前做形状校验,引擎错误保留结构化字段
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::method_config_trait::MethodConfigReader;
use crate::domain::depletion::{DepletionRecord, DepletionRequest};
use crate::domain::types::{DepletionMethod, DepletionType};
use crate::engine::bulk::{BulkProcessor, BulkResult};
use crate::engine::config_resolver::{ConfigurationResolver, ResolvedMethodConfig};
use crate::engine::depletion::{DepletionResult, DepletionTransactionProcessor, ReversalResult};
use crate::engine::preview::{ManualSelectionBatches, Preview, PreviewEngine};
use crate::engine::repositories::DepletionRepositories;

/// 单次批量请求条目上限
pub const MAX_BULK_ITEMS: usize = 500;

// ==========================================
// 支持的方法/类型（供前端下拉框）
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedMethod {
    pub value: DepletionMethod,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedType {
    pub value: DepletionType,
    pub label: String,
    /// 是否计入 deplesi（参与成本核算）
    pub is_deplesi: bool,
}

// ==========================================
// DepletionApi - 减员 API
// ==========================================

/// 减员API
///
/// 职责：
/// 1. 减员预览（自动方法 / 人工指定批次）
/// 2. 减员提交与冲销
/// 3. 批量减员（逐条隔离失败）
/// 4. 方法配置解析（只读）
pub struct DepletionApi<C>
where
    C: MethodConfigReader,
{
    repos: DepletionRepositories,
    processor: Arc<DepletionTransactionProcessor<C>>,
    preview_engine: Arc<PreviewEngine<C>>,
    bulk_processor: Arc<BulkProcessor<C>>,
    resolver: Arc<ConfigurationResolver<C>>,
}

impl<C> DepletionApi<C>
where
    C: MethodConfigReader,
{
    /// 创建新的DepletionApi实例
    ///
    /// # 参数
    /// - repos: 仓储集合（批次查询）
    /// - processor: 减员事务处理器（与批量处理器共用）
    /// - preview_engine: 预览引擎
    /// - resolver: 方法配置解析器
    pub fn new(
        repos: DepletionRepositories,
        processor: Arc<DepletionTransactionProcessor<C>>,
        preview_engine: Arc<PreviewEngine<C>>,
        resolver: Arc<ConfigurationResolver<C>>,
    ) -> Self {
        Self {
            bulk_processor: Arc::new(BulkProcessor::new(processor.clone())),
            repos,
            processor,
            preview_engine,
            resolver,
        }
    }

    // ==========================================
    // 预览接口（无锁、无写入）
    // ==========================================

    /// 预览减员
    ///
    /// # 返回
    /// - Ok(Preview): 数量不足时 can_fulfill=false,不报错
    /// - Err(ApiError): 结构性错误（方法非法、批次不存在等）
    pub fn preview_depletion(&self, request: &DepletionRequest) -> ApiResult<Preview> {
        check_request_shape(request)?;
        Ok(self.preview_engine.preview_depletion(request)?)
    }

    /// 预览人工指定批次减员
    pub fn preview_manual_batch_depletion(&self, request: &DepletionRequest) -> ApiResult<Preview> {
        check_request_shape(request)?;
        if request.manual_batches.is_empty() {
            return Err(ApiError::InvalidInput(
                "人工指定批次预览必须提供 manual_batches".to_string(),
            ));
        }
        Ok(self.preview_engine.preview_manual_batch_depletion(request)?)
    }

    /// 列出可供人工选择的批次
    ///
    /// # 参数
    /// - livestock_id: 牲畜群ID
    /// - as_of: 日龄计算基准日（None 表示今天）
    pub fn get_available_batches_for_manual_selection(
        &self,
        livestock_id: &str,
        as_of: Option<NaiveDate>,
    ) -> ApiResult<ManualSelectionBatches> {
        check_livestock_id(livestock_id)?;
        let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
        Ok(self
            .preview_engine
            .get_available_batches_for_manual_selection(livestock_id, as_of)?)
    }

    // ==========================================
    // 提交接口
    // ==========================================

    /// 提交减员
    ///
    /// # 返回
    /// - Ok(DepletionResult): 已写入的记录与分录
    /// - Err(ApiError::InsufficientQuantity): 数量不足且未接受部分扣减,无任何写入
    pub fn process_depletion(&self, request: &DepletionRequest) -> ApiResult<DepletionResult> {
        check_request_shape(request)?;
        self.processor.process_depletion(request).map_err(|e| {
            warn!(livestock_id = %request.livestock_id, code = e.code(), error = %e, "减员提交失败");
            ApiError::from(e)
        })
    }

    /// 批量提交减员
    ///
    /// 单条失败不影响其它条目,失败条目在结果中按下标报告
    pub fn process_bulk_depletion(&self, requests: &[DepletionRequest]) -> ApiResult<BulkResult> {
        if requests.is_empty() {
            return Err(ApiError::InvalidInput("批量请求不能为空".to_string()));
        }
        if requests.len() > MAX_BULK_ITEMS {
            return Err(ApiError::InvalidInput(format!(
                "批量请求条目数 {} 超过上限 {}",
                requests.len(),
                MAX_BULK_ITEMS
            )));
        }
        Ok(self.bulk_processor.process_bulk_depletion(requests))
    }

    /// 冲销减员记录
    pub fn reverse_depletion(&self, record_id: &str, reason: &str) -> ApiResult<ReversalResult> {
        if record_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("record_id 不能为空".to_string()));
        }
        Ok(self.processor.reverse_depletion(record_id, reason)?)
    }

    /// 查询减员记录
    pub fn get_depletion_record(&self, record_id: &str) -> ApiResult<DepletionRecord> {
        Ok(self.processor.get_record(record_id)?)
    }

    // ==========================================
    // 元数据与配置
    // ==========================================

    pub fn get_supported_methods(&self) -> Vec<SupportedMethod> {
        DepletionMethod::ALL
            .iter()
            .map(|m| SupportedMethod {
                value: *m,
                label: m.label().to_string(),
                description: m.description().to_string(),
            })
            .collect()
    }

    pub fn get_supported_types(&self) -> Vec<SupportedType> {
        DepletionType::ALL
            .iter()
            .map(|t| SupportedType {
                value: *t,
                label: t.label().to_string(),
                is_deplesi: t.is_deplesi(),
            })
            .collect()
    }

    /// 解析牲畜群的方法配置（已保存优先,否则按批次数推荐）
    pub fn resolve_method_config(&self, livestock_id: &str) -> ApiResult<ResolvedMethodConfig> {
        check_livestock_id(livestock_id)?;
        if self.repos.livestock_repo.find_by_id(livestock_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Livestock(id={})不存在",
                livestock_id
            )));
        }
        let active_batch_count = self.repos.livestock_repo.count_active_batches(livestock_id)?;
        let resolved = self.resolver.resolve(livestock_id, active_batch_count)?;
        debug!(livestock_id, source = resolved.source.as_str(), "方法配置解析");
        Ok(resolved)
    }
}

// ==========================================
// 参数校验
// ==========================================

fn check_livestock_id(livestock_id: &str) -> ApiResult<()> {
    if livestock_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("livestock_id 不能为空".to_string()));
    }
    Ok(())
}

/// 只校验请求形状,业务规则交给引擎
fn check_request_shape(request: &DepletionRequest) -> ApiResult<()> {
    check_livestock_id(&request.livestock_id)?;
    if request.quantity < 0 {
        return Err(ApiError::InvalidInput(format!(
            "quantity 不能为负数: {}",
            request.quantity
        )));
    }
    if request.manual_batches.iter().any(|s| s.batch_id.trim().is_empty()) {
        return Err(ApiError::InvalidInput("manual_batches 中存在空 batch_id".to_string()));
    }
    Ok(())
}
