// ==========================================
// 牲畜减员核算系统 - 批量减员处理器
// ==========================================
// 红线: 逐条顺序执行,单条失败不影响其它条目
// 红线: 结果按输入下标逐条报告
// ==========================================

use crate::config::method_config_trait::MethodConfigReader;
use crate::domain::depletion::DepletionRequest;
use crate::engine::depletion::DepletionTransactionProcessor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItemStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub index: usize,
    pub livestock_id: String,
    pub status: BulkItemStatus,
    pub record_id: Option<String>,
    pub total_depleted: Option<i64>,
    pub error: Option<BulkItemError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult {
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// 成功率（0.0 - 100.0）
    pub success_rate: f64,
    pub results: Vec<BulkItemResult>,
}

impl BulkResult {
    /// 失败条目下标（供调用方只重试失败项）
    pub fn failed_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|r| r.status == BulkItemStatus::Failed)
            .map(|r| r.index)
            .collect()
    }

    fn from_results(results: Vec<BulkItemResult>) -> Self {
        let total_processed = results.len();
        let success_count = results
            .iter()
            .filter(|r| r.status == BulkItemStatus::Success)
            .count();
        let success_rate = if total_processed == 0 {
            0.0
        } else {
            success_count as f64 / total_processed as f64 * 100.0
        };
        Self {
            total_processed,
            success_count,
            error_count: total_processed - success_count,
            success_rate,
            results,
        }
    }
}

// ==========================================
// BulkProcessor
// ==========================================
pub struct BulkProcessor<C>
where
    C: MethodConfigReader,
{
    processor: Arc<DepletionTransactionProcessor<C>>,
}

impl<C> BulkProcessor<C>
where
    C: MethodConfigReader,
{
    pub fn new(processor: Arc<DepletionTransactionProcessor<C>>) -> Self {
        Self { processor }
    }

    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub fn process_bulk_depletion(&self, requests: &[DepletionRequest]) -> BulkResult {
        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            let item = match self.processor.process_depletion(request) {
                Ok(done) => BulkItemResult {
                    index,
                    livestock_id: request.livestock_id.clone(),
                    status: BulkItemStatus::Success,
                    record_id: Some(done.record_id),
                    total_depleted: Some(done.total_depleted),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(index, livestock_id = %request.livestock_id, code = e.code(), error = %e, "批量条目失败");
                    BulkItemResult {
                        index,
                        livestock_id: request.livestock_id.clone(),
                        status: BulkItemStatus::Failed,
                        record_id: None,
                        total_depleted: None,
                        error: Some(BulkItemError {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        }),
                    }
                }
            };
            results.push(item);
        }

        let bulk = BulkResult::from_results(results);
        tracing::info!(
            total = bulk.total_processed,
            success = bulk.success_count,
            failed = bulk.error_count,
            "批量减员完成"
        );
        bulk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, status: BulkItemStatus) -> BulkItemResult {
        BulkItemResult {
            index,
            livestock_id: "L001".to_string(),
            status,
            record_id: None,
            total_depleted: None,
            error: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let bulk = BulkResult::from_results(vec![
            item(0, BulkItemStatus::Success),
            item(1, BulkItemStatus::Failed),
            item(2, BulkItemStatus::Success),
            item(3, BulkItemStatus::Success),
        ]);
        assert_eq!(bulk.total_processed, 4);
        assert_eq!(bulk.success_count, 3);
        assert_eq!(bulk.error_count, 1);
        assert!((bulk.success_rate - 75.0).abs() < 1e-9);
        assert_eq!(bulk.failed_indices(), vec![1]);
    }

    #[test]
    fn test_empty_bulk() {
        let bulk = BulkResult::from_results(Vec::new());
        assert_eq!(bulk.total_processed, 0);
        assert_eq!(bulk.success_rate, 0.0);
        assert!(bulk.failed_indices().is_empty());
    }
}
