// ==========================================
// 牲畜减员核算系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 每个错误都要带可解释的原因
// ==========================================

use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// 减员/成本引擎错误类型
#[derive(Error, Debug)]
pub enum DepletionError {
    // ===== 输入校验 =====
    #[error("参数校验失败: {0}")]
    Validation(String),

    // ===== 资源不存在 =====
    #[error("牲畜群不存在: livestock_id={0}")]
    LivestockNotFound(String),

    #[error("减员记录不存在: record_id={0}")]
    RecordNotFound(String),

    #[error("批次不存在: batch_id={batch_id}")]
    BatchNotFound { batch_id: String },

    #[error("批次不属于该牲畜群: batch_id={batch_id}, livestock_id={livestock_id}")]
    BatchNotOwned {
        batch_id: String,
        livestock_id: String,
    },

    // ===== 业务规则 =====
    #[error("数量不足: batch={}, requested={requested}, available={available}, shortfall={shortfall}",
        batch_label(.batch_id, .batch_name))]
    InsufficientQuantity {
        batch_id: Option<String>,
        batch_name: Option<String>,
        requested: i64,
        available: i64,
        shortfall: i64,
    },

    #[error("减员记录已冲销: record_id={0}")]
    AlreadyReversed(String),

    #[error("缺少前一日成本记录: livestock_id={livestock_id}, missing_date={missing_date}")]
    CostDependencyMissing {
        livestock_id: String,
        missing_date: NaiveDate,
    },

    // ===== 基础设施 =====
    #[error("配置读取失败: {0}")]
    Config(String),

    #[error("仓储错误: {0}")]
    Repository(#[source] RepositoryError),
}

fn batch_label(batch_id: &Option<String>, batch_name: &Option<String>) -> String {
    match (batch_id, batch_name) {
        (Some(id), Some(name)) => format!("{}({})", name, id),
        (Some(id), None) => id.clone(),
        _ => "ALL".to_string(),
    }
}

impl DepletionError {
    /// 稳定的错误码（供批量结果与上层调用方使用）
    pub fn code(&self) -> &'static str {
        match self {
            DepletionError::Validation(_) => "VALIDATION_ERROR",
            DepletionError::LivestockNotFound(_) => "LIVESTOCK_NOT_FOUND",
            DepletionError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            DepletionError::BatchNotFound { .. } => "BATCH_NOT_FOUND",
            DepletionError::BatchNotOwned { .. } => "BATCH_NOT_OWNED",
            DepletionError::InsufficientQuantity { .. } => "INSUFFICIENT_QUANTITY",
            DepletionError::AlreadyReversed(_) => "ALREADY_REVERSED",
            DepletionError::CostDependencyMissing { .. } => "COST_DEPENDENCY_MISSING",
            DepletionError::Config(_) => "CONFIG_ERROR",
            DepletionError::Repository(_) => "REPOSITORY_ERROR",
        }
    }

    /// 整体（非单批次）数量不足
    pub fn insufficient_total(requested: i64, available: i64) -> Self {
        DepletionError::InsufficientQuantity {
            batch_id: None,
            batch_name: None,
            requested,
            available,
            shortfall: (requested - available).max(0),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
// 条件扣减失败说明读到的快照已过期,对调用方而言就是数量不足
impl From<RepositoryError> for DepletionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InsufficientBatchQuantity {
                batch_id,
                requested,
                available,
            } => DepletionError::InsufficientQuantity {
                batch_id: Some(batch_id),
                batch_name: None,
                requested,
                available,
                shortfall: (requested - available).max(0),
            },
            other => DepletionError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, DepletionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_failure_maps_to_insufficient_quantity() {
        let err: DepletionError = RepositoryError::InsufficientBatchQuantity {
            batch_id: "B001".to_string(),
            requested: 20,
            available: 5,
        }
        .into();

        match &err {
            DepletionError::InsufficientQuantity {
                batch_id, shortfall, ..
            } => {
                assert_eq!(batch_id.as_deref(), Some("B001"));
                assert_eq!(*shortfall, 15);
            }
            other => panic!("Expected InsufficientQuantity, got {:?}", other),
        }
        assert_eq!(err.code(), "INSUFFICIENT_QUANTITY");
    }

    #[test]
    fn test_insufficient_message_names_batch() {
        let err = DepletionError::InsufficientQuantity {
            batch_id: Some("B002".to_string()),
            batch_name: Some("Batch 2".to_string()),
            requested: 999_999,
            available: 15,
            shortfall: 999_984,
        };
        let msg = err.to_string();
        assert!(msg.contains("Batch 2(B002)"));
        assert!(msg.contains("999984"));
    }

    #[test]
    fn test_other_repository_errors_wrapped() {
        let err: DepletionError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(err.code(), "REPOSITORY_ERROR");
    }
}
