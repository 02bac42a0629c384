// ==========================================
// 牲畜减员核算系统 - API层错误类型
// ==========================================
// 职责: 将引擎/仓储错误转换为调用方可处理的错误
// 红线: 错误必须携带结构化字段（批次、请求数、缺口），并提供稳定错误码
// ==========================================

use crate::engine::error::DepletionError;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与资源
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("批次不属于该牲畜群: batch_id={batch_id}, livestock_id={livestock_id}")]
    BatchNotOwned {
        batch_id: String,
        livestock_id: String,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("数量不足: requested={requested}, available={available}, shortfall={shortfall}")]
    InsufficientQuantity {
        batch_id: Option<String>,
        batch_name: Option<String>,
        requested: i64,
        available: i64,
        shortfall: i64,
    },

    #[error("减员记录已冲销: {0}")]
    AlreadyReversed(String),

    #[error("缺少前一日成本记录: livestock_id={livestock_id}, missing_date={missing_date}")]
    CostDependencyMissing {
        livestock_id: String,
        missing_date: NaiveDate,
    },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 配置与数据访问
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BatchNotOwned { .. } => "BATCH_NOT_OWNED",
            ApiError::InsufficientQuantity { .. } => "INSUFFICIENT_QUANTITY",
            ApiError::AlreadyReversed(_) => "ALREADY_REVERSED",
            ApiError::CostDependencyMissing { .. } => "COST_DEPENDENCY_MISSING",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::ConfigError(_) => "CONFIG_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InsufficientBatchQuantity {
                batch_id,
                requested,
                available,
            } => ApiError::InsufficientQuantity {
                batch_id: Some(batch_id),
                batch_name: None,
                requested,
                available,
                shortfall: (requested - available).max(0),
            },
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("检查约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 DepletionError 转换
// ==========================================
impl From<DepletionError> for ApiError {
    fn from(err: DepletionError) -> Self {
        match err {
            DepletionError::Validation(msg) => ApiError::InvalidInput(msg),
            DepletionError::LivestockNotFound(id) => {
                ApiError::NotFound(format!("Livestock(id={})不存在", id))
            }
            DepletionError::RecordNotFound(id) => {
                ApiError::NotFound(format!("DepletionRecord(id={})不存在", id))
            }
            DepletionError::BatchNotFound { batch_id } => {
                ApiError::NotFound(format!("LivestockBatch(id={})不存在", batch_id))
            }
            DepletionError::BatchNotOwned {
                batch_id,
                livestock_id,
            } => ApiError::BatchNotOwned {
                batch_id,
                livestock_id,
            },
            DepletionError::InsufficientQuantity {
                batch_id,
                batch_name,
                requested,
                available,
                shortfall,
            } => ApiError::InsufficientQuantity {
                batch_id,
                batch_name,
                requested,
                available,
                shortfall,
            },
            DepletionError::AlreadyReversed(id) => ApiError::AlreadyReversed(id),
            DepletionError::CostDependencyMissing {
                livestock_id,
                missing_date,
            } => ApiError::CostDependencyMissing {
                livestock_id,
                missing_date,
            },
            DepletionError::Config(msg) => ApiError::ConfigError(msg),
            DepletionError::Repository(err) => ApiError::from(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Livestock".to_string(),
            id: "L001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match &api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Livestock"));
                assert!(msg.contains("L001"));
            }
            _ => panic!("Expected NotFound"),
        }
        assert_eq!(api_err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_engine_error_keeps_structured_fields() {
        let api_err: ApiError = DepletionError::InsufficientQuantity {
            batch_id: Some("B001".to_string()),
            batch_name: Some("Batch 1".to_string()),
            requested: 40,
            available: 10,
            shortfall: 30,
        }
        .into();

        match &api_err {
            ApiError::InsufficientQuantity {
                batch_name,
                shortfall,
                ..
            } => {
                assert_eq!(batch_name.as_deref(), Some("Batch 1"));
                assert_eq!(*shortfall, 30);
            }
            _ => panic!("Expected InsufficientQuantity"),
        }
        assert_eq!(api_err.code(), "INSUFFICIENT_QUANTITY");
    }

    #[test]
    fn test_wrapped_repository_error_unwrapped() {
        let api_err: ApiError =
            DepletionError::Repository(RepositoryError::LockError("poisoned".to_string())).into();
        assert_eq!(api_err.code(), "DATABASE_CONNECTION_ERROR");

        let api_err: ApiError = DepletionError::AlreadyReversed("R001".to_string()).into();
        assert_eq!(api_err.code(), "ALREADY_REVERSED");
    }
}
