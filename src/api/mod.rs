// ==========================================
// 牲畜减员核算系统 - API 层
// ==========================================
// 职责: 对外业务接口,参数形状校验 + 错误转换
// ==========================================

pub mod config_api;
pub mod cost_api;
pub mod depletion_api;
pub mod error;

// 重导出核心类型
pub use config_api::ConfigApi;
pub use cost_api::CostApi;
pub use depletion_api::{DepletionApi, SupportedMethod, SupportedType};
pub use error::{ApiError, ApiResult};
