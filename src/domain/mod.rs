// ==========================================
// 牲畜减员核算系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod cost;
pub mod depletion;
pub mod livestock;
pub mod types;

// 重导出核心类型
pub use cost::{CostBreakdown, CostRecord, DailyActivity};
pub use depletion::{DepletionAllocation, DepletionRecord, DepletionRequest, ManualBatchSelection};
pub use livestock::{CurrentStock, Livestock, LivestockBatch};
pub use types::{
    BatchStatus, DepletionMethod, DepletionType, FeedUsageMethod, ParseEnumError,
    QuantityCounter, RecordingMethod,
};
