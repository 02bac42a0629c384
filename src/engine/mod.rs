// ==========================================
// 牲畜减员核算系统 - 引擎层
// ==========================================
// 职责: 实现减员分配与成本核算规则,不拼 SQL
// 红线: Engine 不拼 SQL, 所有拒绝都必须输出原因
// ==========================================

pub mod allocator;
pub mod bulk;
pub mod config_resolver;
pub mod cost;
pub mod depletion;
pub mod error;
pub mod events;
pub mod livestock_lock;
pub mod planning;
pub mod preview;
pub mod repositories;

// 重导出核心引擎
pub use allocator::{AllocationPlan, AllocationRequest, BatchAllocator, PlanEntry};
pub use bulk::{BulkItemError, BulkItemResult, BulkItemStatus, BulkProcessor, BulkResult};
pub use config_resolver::{ConfigSource, ConfigurationResolver, ResolvedMethodConfig};
pub use cost::{compute_cost_record, CostAccumulator, CostInputs, DailyActivitySource};
pub use depletion::{DepletionResult, DepletionTransactionProcessor, ReversalResult};
pub use error::{DepletionError, EngineResult};
pub use events::{
    DepletionEvent, DepletionEventPublisher, DepletionEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use livestock_lock::LivestockLockRegistry;
pub use planning::{DepletionPlanner, PreparedDepletion};
pub use preview::{BatchPreview, ManualSelectionBatches, Preview, PreviewEngine, SelectableBatch};
pub use repositories::DepletionRepositories;
