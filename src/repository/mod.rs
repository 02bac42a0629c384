// ==========================================
// 牲畜减员核算系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 所有仓储共享同一 Arc<Mutex<Connection>>,跨表事务在单个方法内完成
// ==========================================

pub mod cost_repo;
pub mod depletion_repo;
pub mod error;
pub mod livestock_repo;
pub mod recording_repo;

// 重导出核心仓储
pub use cost_repo::CostRecordRepository;
pub use depletion_repo::{DailyRemovals, DepletionRecordRepository, ReversalOutcome, StockSnapshot};
pub use error::{RepositoryError, RepositoryResult};
pub use livestock_repo::LivestockRepository;
pub use recording_repo::DailyRecordingRepository;
