// ==========================================
// 牲畜减员核算系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合减员/成本引擎所需的所有 Repository
// 目标: 减少引擎构造函数参数数量
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    CostRecordRepository, DailyRecordingRepository, DepletionRecordRepository,
    LivestockRepository,
};

/// 减员引擎仓储集合
///
/// # 包含的仓储
/// - `livestock_repo`: 牲畜群/批次/当前存栏
/// - `depletion_repo`: 减员记录与分录
/// - `cost_repo`: 每日成本记录
/// - `recording_repo`: 每日饲料/药品投入
#[derive(Clone)]
pub struct DepletionRepositories {
    pub livestock_repo: Arc<LivestockRepository>,
    pub depletion_repo: Arc<DepletionRecordRepository>,
    pub cost_repo: Arc<CostRecordRepository>,
    pub recording_repo: Arc<DailyRecordingRepository>,
}

impl DepletionRepositories {
    pub fn new(
        livestock_repo: Arc<LivestockRepository>,
        depletion_repo: Arc<DepletionRecordRepository>,
        cost_repo: Arc<CostRecordRepository>,
        recording_repo: Arc<DailyRecordingRepository>,
    ) -> Self {
        Self {
            livestock_repo,
            depletion_repo,
            cost_repo,
            recording_repo,
        }
    }

    /// 所有仓储共享同一连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            livestock_repo: Arc::new(LivestockRepository::from_connection(conn.clone())),
            depletion_repo: Arc::new(DepletionRecordRepository::from_connection(conn.clone())),
            cost_repo: Arc::new(CostRecordRepository::from_connection(conn.clone())),
            recording_repo: Arc::new(DailyRecordingRepository::from_connection(conn)),
        }
    }
}
