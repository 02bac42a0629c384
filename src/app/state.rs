// ==========================================
// 牲畜减员核算系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ConfigApi, CostApi, DepletionApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::{
    ConfigurationResolver, CostAccumulator, DailyActivitySource, DepletionRepositories,
    DepletionTransactionProcessor, LivestockLockRegistry, OptionalEventPublisher, PreviewEngine,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
/// 所有仓储与 ConfigManager 共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 减员API
    pub depletion_api: Arc<DepletionApi<ConfigManager>>,

    /// 成本API
    pub cost_api: Arc<CostApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 仓储集合（批次登记、存栏查询）
    pub repos: DepletionRepositories,

    /// 牲畜群锁（减员与成本核算共用）
    pub locks: Arc<LivestockLockRegistry>,
}

impl AppState {
    /// 创建新的AppState实例（不配置事件发布器）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_event_publisher(db_path, OptionalEventPublisher::none())
    }

    /// 创建AppState并挂载提交后事件发布器
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 初始化所有Engine
    /// 4. 创建所有API实例
    pub fn with_event_publisher(
        db_path: String,
        events: OptionalEventPublisher,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let repos = DepletionRepositories::from_connection(conn.clone());

        // ==========================================
        // 初始化Engine层
        // ==========================================

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let locks = Arc::new(LivestockLockRegistry::new());

        let processor = Arc::new(DepletionTransactionProcessor::new(
            repos.clone(),
            config_manager.clone(),
            locks.clone(),
            events.clone(),
        ));
        let preview_engine = Arc::new(PreviewEngine::new(repos.clone(), config_manager.clone()));
        let resolver = Arc::new(ConfigurationResolver::new(config_manager.clone()));

        let activity: Arc<dyn DailyActivitySource> = repos.recording_repo.clone();
        let accumulator = Arc::new(CostAccumulator::new(
            repos.clone(),
            activity,
            locks.clone(),
            events.clone(),
        ));

        // ==========================================
        // 创建API层
        // ==========================================
        let depletion_api = Arc::new(DepletionApi::new(
            repos.clone(),
            processor,
            preview_engine,
            resolver,
        ));
        let cost_api = Arc::new(CostApi::new(repos.clone(), accumulator));
        let config_api = Arc::new(ConfigApi::new(config_manager));

        tracing::info!(events = events.is_configured(), "AppState初始化完成");

        Ok(Self {
            db_path,
            depletion_api,
            cost_api,
            config_api,
            repos,
            locks,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 LIVESTOCK_DEPLETION_DB_PATH（非空时）
/// - 开发环境: 用户数据目录/livestock-depletion-dev/livestock_depletion.db
/// - 生产环境: 用户数据目录/livestock-depletion/livestock_depletion.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("LIVESTOCK_DEPLETION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./livestock_depletion.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("livestock-depletion-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("livestock-depletion");
        }

        // 目录创建失败时 Connection::open 会报出具体错误
        std::fs::create_dir_all(&path).ok();
        path = path.join("livestock_depletion.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();
        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert_eq!(state.depletion_api.get_supported_methods().len(), 3);
        assert!(state.locks.is_empty());
    }
}
