// ==========================================
// 牲畜减员核算系统 - 应用层
// ==========================================
// 职责: 组装仓储/引擎/API,供宿主程序与命令行工具使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
