// ==========================================
// 牲畜减员核算系统 - 配置层
// ==========================================
// 职责: 系统配置管理,支持全局默认 + 牲畜群覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod method_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ConfigScope};
pub use method_config_trait::{LivestockMethodConfig, MethodConfigReader};
