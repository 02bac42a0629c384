// ==========================================
// 牲畜减员核算系统 - 配置管理 API
// ==========================================
// 职责: 牲畜群方法配置的保存/清除,全局默认值维护
// 说明: ConfigurationResolver 只读,配置写入只经过这里
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{ConfigManager, ConfigScope};
use crate::config::method_config_trait::{LivestockMethodConfig, MethodConfigReader};
use crate::domain::types::DepletionMethod;

/// 配置管理API
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 查询牲畜群已保存的方法配置
    pub fn get_livestock_method_config(
        &self,
        livestock_id: &str,
    ) -> ApiResult<Option<LivestockMethodConfig>> {
        check_livestock_id(livestock_id)?;
        self.config_manager
            .get_livestock_method_config(livestock_id)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 保存牲畜群方法配置（None 字段回落到推荐值）
    pub fn save_livestock_method_config(
        &self,
        livestock_id: &str,
        config: &LivestockMethodConfig,
    ) -> ApiResult<()> {
        check_livestock_id(livestock_id)?;
        if config.is_empty() {
            return Err(ApiError::InvalidInput(
                "方法配置为空,如需恢复推荐值请使用清除接口".to_string(),
            ));
        }
        self.config_manager
            .save_livestock_method_config(livestock_id, config)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 清除牲畜群方法配置,返回删除的键数
    pub fn clear_livestock_method_config(&self, livestock_id: &str) -> ApiResult<usize> {
        check_livestock_id(livestock_id)?;
        self.config_manager
            .clear_livestock_method_config(livestock_id)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 设置全局默认减员方法
    ///
    /// manual 需要人工选择批次,不能作为默认值
    pub fn set_default_depletion_method(&self, method: DepletionMethod) -> ApiResult<()> {
        if method == DepletionMethod::Manual {
            return Err(ApiError::InvalidInput(
                "manual 不能作为全局默认减员方法".to_string(),
            ));
        }
        self.config_manager
            .set_default_depletion_method(method)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 读取单个配置值
    pub fn get_config_value(&self, scope: &ConfigScope, key: &str) -> ApiResult<Option<String>> {
        if key.trim().is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }
        self.config_manager
            .get_config_value(scope, key)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 全局配置快照（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        self.config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }
}

fn check_livestock_id(livestock_id: &str) -> ApiResult<()> {
    if livestock_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("livestock_id 不能为空".to_string()));
    }
    Ok(())
}
