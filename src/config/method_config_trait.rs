// ==========================================
// 牲畜减员核算系统 - 方法配置读取 Trait
// ==========================================
// 职责: 定义 ConfigurationResolver 所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{DepletionMethod, FeedUsageMethod, RecordingMethod};
use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// LivestockMethodConfig - 牲畜群已保存的方法配置
// ==========================================
// 各字段可单独缺省,缺省项由推荐值补齐
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivestockMethodConfig {
    pub recording_method: Option<RecordingMethod>,
    pub depletion_method: Option<DepletionMethod>,
    pub feed_usage_method: Option<FeedUsageMethod>,
}

impl LivestockMethodConfig {
    pub fn is_empty(&self) -> bool {
        self.recording_method.is_none()
            && self.depletion_method.is_none()
            && self.feed_usage_method.is_none()
    }
}

// ==========================================
// MethodConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait MethodConfigReader: Send + Sync {
    /// 读取牲畜群已保存的方法配置
    ///
    /// # 返回
    /// - None: 从未保存过任何方法配置
    fn get_livestock_method_config(
        &self,
        livestock_id: &str,
    ) -> Result<Option<LivestockMethodConfig>, Box<dyn Error>>;

    /// 全局默认减员方法
    ///
    /// # 默认值
    /// - FIFO
    fn get_default_depletion_method(&self) -> Result<DepletionMethod, Box<dyn Error>>;

    /// 全局默认记录方式（单批次场景）
    ///
    /// # 默认值
    /// - TOTAL
    fn get_default_recording_method(&self) -> Result<RecordingMethod, Box<dyn Error>>;

    /// 全局默认饲料消耗方式（单批次场景）
    ///
    /// # 默认值
    /// - TOTAL
    fn get_default_feed_usage_method(&self) -> Result<FeedUsageMethod, Box<dyn Error>>;
}
