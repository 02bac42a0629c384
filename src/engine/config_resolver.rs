// ==========================================
// 牲畜减员核算系统 - 方法配置解析引擎
// ==========================================
// 红线: 只读,不写配置
// 红线: 每个请求只解析一次,结果不可变
// ==========================================
// 规则:
// 1) 有已保存配置 → 使用已保存值,缺失字段用推荐值补齐
// 2) 无已保存配置 → 多批次推荐 batch + fifo + fifo,单批次取全局默认（total + fifo）
// ==========================================

use crate::config::method_config_trait::{LivestockMethodConfig, MethodConfigReader};
use crate::domain::types::{DepletionMethod, FeedUsageMethod, RecordingMethod};
use crate::engine::error::{DepletionError, EngineResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 配置来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Saved,
    Recommended,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Saved => "saved",
            ConfigSource::Recommended => "recommended",
        }
    }
}

// ==========================================
// ResolvedMethodConfig - 解析结果（不可变值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMethodConfig {
    pub livestock_id: String,
    pub recording_method: RecordingMethod,
    pub depletion_method: DepletionMethod,
    pub feed_usage_method: FeedUsageMethod,
    pub source: ConfigSource,
    pub active_batch_count: i64,
    pub reason: String,
}

// ==========================================
// ConfigurationResolver
// ==========================================
pub struct ConfigurationResolver<C>
where
    C: MethodConfigReader,
{
    config: Arc<C>,
}

impl<C> ConfigurationResolver<C>
where
    C: MethodConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 解析牲畜群的方法配置
    ///
    /// # 参数
    /// - `livestock_id`: 牲畜群ID
    /// - `active_batch_count`: 当前可用批次数（由调用方从仓储读取）
    pub fn resolve(
        &self,
        livestock_id: &str,
        active_batch_count: i64,
    ) -> EngineResult<ResolvedMethodConfig> {
        let recommended = self.recommend(active_batch_count)?;

        let saved = self
            .config
            .get_livestock_method_config(livestock_id)
            .map_err(|e| DepletionError::Config(e.to_string()))?;

        let resolved = match saved {
            Some(saved) => {
                let filled = fill_missing(&saved, &recommended);
                ResolvedMethodConfig {
                    livestock_id: livestock_id.to_string(),
                    recording_method: filled.0,
                    depletion_method: filled.1,
                    feed_usage_method: filled.2,
                    source: ConfigSource::Saved,
                    active_batch_count,
                    reason: format!(
                        "使用已保存配置（{}）",
                        describe_missing(&saved).unwrap_or_else(|| "完整".to_string())
                    ),
                }
            }
            None => ResolvedMethodConfig {
                livestock_id: livestock_id.to_string(),
                recording_method: recommended.recording_method,
                depletion_method: recommended.depletion_method,
                feed_usage_method: recommended.feed_usage_method,
                source: ConfigSource::Recommended,
                active_batch_count,
                reason: recommended.reason,
            },
        };

        tracing::debug!(
            livestock_id,
            source = resolved.source.as_str(),
            depletion_method = %resolved.depletion_method,
            "方法配置解析完成"
        );
        Ok(resolved)
    }

    /// 按批次数推荐
    fn recommend(&self, active_batch_count: i64) -> EngineResult<Recommendation> {
        if active_batch_count > 1 {
            return Ok(Recommendation {
                recording_method: RecordingMethod::Batch,
                depletion_method: DepletionMethod::Fifo,
                feed_usage_method: FeedUsageMethod::Fifo,
                reason: format!("存在{}个可用批次，推荐按批次记录并采用 FIFO", active_batch_count),
            });
        }

        let depletion_method = self
            .config
            .get_default_depletion_method()
            .map_err(|e| DepletionError::Config(e.to_string()))?;
        let recording_method = self
            .config
            .get_default_recording_method()
            .map_err(|e| DepletionError::Config(e.to_string()))?;
        let feed_usage_method = self
            .config
            .get_default_feed_usage_method()
            .map_err(|e| DepletionError::Config(e.to_string()))?;

        Ok(Recommendation {
            recording_method,
            depletion_method,
            feed_usage_method,
            reason: format!(
                "可用批次数为{}，记录方式与减员方法取全局默认 {} / {}",
                active_batch_count, recording_method, depletion_method
            ),
        })
    }
}

struct Recommendation {
    recording_method: RecordingMethod,
    depletion_method: DepletionMethod,
    feed_usage_method: FeedUsageMethod,
    reason: String,
}

fn fill_missing(
    saved: &LivestockMethodConfig,
    recommended: &Recommendation,
) -> (RecordingMethod, DepletionMethod, FeedUsageMethod) {
    (
        saved.recording_method.unwrap_or(recommended.recording_method),
        saved.depletion_method.unwrap_or(recommended.depletion_method),
        saved.feed_usage_method.unwrap_or(recommended.feed_usage_method),
    )
}

fn describe_missing(saved: &LivestockMethodConfig) -> Option<String> {
    let mut missing = Vec::new();
    if saved.recording_method.is_none() {
        missing.push("recording_method");
    }
    if saved.depletion_method.is_none() {
        missing.push("depletion_method");
    }
    if saved.feed_usage_method.is_none() {
        missing.push("feed_usage_method");
    }
    if missing.is_empty() {
        None
    } else {
        Some(format!("{} 由推荐值补齐", missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    struct MockConfigReader {
        saved: Option<LivestockMethodConfig>,
        default_method: DepletionMethod,
    }

    impl MethodConfigReader for MockConfigReader {
        fn get_livestock_method_config(
            &self,
            _livestock_id: &str,
        ) -> Result<Option<LivestockMethodConfig>, Box<dyn Error>> {
            Ok(self.saved.clone())
        }

        fn get_default_depletion_method(&self) -> Result<DepletionMethod, Box<dyn Error>> {
            Ok(self.default_method)
        }

        fn get_default_recording_method(&self) -> Result<RecordingMethod, Box<dyn Error>> {
            Ok(RecordingMethod::Total)
        }

        fn get_default_feed_usage_method(&self) -> Result<FeedUsageMethod, Box<dyn Error>> {
            Ok(FeedUsageMethod::Total)
        }
    }

    fn resolver(saved: Option<LivestockMethodConfig>, default_method: DepletionMethod) -> ConfigurationResolver<MockConfigReader> {
        ConfigurationResolver::new(Arc::new(MockConfigReader {
            saved,
            default_method,
        }))
    }

    #[test]
    fn test_multi_batch_recommendation() {
        let resolved = resolver(None, DepletionMethod::Lifo).resolve("L001", 3).unwrap();
        assert_eq!(resolved.source, ConfigSource::Recommended);
        assert_eq!(resolved.recording_method, RecordingMethod::Batch);
        assert_eq!(resolved.depletion_method, DepletionMethod::Fifo);
        assert_eq!(resolved.feed_usage_method, FeedUsageMethod::Fifo);
        assert_eq!(resolved.active_batch_count, 3);
    }

    #[test]
    fn test_single_batch_uses_global_default() {
        let resolved = resolver(None, DepletionMethod::Lifo).resolve("L001", 1).unwrap();
        assert_eq!(resolved.recording_method, RecordingMethod::Total);
        assert_eq!(resolved.depletion_method, DepletionMethod::Lifo);
        assert!(resolved.reason.contains("lifo"));
    }

    #[test]
    fn test_saved_config_fills_missing_fields() {
        let saved = LivestockMethodConfig {
            recording_method: None,
            depletion_method: Some(DepletionMethod::Lifo),
            feed_usage_method: None,
        };
        let resolved = resolver(Some(saved), DepletionMethod::Fifo).resolve("L001", 2).unwrap();
        assert_eq!(resolved.source, ConfigSource::Saved);
        assert_eq!(resolved.depletion_method, DepletionMethod::Lifo);
        assert_eq!(resolved.recording_method, RecordingMethod::Batch);
        assert_eq!(resolved.feed_usage_method, FeedUsageMethod::Fifo);
        assert!(resolved.reason.contains("recording_method"));
    }
}
