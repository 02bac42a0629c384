// ==========================================
// 牲畜减员核算系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 作用域: global（全局默认） / livestock:{id}（牲畜群方法配置）
// ==========================================

use crate::config::method_config_trait::{LivestockMethodConfig, MethodConfigReader};
use crate::domain::types::{DepletionMethod, FeedUsageMethod, RecordingMethod};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,                                // 全局
    Livestock { livestock_id: String },    // 牲畜群
}

impl ConfigScope {
    pub fn livestock(livestock_id: impl Into<String>) -> Self {
        ConfigScope::Livestock {
            livestock_id: livestock_id.into(),
        }
    }

    /// config_kv.scope_id 取值
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Livestock { livestock_id } => format!("livestock:{}", livestock_id),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取指定作用域的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(
        &self,
        scope: &ConfigScope,
        key: &str,
    ) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(&ConfigScope::Global, key)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(
        &self,
        scope: &ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 读取枚举配置,缺失或非法时返回默认值
    fn get_enum_or_default<T>(&self, scope: &ConfigScope, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
    {
        match self.get_config_value(scope, key)? {
            Some(raw) => match raw.parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(
                        scope_id = %scope.scope_id(),
                        config_key = key,
                        raw_value = %raw,
                        "配置值非法，使用默认值"
                    );
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 读取可缺省的枚举配置,非法值视为未配置
    fn get_optional_enum<T>(&self, scope: &ConfigScope, key: &str) -> Result<Option<T>, Box<dyn Error>>
    where
        T: FromStr,
    {
        let raw = match self.get_config_value(scope, key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match raw.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                tracing::warn!(
                    scope_id = %scope.scope_id(),
                    config_key = key,
                    raw_value = %raw,
                    "配置值非法，按未配置处理"
                );
                Ok(None)
            }
        }
    }

    // ===== 牲畜群方法配置（外部管理流程调用） =====

    /// 保存牲畜群方法配置
    ///
    /// None 字段会删除对应键,使其回落到推荐值
    pub fn save_livestock_method_config(
        &self,
        livestock_id: &str,
        config: &LivestockMethodConfig,
    ) -> Result<(), Box<dyn Error>> {
        let scope_id = ConfigScope::livestock(livestock_id).scope_id();
        let entries = [
            (
                config_keys::RECORDING_METHOD,
                config.recording_method.map(|m| m.as_str()),
            ),
            (
                config_keys::DEPLETION_METHOD,
                config.depletion_method.map(|m| m.as_str()),
            ),
            (
                config_keys::FEED_USAGE_METHOD,
                config.feed_usage_method.map(|m| m.as_str()),
            ),
        ];

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            match value {
                Some(value) => {
                    tx.execute(
                        r#"
                        INSERT INTO config_kv (scope_id, key, value, updated_at)
                        VALUES (?1, ?2, ?3, datetime('now'))
                        ON CONFLICT(scope_id, key) DO UPDATE SET
                            value = excluded.value,
                            updated_at = excluded.updated_at
                        "#,
                        params![scope_id, key, value],
                    )?;
                }
                None => {
                    tx.execute(
                        "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                        params![scope_id, key],
                    )?;
                }
            }
        }
        tx.commit()?;

        tracing::info!(livestock_id, ?config, "保存牲畜群方法配置");
        Ok(())
    }

    /// 清除牲畜群方法配置
    pub fn clear_livestock_method_config(&self, livestock_id: &str) -> Result<usize, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let removed = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1",
            params![ConfigScope::livestock(livestock_id).scope_id()],
        )?;
        Ok(removed)
    }

    // ===== 全局默认值 =====

    pub fn set_default_depletion_method(&self, method: DepletionMethod) -> Result<(), Box<dyn Error>> {
        self.set_config_value(
            &ConfigScope::Global,
            config_keys::DEFAULT_DEPLETION_METHOD,
            method.as_str(),
        )
    }

    /// 获取全部 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// MethodConfigReader Trait 实现
// ==========================================
impl MethodConfigReader for ConfigManager {
    fn get_livestock_method_config(
        &self,
        livestock_id: &str,
    ) -> Result<Option<LivestockMethodConfig>, Box<dyn Error>> {
        let scope = ConfigScope::livestock(livestock_id);
        let config = LivestockMethodConfig {
            recording_method: self.get_optional_enum(&scope, config_keys::RECORDING_METHOD)?,
            depletion_method: self.get_optional_enum(&scope, config_keys::DEPLETION_METHOD)?,
            feed_usage_method: self.get_optional_enum(&scope, config_keys::FEED_USAGE_METHOD)?,
        };

        if config.is_empty() {
            Ok(None)
        } else {
            Ok(Some(config))
        }
    }

    fn get_default_depletion_method(&self) -> Result<DepletionMethod, Box<dyn Error>> {
        let method = self.get_enum_or_default(
            &ConfigScope::Global,
            config_keys::DEFAULT_DEPLETION_METHOD,
            DepletionMethod::Fifo,
        )?;
        // 全局默认只能是按顺序分配的方法
        if method == DepletionMethod::Manual {
            tracing::warn!("全局默认减员方法不能为 manual，使用 fifo");
            return Ok(DepletionMethod::Fifo);
        }
        Ok(method)
    }

    fn get_default_recording_method(&self) -> Result<RecordingMethod, Box<dyn Error>> {
        self.get_enum_or_default(
            &ConfigScope::Global,
            config_keys::DEFAULT_RECORDING_METHOD,
            RecordingMethod::Total,
        )
    }

    fn get_default_feed_usage_method(&self) -> Result<FeedUsageMethod, Box<dyn Error>> {
        self.get_enum_or_default(
            &ConfigScope::Global,
            config_keys::DEFAULT_FEED_USAGE_METHOD,
            FeedUsageMethod::Total,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 牲畜群作用域
    pub const RECORDING_METHOD: &str = "recording_method";
    pub const DEPLETION_METHOD: &str = "depletion_method";
    pub const FEED_USAGE_METHOD: &str = "feed_usage_method";

    // 全局作用域
    pub const DEFAULT_DEPLETION_METHOD: &str = "default_depletion_method";
    pub const DEFAULT_RECORDING_METHOD: &str = "default_recording_method";
    pub const DEFAULT_FEED_USAGE_METHOD: &str = "default_feed_usage_method";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_scope_id_format() {
        assert_eq!(ConfigScope::Global.scope_id(), "global");
        assert_eq!(ConfigScope::livestock("L001").scope_id(), "livestock:L001");
    }

    #[test]
    fn test_defaults_when_unconfigured() {
        let mgr = manager();
        assert_eq!(mgr.get_default_depletion_method().unwrap(), DepletionMethod::Fifo);
        assert_eq!(mgr.get_default_recording_method().unwrap(), RecordingMethod::Total);
        assert!(mgr.get_livestock_method_config("L001").unwrap().is_none());
    }

    #[test]
    fn test_save_and_clear_livestock_config() {
        let mgr = manager();
        let config = LivestockMethodConfig {
            recording_method: Some(RecordingMethod::Batch),
            depletion_method: Some(DepletionMethod::Lifo),
            feed_usage_method: None,
        };
        mgr.save_livestock_method_config("L001", &config).unwrap();
        assert_eq!(mgr.get_livestock_method_config("L001").unwrap(), Some(config));
        assert!(mgr.get_livestock_method_config("L002").unwrap().is_none());

        assert_eq!(mgr.clear_livestock_method_config("L001").unwrap(), 2);
        assert!(mgr.get_livestock_method_config("L001").unwrap().is_none());
    }

    #[test]
    fn test_invalid_global_default_falls_back() {
        let mgr = manager();
        mgr.set_config_value(&ConfigScope::Global, config_keys::DEFAULT_DEPLETION_METHOD, "weighted")
            .unwrap();
        assert_eq!(mgr.get_default_depletion_method().unwrap(), DepletionMethod::Fifo);

        mgr.set_default_depletion_method(DepletionMethod::Lifo).unwrap();
        assert_eq!(mgr.get_default_depletion_method().unwrap(), DepletionMethod::Lifo);
        assert!(mgr.get_config_snapshot().unwrap().contains("lifo"));
    }
}
