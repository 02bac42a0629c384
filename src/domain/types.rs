// ==========================================
// 牲畜减员核算系统 - 领域类型定义
// ==========================================
// 红线: 分配方法是封闭枚举,不做字符串分派
// 序列化格式: lowercase (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 枚举解析错误（数据库/外部输入中的非法取值）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的{kind}取值: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ==========================================
// 减员分配方法 (Depletion Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepletionMethod {
    Fifo,   // 先进先出（最老批次优先）
    Lifo,   // 后进先出（最新批次优先）
    Manual, // 人工指定批次
}

impl DepletionMethod {
    pub const ALL: [DepletionMethod; 3] = [
        DepletionMethod::Fifo,
        DepletionMethod::Lifo,
        DepletionMethod::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DepletionMethod::Fifo => "fifo",
            DepletionMethod::Lifo => "lifo",
            DepletionMethod::Manual => "manual",
        }
    }

    /// 展示名称
    pub fn label(&self) -> &'static str {
        match self {
            DepletionMethod::Fifo => "First In First Out",
            DepletionMethod::Lifo => "Last In First Out",
            DepletionMethod::Manual => "Manual Selection",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DepletionMethod::Fifo => "最老批次优先扣减,用于库存轮换",
            DepletionMethod::Lifo => "最新批次优先扣减",
            DepletionMethod::Manual => "由操作人明确指定扣减的批次与数量",
        }
    }
}

impl fmt::Display for DepletionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepletionMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fifo" => Ok(DepletionMethod::Fifo),
            "lifo" => Ok(DepletionMethod::Lifo),
            "manual" => Ok(DepletionMethod::Manual),
            _ => Err(ParseEnumError::new("depletion_method", s)),
        }
    }
}

// ==========================================
// 减员类型 (Depletion Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepletionType {
    Mortality, // 死亡
    Sales,     // 销售
    Culling,   // 淘汰
    Mutation,  // 转群/调拨
}

/// 牲畜累计计数器（减员类型落到哪一列）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityCounter {
    Depletion,
    Sales,
    Mutated,
}

impl QuantityCounter {
    /// livestock 表对应列名
    pub fn column(&self) -> &'static str {
        match self {
            QuantityCounter::Depletion => "quantity_depletion",
            QuantityCounter::Sales => "quantity_sales",
            QuantityCounter::Mutated => "quantity_mutated",
        }
    }
}

impl DepletionType {
    pub const ALL: [DepletionType; 4] = [
        DepletionType::Mortality,
        DepletionType::Sales,
        DepletionType::Culling,
        DepletionType::Mutation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DepletionType::Mortality => "mortality",
            DepletionType::Sales => "sales",
            DepletionType::Culling => "culling",
            DepletionType::Mutation => "mutation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DepletionType::Mortality => "Mortality",
            DepletionType::Sales => "Sales",
            DepletionType::Culling => "Culling",
            DepletionType::Mutation => "Mutation",
        }
    }

    /// 死亡与淘汰计入 deplesi（参与成本核算的损耗）
    pub fn is_deplesi(&self) -> bool {
        matches!(self, DepletionType::Mortality | DepletionType::Culling)
    }

    pub fn counter(&self) -> QuantityCounter {
        match self {
            DepletionType::Mortality | DepletionType::Culling => QuantityCounter::Depletion,
            DepletionType::Sales => QuantityCounter::Sales,
            DepletionType::Mutation => QuantityCounter::Mutated,
        }
    }
}

impl fmt::Display for DepletionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepletionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mortality" => Ok(DepletionType::Mortality),
            "sales" => Ok(DepletionType::Sales),
            "culling" => Ok(DepletionType::Culling),
            "mutation" => Ok(DepletionType::Mutation),
            _ => Err(ParseEnumError::new("depletion_type", s)),
        }
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Active,   // 有存栏
    Depleted, // 已扣完
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "active",
            BatchStatus::Depleted => "depleted",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(BatchStatus::Active),
            "depleted" => Ok(BatchStatus::Depleted),
            _ => Err(ParseEnumError::new("batch_status", s)),
        }
    }
}

// ==========================================
// 记录方式 (Recording Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMethod {
    Batch, // 按批次记录
    Total, // 按总量记录
}

impl RecordingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingMethod::Batch => "batch",
            RecordingMethod::Total => "total",
        }
    }
}

impl fmt::Display for RecordingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" => Ok(RecordingMethod::Batch),
            "total" => Ok(RecordingMethod::Total),
            _ => Err(ParseEnumError::new("recording_method", s)),
        }
    }
}

// ==========================================
// 饲料领用方式 (Feed Usage Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedUsageMethod {
    Total,
    Fifo,
    Lifo,
    Manual,
}

impl FeedUsageMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedUsageMethod::Total => "total",
            FeedUsageMethod::Fifo => "fifo",
            FeedUsageMethod::Lifo => "lifo",
            FeedUsageMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for FeedUsageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedUsageMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "total" => Ok(FeedUsageMethod::Total),
            "fifo" => Ok(FeedUsageMethod::Fifo),
            "lifo" => Ok(FeedUsageMethod::Lifo),
            "manual" => Ok(FeedUsageMethod::Manual),
            _ => Err(ParseEnumError::new("feed_usage_method", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip_through_str() {
        for method in DepletionMethod::ALL {
            assert_eq!(method.as_str().parse::<DepletionMethod>().unwrap(), method);
        }
        assert_eq!(" FIFO ".parse::<DepletionMethod>().unwrap(), DepletionMethod::Fifo);
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let err = "average".parse::<DepletionMethod>().unwrap_err();
        assert_eq!(err.kind, "depletion_method");
        assert_eq!(err.value, "average");
    }

    #[test]
    fn test_depletion_type_counter_mapping() {
        assert_eq!(DepletionType::Mortality.counter(), QuantityCounter::Depletion);
        assert_eq!(DepletionType::Culling.counter(), QuantityCounter::Depletion);
        assert_eq!(DepletionType::Sales.counter(), QuantityCounter::Sales);
        assert_eq!(DepletionType::Mutation.counter(), QuantityCounter::Mutated);
        assert!(DepletionType::Culling.is_deplesi());
        assert!(!DepletionType::Sales.is_deplesi());
    }

    #[test]
    fn test_serde_lowercase_wire_form() {
        let json = serde_json::to_string(&DepletionType::Mutation).unwrap();
        assert_eq!(json, "\"mutation\"");
        let method: DepletionMethod = serde_json::from_str("\"lifo\"").unwrap();
        assert_eq!(method, DepletionMethod::Lifo);
    }
}
