// ==========================================
// 牲畜减员核算系统 - 牲畜与批次领域模型
// ==========================================
// 红线: 批次可用数量永不为负
// 红线: 牲畜计数器只由减员处理器修改
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Livestock - 牲畜群（聚合根）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Livestock {
    pub id: String,
    pub name: String,
    pub initial_quantity: i64,   // 入栏总数
    pub quantity_depletion: i64, // 死亡+淘汰累计
    pub quantity_sales: i64,     // 销售累计
    pub quantity_mutated: i64,   // 转群累计
    pub start_date: NaiveDate,   // 入栏日期（成本核算第一天）
}

impl Livestock {
    /// 按计数器口径计算的存栏（不低于 0）
    pub fn counter_stock(&self) -> i64 {
        (self.initial_quantity - self.quantity_depletion - self.quantity_sales - self.quantity_mutated)
            .max(0)
    }
}

// ==========================================
// LivestockBatch - 批次（同日同价入栏的一群）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivestockBatch {
    pub id: String,
    pub livestock_id: String,
    pub name: String,
    pub start_date: NaiveDate,   // 入栏日期,日龄由此推导
    pub initial_quantity: i64,
    pub available_quantity: i64, // 可扣减数量
    pub price_per_head: f64,     // 入栏单价
    pub status: BatchStatus,
}

impl LivestockBatch {
    /// 截至 as_of 的日龄（入栏日之前视为 0）
    pub fn age_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.start_date).num_days().max(0)
    }

    /// as_of 当日是否已入栏
    pub fn has_entered(&self, as_of: NaiveDate) -> bool {
        self.start_date <= as_of
    }

    /// as_of 当日可参与 FIFO/LIFO 分配: active、有余量且已入栏
    pub fn is_eligible(&self, as_of: NaiveDate) -> bool {
        self.status == BatchStatus::Active && self.available_quantity > 0 && self.has_entered(as_of)
    }

    /// 已扣减数量
    pub fn depleted_quantity(&self) -> i64 {
        (self.initial_quantity - self.available_quantity).max(0)
    }

    /// 扣减比例（0.0 - 100.0）
    pub fn utilization_rate(&self) -> f64 {
        if self.initial_quantity <= 0 {
            return 0.0;
        }
        self.depleted_quantity() as f64 / self.initial_quantity as f64 * 100.0
    }
}

// ==========================================
// CurrentStock - 当前存栏（派生聚合）
// ==========================================
// 红线: 只由处理器在提交/冲销后重算,不可手工修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStock {
    pub livestock_id: String,
    pub quantity: i64,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(start: NaiveDate, initial: i64, available: i64) -> LivestockBatch {
        LivestockBatch {
            id: "B001".to_string(),
            livestock_id: "L001".to_string(),
            name: "Batch 1".to_string(),
            start_date: start,
            initial_quantity: initial,
            available_quantity: available,
            price_per_head: 5000.0,
            status: BatchStatus::Active,
        }
    }

    #[test]
    fn test_age_days_clamped_before_entry() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let b = batch(start, 100, 100);
        assert_eq!(b.age_days(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()), 0);
        assert_eq!(b.age_days(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()), 10);
    }

    #[test]
    fn test_not_eligible_before_entry() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let b = batch(start, 100, 100);
        assert!(!b.is_eligible(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()));
        assert!(b.is_eligible(start));

        let mut empty = batch(start, 100, 0);
        assert!(!empty.is_eligible(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()));
        empty.available_quantity = 5;
        empty.status = BatchStatus::Depleted;
        assert!(!empty.is_eligible(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()));
    }

    #[test]
    fn test_utilization_rate() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let b = batch(start, 200, 150);
        assert_eq!(b.depleted_quantity(), 50);
        assert!((b.utilization_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_counter_stock_clamped_at_zero() {
        let livestock = Livestock {
            id: "L001".to_string(),
            name: "Kandang A".to_string(),
            initial_quantity: 10,
            quantity_depletion: 8,
            quantity_sales: 5,
            quantity_mutated: 0,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        assert_eq!(livestock.counter_stock(), 0);
    }
}
