// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use livestock_depletion::app::AppState;
use livestock_depletion::domain::livestock::{Livestock, LivestockBatch};
use livestock_depletion::domain::types::BatchStatus;
use tempfile::NamedTempFile;

/// 测试基准日
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 创建临时数据库并初始化 AppState（建表由 AppState 完成）
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - AppState: 应用状态
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();
    let state = AppState::new(db_path).unwrap();
    (temp_file, state)
}

/// 构造批次（可用数量 = 入栏数量）
pub fn batch(
    livestock_id: &str,
    batch_id: &str,
    start_date: NaiveDate,
    initial_quantity: i64,
    price_per_head: f64,
) -> LivestockBatch {
    LivestockBatch {
        id: batch_id.to_string(),
        livestock_id: livestock_id.to_string(),
        name: format!("Batch {}", batch_id),
        start_date,
        initial_quantity,
        available_quantity: initial_quantity,
        price_per_head,
        status: BatchStatus::Active,
    }
}

/// 登记牲畜群（入栏总数 = 批次入栏数之和,入栏日期 = 最早批次日期）
pub fn seed_livestock(state: &AppState, livestock_id: &str, batches: Vec<LivestockBatch>) {
    let initial_quantity = batches.iter().map(|b| b.initial_quantity).sum();
    let start_date = batches
        .iter()
        .map(|b| b.start_date)
        .min()
        .unwrap_or_else(as_of);
    let livestock = Livestock {
        id: livestock_id.to_string(),
        name: format!("Kandang {}", livestock_id),
        initial_quantity,
        quantity_depletion: 0,
        quantity_sales: 0,
        quantity_mutated: 0,
        start_date,
    };
    state
        .repos
        .livestock_repo
        .register(&livestock, &batches)
        .unwrap();
}

/// 两批次牲畜群: {id}-OLD 30 天 / 100 头, {id}-YOUNG 10 天 / 50 头
pub fn seed_two_batch_livestock(state: &AppState, livestock_id: &str) {
    seed_livestock(
        state,
        livestock_id,
        vec![
            batch(
                livestock_id,
                &old_batch(livestock_id),
                as_of() - Duration::days(30),
                100,
                5000.0,
            ),
            batch(
                livestock_id,
                &young_batch(livestock_id),
                as_of() - Duration::days(10),
                50,
                6000.0,
            ),
        ],
    );
}

pub fn old_batch(livestock_id: &str) -> String {
    format!("{}-OLD", livestock_id)
}

pub fn young_batch(livestock_id: &str) -> String {
    format!("{}-YOUNG", livestock_id)
}

/// 批次当前可用数量
pub fn batch_available(state: &AppState, batch_id: &str) -> i64 {
    state
        .repos
        .livestock_repo
        .find_batch(batch_id)
        .unwrap()
        .unwrap()
        .available_quantity
}

/// 当前存栏（current_stock 表）
pub fn current_stock(state: &AppState, livestock_id: &str) -> i64 {
    state
        .repos
        .livestock_repo
        .get_current_stock(livestock_id)
        .unwrap()
        .unwrap()
        .quantity
}

/// 计数器口径存栏
pub fn counter_stock(state: &AppState, livestock_id: &str) -> i64 {
    state
        .repos
        .livestock_repo
        .find_by_id(livestock_id)
        .unwrap()
        .unwrap()
        .counter_stock()
}
