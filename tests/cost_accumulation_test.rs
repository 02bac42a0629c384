// ==========================================
// 累计成本核算集成测试
// ==========================================
// 职责: 验证成本递推链、前一日依赖、重算保留ID
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod cost_accumulation_test {
    use chrono::Duration;
    use livestock_depletion::api::ApiError;
    use livestock_depletion::app::AppState;
    use livestock_depletion::domain::cost::DailyActivity;
    use livestock_depletion::domain::depletion::DepletionRequest;
    use livestock_depletion::domain::types::DepletionType;

    use crate::test_helpers::*;

    /// 单批次 1000 头,单价 5000,入栏日 = 基准日
    fn seed_single_batch(state: &AppState) {
        seed_livestock(
            state,
            "L1",
            vec![batch("L1", "L1-A", as_of(), 1000, 5000.0)],
        );
    }

    fn deplete(state: &AppState, kind: DepletionType, days_after_start: i64, quantity: i64) {
        state
            .depletion_api
            .process_depletion(&DepletionRequest::new(
                "L1",
                kind,
                as_of() + Duration::days(days_after_start),
                quantity,
            ))
            .unwrap();
    }

    #[test]
    fn test_day_one_and_day_two_chain() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);

        state
            .cost_api
            .record_daily_activity(
                "L1",
                as_of(),
                &DailyActivity {
                    feed_cost: 150_000.0,
                    medicine_cost: 50_000.0,
                },
            )
            .unwrap();
        deplete(&state, DepletionType::Mortality, 0, 5);

        let day1 = state.cost_api.calculate_for_date("L1", as_of()).unwrap();
        assert_eq!(day1.prior_cost_record_id, None);
        assert_eq!(day1.breakdown.prior_cumulative_cost_per_head, 5000.0);
        assert_eq!(day1.breakdown.deplesi_head_count, 5);
        assert_eq!(day1.breakdown.deplesi_cost, 25_000.0);
        assert_eq!(day1.total_cost, 225_000.0);
        assert_eq!(day1.stock_before, 1000);
        assert_eq!(day1.stock_after, 995);
        assert!((day1.cost_per_head - 5226.13).abs() < 0.01);

        // 第二天: 死亡 1 + 销售 4,销售不计入 deplesi 但减少存栏
        deplete(&state, DepletionType::Mortality, 1, 1);
        deplete(&state, DepletionType::Sales, 1, 4);

        let day2 = state
            .cost_api
            .calculate_for_date("L1", as_of() + Duration::days(1))
            .unwrap();
        assert_eq!(day2.prior_cost_record_id.as_deref(), Some(day1.id.as_str()));
        assert_eq!(day2.stock_before, 995);
        assert_eq!(day2.stock_after, 990);
        assert_eq!(day2.breakdown.deplesi_head_count, 1);
        assert!((day2.breakdown.deplesi_cost - day1.cost_per_head).abs() < 1e-9);
        assert!((day2.cost_per_head - day1.cost_per_head * 995.0 / 990.0).abs() < 1e-6);

        let stored = state
            .cost_api
            .list_cost_records("L1", as_of(), as_of() + Duration::days(1))
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_missing_prior_day_is_error() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);

        let err = state
            .cost_api
            .calculate_for_date("L1", as_of() + Duration::days(3))
            .unwrap_err();
        match err {
            ApiError::CostDependencyMissing {
                livestock_id,
                missing_date,
            } => {
                assert_eq!(livestock_id, "L1");
                assert_eq!(missing_date, as_of() + Duration::days(2));
            }
            other => panic!("Expected CostDependencyMissing, got {:?}", other),
        }
        assert!(state
            .cost_api
            .get_cost_record("L1", as_of() + Duration::days(3))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_date_before_start_rejected() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);

        let err = state
            .cost_api
            .calculate_for_date("L1", as_of() - Duration::days(1))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_range_backfill_in_order() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);
        deplete(&state, DepletionType::Culling, 2, 10);

        let records = state
            .cost_api
            .calculate_range("L1", as_of(), as_of() + Duration::days(3))
            .unwrap();

        assert_eq!(records.len(), 4);
        for pair in records.windows(2) {
            assert_eq!(pair[1].prior_cost_record_id.as_deref(), Some(pair[0].id.as_str()));
            assert_eq!(pair[1].stock_before, pair[0].stock_after);
        }
        assert_eq!(records[2].stock_after, 990);
        assert_eq!(records[3].stock_after, 990);

        let err = state
            .cost_api
            .calculate_range("L1", as_of() + Duration::days(3), as_of())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_recalculation_keeps_record_id() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);

        let first = state.cost_api.calculate_for_date("L1", as_of()).unwrap();

        state
            .cost_api
            .record_daily_activity(
                "L1",
                as_of(),
                &DailyActivity {
                    feed_cost: 10_000.0,
                    medicine_cost: 0.0,
                },
            )
            .unwrap();
        let second = state.cost_api.calculate_for_date("L1", as_of()).unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.cost_per_head > first.cost_per_head);
    }

    #[test]
    fn test_reversed_depletion_excluded() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);

        let committed = state
            .depletion_api
            .process_depletion(&DepletionRequest::new(
                "L1",
                DepletionType::Mortality,
                as_of(),
                20,
            ))
            .unwrap();
        state
            .depletion_api
            .reverse_depletion(&committed.record_id, "double entry")
            .unwrap();

        let day1 = state.cost_api.calculate_for_date("L1", as_of()).unwrap();
        assert_eq!(day1.stock_after, 1000);
        assert_eq!(day1.breakdown.deplesi_head_count, 0);
    }

    #[test]
    fn test_later_batch_counts_from_entry_day() {
        let (_temp_file, state) = create_test_state();
        seed_single_batch(&state);
        state
            .repos
            .livestock_repo
            .add_batch(&batch("L1", "L1-B", as_of() + Duration::days(2), 500, 8000.0))
            .unwrap();

        let records = state
            .cost_api
            .calculate_range("L1", as_of(), as_of() + Duration::days(3))
            .unwrap();

        assert_eq!(records[0].stock_after, 1000);
        // 调入前一日不含新批次
        assert_eq!(records[1].stock_before, 1000);
        assert_eq!(records[1].stock_after, 1000);
        assert!((records[1].cost_per_head - 5000.0).abs() < 1e-9);

        // 调入当日: (5000 × 1000 + 8000 × 500) / 1500
        assert_eq!(records[2].stock_before, 1000);
        assert_eq!(records[2].stock_after, 1500);
        assert!((records[2].cost_per_head - 6000.0).abs() < 1e-9);
        assert!((records[2].total_value - 9_000_000.0).abs() < 1e-6);

        assert_eq!(records[3].stock_before, 1500);
        assert_eq!(records[3].stock_after, 1500);
        for pair in records.windows(2) {
            assert_eq!(pair[1].stock_before, pair[0].stock_after);
        }
    }
}
