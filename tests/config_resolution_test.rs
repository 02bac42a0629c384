// ==========================================
// 方法配置解析集成测试
// ==========================================
// 职责: 验证已保存配置优先、按批次数推荐、减员按解析结果分配
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod config_resolution_test {
    use livestock_depletion::config::LivestockMethodConfig;
    use livestock_depletion::domain::depletion::DepletionRequest;
    use livestock_depletion::domain::types::{
        DepletionMethod, DepletionType, FeedUsageMethod, RecordingMethod,
    };
    use livestock_depletion::engine::ConfigSource;

    use crate::test_helpers::*;

    #[test]
    fn test_multi_batch_recommendation() {
        let (_temp_file, state) = create_test_state();
        seed_two_batch_livestock(&state, "L1");

        let resolved = state.depletion_api.resolve_method_config("L1").unwrap();
        assert_eq!(resolved.source, ConfigSource::Recommended);
        assert_eq!(resolved.active_batch_count, 2);
        assert_eq!(resolved.recording_method, RecordingMethod::Batch);
        assert_eq!(resolved.depletion_method, DepletionMethod::Fifo);
        assert_eq!(resolved.feed_usage_method, FeedUsageMethod::Fifo);
    }

    #[test]
    fn test_single_batch_uses_global_defaults() {
        let (_temp_file, state) = create_test_state();
        seed_livestock(&state, "L1", vec![batch("L1", "L1-A", as_of(), 100, 5000.0)]);

        let resolved = state.depletion_api.resolve_method_config("L1").unwrap();
        assert_eq!(resolved.recording_method, RecordingMethod::Total);
        assert_eq!(resolved.depletion_method, DepletionMethod::Fifo);

        state
            .config_api
            .set_default_depletion_method(DepletionMethod::Lifo)
            .unwrap();
        let resolved = state.depletion_api.resolve_method_config("L1").unwrap();
        assert_eq!(resolved.depletion_method, DepletionMethod::Lifo);

        let err = state
            .config_api
            .set_default_depletion_method(DepletionMethod::Manual)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_saved_config_drives_allocation() {
        let (_temp_file, state) = create_test_state();
        seed_two_batch_livestock(&state, "L1");

        state
            .config_api
            .save_livestock_method_config(
                "L1",
                &LivestockMethodConfig {
                    depletion_method: Some(DepletionMethod::Lifo),
                    ..Default::default()
                },
            )
            .unwrap();

        let resolved = state.depletion_api.resolve_method_config("L1").unwrap();
        assert_eq!(resolved.source, ConfigSource::Saved);
        assert_eq!(resolved.depletion_method, DepletionMethod::Lifo);
        // 未保存的字段由推荐值补齐
        assert_eq!(resolved.recording_method, RecordingMethod::Batch);

        let result = state
            .depletion_api
            .process_depletion(&DepletionRequest::new(
                "L1",
                DepletionType::Mortality,
                as_of(),
                5,
            ))
            .unwrap();
        assert_eq!(result.method, DepletionMethod::Lifo);
        assert_eq!(result.method_source, Some(ConfigSource::Saved));
        assert_eq!(result.allocations[0].batch_id, young_batch("L1"));

        // 清除后回落到推荐值
        state.config_api.clear_livestock_method_config("L1").unwrap();
        let resolved = state.depletion_api.resolve_method_config("L1").unwrap();
        assert_eq!(resolved.source, ConfigSource::Recommended);
        assert!(state
            .config_api
            .get_livestock_method_config("L1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_saved_manual_requires_selections() {
        let (_temp_file, state) = create_test_state();
        seed_two_batch_livestock(&state, "L1");

        state
            .config_api
            .save_livestock_method_config(
                "L1",
                &LivestockMethodConfig {
                    depletion_method: Some(DepletionMethod::Manual),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = state
            .depletion_api
            .process_depletion(&DepletionRequest::new(
                "L1",
                DepletionType::Mortality,
                as_of(),
                5,
            ))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(current_stock(&state, "L1"), 150);
    }

    #[test]
    fn test_unknown_livestock() {
        let (_temp_file, state) = create_test_state();
        let err = state.depletion_api.resolve_method_config("GHOST").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
