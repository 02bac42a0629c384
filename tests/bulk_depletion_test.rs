// ==========================================
// 批量减员集成测试
// ==========================================
// 职责: 验证逐条隔离失败、按下标报告
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod bulk_depletion_test {
    use livestock_depletion::domain::depletion::{DepletionRequest, ManualBatchSelection};
    use livestock_depletion::domain::types::{DepletionMethod, DepletionType};
    use livestock_depletion::engine::BulkItemStatus;

    use crate::test_helpers::*;

    #[test]
    fn test_failed_items_isolated() {
        let (_temp_file, state) = create_test_state();
        seed_two_batch_livestock(&state, "L1");
        seed_two_batch_livestock(&state, "L2");

        let requests = vec![
            DepletionRequest::new("L1", DepletionType::Mortality, as_of(), 10),
            // 数量为 0
            DepletionRequest::new("L2", DepletionType::Mortality, as_of(), 0),
            DepletionRequest::new("L2", DepletionType::Sales, as_of(), 20),
            // FIFO 携带人工批次列表
            DepletionRequest::manual(
                "L2",
                DepletionType::Culling,
                as_of(),
                vec![ManualBatchSelection::new(old_batch("L2"), 5)],
            )
            .with_method(DepletionMethod::Fifo),
            // 超出批次可用数量
            DepletionRequest::manual(
                "L2",
                DepletionType::Mortality,
                as_of(),
                vec![ManualBatchSelection::new(young_batch("L2"), 80)],
            ),
        ];

        let bulk = state.depletion_api.process_bulk_depletion(&requests).unwrap();

        assert_eq!(bulk.total_processed, 5);
        assert_eq!(bulk.success_count, 2);
        assert_eq!(bulk.error_count, 3);
        assert_eq!(bulk.failed_indices(), vec![1, 3, 4]);
        assert!((bulk.success_rate - 40.0).abs() < 1e-9);

        let codes: Vec<&str> = [1, 3, 4]
            .iter()
            .map(|&i| {
                let item = &bulk.results[i];
                assert_eq!(item.status, BulkItemStatus::Failed);
                item.error.as_ref().unwrap().code.as_str()
            })
            .collect();
        assert_eq!(
            codes,
            vec!["VALIDATION_ERROR", "VALIDATION_ERROR", "INSUFFICIENT_QUANTITY"]
        );

        // 第1、3条已完整提交,失败条目无任何写入
        assert_eq!(bulk.results[0].total_depleted, Some(10));
        assert_eq!(bulk.results[2].total_depleted, Some(20));
        assert_eq!(current_stock(&state, "L1"), 140);
        assert_eq!(current_stock(&state, "L2"), 130);
        assert_eq!(batch_available(&state, &young_batch("L2")), 50);
        assert_eq!(batch_available(&state, &old_batch("L2")), 80);
    }

    #[test]
    fn test_bulk_rejects_empty_list() {
        let (_temp_file, state) = create_test_state();
        let err = state.depletion_api.process_bulk_depletion(&[]).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
