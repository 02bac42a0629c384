// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证同一牲畜群并发减员不会超扣,提交后事件发布
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_control_test {
    use std::error::Error;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use livestock_depletion::app::AppState;
    use livestock_depletion::domain::depletion::DepletionRequest;
    use livestock_depletion::domain::types::DepletionType;
    use livestock_depletion::engine::{
        DepletionEvent, DepletionEventPublisher, DepletionEventType, OptionalEventPublisher,
    };
    use tempfile::NamedTempFile;

    use crate::test_helpers::*;

    // ==========================================
    // 测试辅助
    // ==========================================

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<DepletionEvent>>,
    }

    impl DepletionEventPublisher for RecordingPublisher {
        fn publish(&self, event: DepletionEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok(String::new())
        }
    }

    struct FailingPublisher;

    impl DepletionEventPublisher for FailingPublisher {
        fn publish(&self, _event: DepletionEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            Err("notification bridge down".into())
        }
    }

    fn state_with_publisher(publisher: Arc<dyn DepletionEventPublisher>) -> (NamedTempFile, AppState) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let state =
            AppState::with_event_publisher(db_path, OptionalEventPublisher::with_publisher(publisher))
                .unwrap();
        (temp_file, state)
    }

    // ==========================================
    // 测试1: 同一牲畜群并发减员
    // ==========================================

    #[test]
    fn test_concurrent_depletion_never_overdraws() {
        let (_temp_file, state) = create_test_state();
        seed_two_batch_livestock(&state, "L1");
        let state = Arc::new(state);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    state.depletion_api.process_depletion(&DepletionRequest::new(
                        "L1",
                        DepletionType::Mortality,
                        as_of(),
                        20,
                    ))
                })
            })
            .collect();

        let mut success = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => success += 1,
                Err(e) => {
                    assert_eq!(e.code(), "INSUFFICIENT_QUANTITY");
                    insufficient += 1;
                }
            }
        }

        // 150 头最多扣 7 次 × 20
        assert_eq!(success, 7);
        assert_eq!(insufficient, 3);
        assert_eq!(current_stock(&state, "L1"), 10);
        assert_eq!(counter_stock(&state, "L1"), 10);
        assert_eq!(state.repos.livestock_repo.sum_available("L1").unwrap(), 10);
    }

    // ==========================================
    // 测试2: 不同牲畜群并发互不影响
    // ==========================================

    #[test]
    fn test_concurrent_livestocks_independent() {
        let (_temp_file, state) = create_test_state();
        for id in ["L1", "L2", "L3"] {
            seed_two_batch_livestock(&state, id);
        }
        let state = Arc::new(state);

        let handles: Vec<_> = ["L1", "L2", "L3"]
            .into_iter()
            .map(|id| {
                let state = state.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        state
                            .depletion_api
                            .process_depletion(&DepletionRequest::new(
                                id,
                                DepletionType::Sales,
                                as_of(),
                                10,
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in ["L1", "L2", "L3"] {
            assert_eq!(current_stock(&state, id), 100);
        }
        assert_eq!(state.locks.len(), 3);
    }

    // ==========================================
    // 测试3: 提交后事件发布
    // ==========================================

    #[test]
    fn test_events_published_after_commit() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (_temp_file, state) = state_with_publisher(publisher.clone());
        seed_two_batch_livestock(&state, "L1");

        let committed = state
            .depletion_api
            .process_depletion(&DepletionRequest::new(
                "L1",
                DepletionType::Mortality,
                as_of(),
                5,
            ))
            .unwrap();
        state
            .depletion_api
            .reverse_depletion(&committed.record_id, "koreksi")
            .unwrap();
        // 失败的提交不发布事件
        state
            .depletion_api
            .process_depletion(&DepletionRequest::new(
                "L1",
                DepletionType::Mortality,
                as_of(),
                500,
            ))
            .unwrap_err();

        let events = publisher.events.lock().unwrap();
        let kinds: Vec<DepletionEventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            kinds,
            vec![
                DepletionEventType::DepletionCommitted,
                DepletionEventType::DepletionReversed
            ]
        );
        assert!(events.iter().all(|e| e.record_id == committed.record_id));
    }

    #[test]
    fn test_publisher_failure_does_not_fail_commit() {
        let (_temp_file, state) = state_with_publisher(Arc::new(FailingPublisher));
        seed_two_batch_livestock(&state, "L1");

        let result = state.depletion_api.process_depletion(&DepletionRequest::new(
            "L1",
            DepletionType::Mortality,
            as_of(),
            5,
        ));
        assert!(result.is_ok());
        assert_eq!(current_stock(&state, "L1"), 145);
    }
}
