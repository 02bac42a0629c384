// ==========================================
// 牲畜减员核算系统 - 牲畜群级互斥锁
// ==========================================
// 红线: 同一牲畜群的提交/冲销/成本计算串行执行
// 说明: 预览不加锁; 不同牲畜群互不阻塞
// 说明: 锁只保护 (),持有者 panic 后中毒状态直接恢复
// ==========================================

use crate::engine::error::EngineResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct LivestockLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LivestockLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取牲畜群对应的锁（不存在则创建）
    ///
    /// 调用方持有返回的 Arc 并自行 lock()
    pub fn lock_for(&self, livestock_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(livestock_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 在牲畜群锁内执行
    pub fn with_lock<T, F>(&self, livestock_id: &str, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineResult<T>,
    {
        let lock = self.lock_for(livestock_id);
        let _guard = acquire(&lock, livestock_id);
        f()
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn acquire<'a>(lock: &'a Mutex<()>, livestock_id: &str) -> MutexGuard<'a, ()> {
    lock.lock().unwrap_or_else(|poisoned| {
        tracing::warn!(livestock_id = %livestock_id, "牲畜群锁曾被中断的持有者毒化,已恢复");
        lock.clear_poison();
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::DepletionError;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_same_livestock_shares_lock() {
        let registry = LivestockLockRegistry::new();
        let a = registry.lock_for("L001");
        let b = registry.lock_for("L001");
        let c = registry.lock_for("L002");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_held_lock_blocks_same_livestock_only() {
        let registry = LivestockLockRegistry::new();
        let lock = registry.lock_for("L001");
        let _guard = lock.lock().unwrap();

        assert!(registry.lock_for("L001").try_lock().is_err());
        assert!(registry.lock_for("L002").try_lock().is_ok());
    }

    #[test]
    fn test_with_lock_returns_closure_result() {
        let registry = LivestockLockRegistry::new();
        let value = registry.with_lock("L001", || Ok(42)).unwrap();
        assert_eq!(value, 42);

        let err = registry
            .with_lock::<(), _>("L001", || Err(DepletionError::Validation("bad".to_string())))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        // 闭包返回后锁已释放
        assert!(registry.lock_for("L001").try_lock().is_ok());
    }

    #[test]
    fn test_panic_inside_lock_does_not_block_later_calls() {
        let registry = LivestockLockRegistry::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            registry.with_lock::<(), _>("L001", || panic!("writer crashed"))
        }));
        assert!(outcome.is_err());
        assert!(registry.lock_for("L001").is_poisoned());

        let value = registry.with_lock("L001", || Ok("after")).unwrap();
        assert_eq!(value, "after");
        assert!(!registry.lock_for("L001").is_poisoned());
    }
}
