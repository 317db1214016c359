use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{SWEEP_INTERVAL, millis};
use crate::clock::Clock;

pub const MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const LOCKOUT_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    count: u32,
    last_attempt: i64,
}

#[derive(Debug, Default)]
struct Attempts {
    records: HashMap<String, AttemptRecord>,
    last_sweep: i64,
}

/// 登录失败锁定：窗口内连续失败达到阈值即锁定该标识
///
/// 记录在访问时过期，没有后台清理任务。标识来自请求方，为避免表无限增长，
/// 记录失败时最多每 [`SWEEP_INTERVAL`] 顺带清掉一次全部过期记录。
pub struct AttemptLimiter {
    attempts: Mutex<Attempts>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    lockout: Duration,
}

impl AttemptLimiter {
    pub fn new(clock: Arc<dyn Clock>, max_attempts: u32, lockout: Duration) -> Self {
        Self {
            attempts: Mutex::new(Attempts::default()),
            clock,
            max_attempts,
            lockout,
        }
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, MAX_LOGIN_ATTEMPTS, LOCKOUT_WINDOW)
    }

    pub fn is_blocked(&self, identifier: &str) -> bool {
        let now = self.clock.now_millis();
        let mut attempts = self.lock();
        let Some(record) = attempts.records.get(identifier).copied() else {
            return false;
        };

        if self.expired(&record, now) {
            attempts.records.remove(identifier);
            return false;
        }

        record.count >= self.max_attempts
    }

    pub fn record_attempt(&self, identifier: &str, success: bool) {
        let now = self.clock.now_millis();
        let mut attempts = self.lock();

        if success {
            attempts.records.remove(identifier);
            return;
        }

        self.sweep(&mut attempts, now);

        let fresh = AttemptRecord {
            count: 0,
            last_attempt: now,
        };
        let record = attempts
            .records
            .entry(identifier.to_string())
            .or_insert(fresh);
        if self.expired(record, now) {
            *record = fresh;
        }
        record.count += 1;
        record.last_attempt = now;

        if record.count >= self.max_attempts {
            tracing::warn!(
                "Identifier {} locked out after {} failed attempts",
                identifier,
                record.count
            );
        }
    }

    pub fn remaining_time(&self, identifier: &str) -> Duration {
        let now = self.clock.now_millis();
        let attempts = self.lock();
        let Some(record) = attempts.records.get(identifier) else {
            return Duration::ZERO;
        };

        let elapsed = now.saturating_sub(record.last_attempt);
        let remaining = millis(self.lockout).saturating_sub(elapsed);
        Duration::from_millis(remaining.max(0) as u64)
    }

    /// 当前保存的记录数
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // 恰好满一个锁定窗口即视为过期
    fn expired(&self, record: &AttemptRecord, now: i64) -> bool {
        now.saturating_sub(record.last_attempt) >= millis(self.lockout)
    }

    fn sweep(&self, attempts: &mut Attempts, now: i64) {
        if now.saturating_sub(attempts.last_sweep) < millis(SWEEP_INTERVAL) {
            return;
        }
        attempts.last_sweep = now;
        let before = attempts.records.len();
        attempts
            .records
            .retain(|_, record| now.saturating_sub(record.last_attempt) < millis(self.lockout));
        let dropped = before - attempts.records.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} expired login attempt records", dropped);
        }
    }

    // 临界区内不会 panic，锁中毒时直接取回数据
    fn lock(&self) -> MutexGuard<'_, Attempts> {
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
