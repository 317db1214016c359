use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{SWEEP_INTERVAL, millis};
use crate::clock::Clock;

#[derive(Debug, Default)]
struct History {
    window: i64,
    stamps: VecDeque<i64>,
}

impl History {
    fn prune(&mut self, now: i64) {
        let window_start = now.saturating_sub(self.window);
        while self.stamps.front().is_some_and(|&t| t <= window_start) {
            self.stamps.pop_front();
        }
    }
}

#[derive(Debug, Default)]
struct Requests {
    histories: HashMap<String, History>,
    last_sweep: i64,
}

/// 滑动窗口计数，每个键保存窗口内的请求时间戳
///
/// 键来自请求方（IP、邮箱等）。历史清空的键会被移除，长时间不再访问的键
/// 由最多每 [`SWEEP_INTERVAL`] 一次的顺带清理回收。
pub struct SlidingWindowLimiter {
    requests: Mutex<Requests>,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            requests: Mutex::new(Requests::default()),
            clock,
        }
    }

    /// 未超限时记录本次请求并返回 true；超限时不记录
    pub fn is_allowed(&self, key: &str, max_requests: usize, window: Duration) -> bool {
        let now = self.clock.now_millis();
        let mut requests = self.lock();
        Self::sweep(&mut requests, now);

        let history = requests.histories.entry(key.to_string()).or_default();
        history.window = millis(window);
        history.prune(now);

        if history.stamps.len() >= max_requests {
            if history.stamps.is_empty() {
                requests.histories.remove(key);
            }
            return false;
        }

        history.stamps.push_back(now);
        true
    }

    pub fn clear(&self, key: &str) {
        self.lock().histories.remove(key);
    }

    /// 最早一次计数离开窗口前的剩余时间
    pub fn remaining_time(&self, key: &str, window: Duration) -> Duration {
        let now = self.clock.now_millis();
        let requests = self.lock();
        let Some(&oldest) = requests
            .histories
            .get(key)
            .and_then(|h| h.stamps.front())
        else {
            return Duration::ZERO;
        };

        let remaining = millis(window).saturating_sub(now.saturating_sub(oldest));
        Duration::from_millis(remaining.max(0) as u64)
    }

    /// 当前跟踪的键数
    pub fn len(&self) -> usize {
        self.lock().histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(requests: &mut Requests, now: i64) {
        if now.saturating_sub(requests.last_sweep) < millis(SWEEP_INTERVAL) {
            return;
        }
        requests.last_sweep = now;
        requests.histories.retain(|_, history| {
            history.prune(now);
            !history.stamps.is_empty()
        });
    }

    fn lock(&self) -> MutexGuard<'_, Requests> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
