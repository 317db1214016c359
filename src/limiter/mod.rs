// 限流
// 登录失败锁定与滑动窗口限流都只保存在内存中，进程重启后清零

use std::time::Duration;

mod attempts;
mod operation;
mod window;

pub use attempts::{AttemptLimiter, LOCKOUT_WINDOW, MAX_LOGIN_ATTEMPTS};
pub use operation::{Limit, Operation, OperationRateLimiter};
pub use window::SlidingWindowLimiter;

/// 两次清理过期记录之间的最短间隔
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// 转为毫秒，超出 i64 时取上限
fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
