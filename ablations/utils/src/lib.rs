//! 消融实验依赖的通用组件.

use std::env;

pub mod phantom;

const SEP: &str = "--------------------------------------------------------";

/// 向 `w` 写入一行简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 获取参与实验的合成参数图个数.
///
/// 1. 若环境变量 `$ROI_PHANTOMS` 是正整数, 则返回其值;
/// 2. 否则, 返回 `default`.
pub fn phantom_count_from_env_or(default: usize) -> usize {
    env::var("ROI_PHANTOMS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
