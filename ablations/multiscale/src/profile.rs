//! 搜索运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以微秒为单位).
    #[inline]
    fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

/// ablation/benchmark 数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// ROI 与病灶相交的次数.
    hits: u64,

    /// ROI 与病灶不相交的次数.
    misses: u64,

    /// 搜索返回错误的次数.
    failures: u64,

    /// 搜索花费的总时间.
    search_time: AccTimer,

    /// 整个任务花费的总时间 (包括生成参数图以外的全部开销).
    real_time: AccTimer,

    /// 最耗时的一次搜索.
    slowest: Option<Duration>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            failures: 0,
            search_time: AccTimer::new(),
            real_time: AccTimer::new(),
            slowest: None,
        }
    }

    /// 开始一次搜索计时.
    #[inline]
    pub fn start(&mut self) {
        self.search_time.start();
    }

    /// 结束一次搜索计时.
    #[inline]
    pub fn elapsed(&mut self) {
        let d = self.search_time.elapsed();
        self.slowest = Some(self.slowest.map_or(d, |s| s.max(d)));
    }

    /// 记录一次命中.
    #[inline]
    pub fn count_hit(&mut self) {
        self.hits += 1;
    }

    /// 记录一次未命中.
    #[inline]
    pub fn count_miss(&mut self) {
        self.misses += 1;
    }

    /// 记录一次失败.
    #[inline]
    pub fn count_failure(&mut self) {
        self.failures += 1;
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 命中次数.
    #[inline]
    pub fn get_hits(&self) -> u64 {
        self.hits
    }

    /// 未命中次数.
    #[inline]
    pub fn get_misses(&self) -> u64 {
        self.misses
    }

    /// 失败次数.
    #[inline]
    pub fn get_failures(&self) -> u64 {
        self.failures
    }

    #[inline]
    fn runs(&self) -> u64 {
        self.hits + self.misses + self.failures
    }

    /// 命中率. 没有任何搜索时返回 `None`.
    #[inline]
    pub fn get_hit_rate(&self) -> Option<f64> {
        match self.runs() {
            0 => None,
            n => Some(self.hits as f64 / n as f64),
        }
    }

    /// 以微秒为单位获得搜索的总花费自然时间.
    #[inline]
    pub fn get_search_time_us(&self) -> u64 {
        self.search_time.get_total_us()
    }

    /// 以微秒为单位获得单次搜索的平均时间.
    #[inline]
    pub fn get_avg_search_time_us(&self) -> Option<f64> {
        match self.runs() {
            0 => None,
            n => Some(self.get_search_time_us() as f64 / n as f64),
        }
    }

    /// 以微秒为单位获得运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 获取最耗时的一次搜索所消耗的时间. 如果不存在搜索, 则返回 `None`.
    #[inline]
    pub fn get_slowest(&self) -> Option<Duration> {
        self.slowest
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
