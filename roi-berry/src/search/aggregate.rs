//! 分数归一化, 候选选择与累加.

use std::cmp::Ordering;
use std::sync::atomic::{self, AtomicBool};

use binary_heap_plus::BinaryHeap;
use ndarray::{s, Array3, ArrayView3, Axis};
use ordered_float::NotNan;

use super::scan::{roi_scores, ScoreMap};
use crate::data::{Volume, WindowShape};
use crate::error::{RoiError, SearchResult};
use crate::score::ScoreConfig;
use crate::Idx3d;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 逐通道除以该通道的最大值. 最大值非正或非有限的通道保持不变.
pub fn normalize_channels(scores: &mut ScoreMap) {
    for (c, mut channel) in scores.axis_iter_mut(Axis(3)).enumerate() {
        let max = channel.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
        if max > 0.0 && max.is_finite() {
            channel.mapv_inplace(|v| v / max);
        } else {
            log::warn!("Channel {c} has non-positive maximum {max}, skipped");
        }
    }
}

/// 对各通道分数求和, 得到每个原点的综合分数.
#[inline]
pub fn combine(scores: &ScoreMap) -> Array3<f64> {
    scores.sum_axis(Axis(3))
}

/// 候选窗口: 原点及其综合分数.
///
/// 排序时分数越高越大; 分数相同时原点 (行优先) 越靠前越大.
#[derive(Copy, Clone, Debug)]
pub struct Candidate {
    origin: Idx3d,
    score: NotNan<f64>,
}

impl Candidate {
    /// 窗口原点.
    #[inline]
    pub fn origin(&self) -> Idx3d {
        self.origin
    }

    /// 综合分数.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score.into_inner()
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.origin.cmp(&self.origin))
    }
}

/// 选出综合分数最高的至多 `n` 个候选, 按分数降序排列.
///
/// 非有限分数的原点不参与选择. 分数相同时保留行优先顺序下靠前的原点.
/// 这一规则只为保证结果可复现, 调用方不应依赖它.
pub fn top_candidates(combined: ArrayView3<f64>, n: usize) -> Vec<Candidate> {
    if n == 0 {
        return vec![];
    }
    // 堆顶为当前保留的最差候选.
    let mut heap: BinaryHeap<Candidate, _> =
        BinaryHeap::with_capacity_min(n.min(combined.len()));
    for (origin, &v) in combined.indexed_iter() {
        if !v.is_finite() {
            continue;
        }
        let Ok(score) = NotNan::new(v) else { continue };
        let cand = Candidate { origin, score };
        if heap.len() < n {
            heap.push(cand);
        } else if let Some(mut worst) = heap.peek_mut() {
            if cand > *worst {
                *worst = cand;
            }
        }
    }
    let mut ans = heap.into_vec();
    ans.sort_unstable_by(|a, b| b.cmp(a));
    ans
}

/// 将每个候选的分数累加到其窗口覆盖的全部体素上.
pub fn accumulate(acc: &mut Array3<f64>, shape: WindowShape, candidates: &[Candidate]) {
    let [d0, d1, d2] = shape.extent();
    for c in candidates {
        let (z, h, w) = c.origin;
        let mut win = acc.slice_mut(s![z..z + d0, h..h + d1, w..w + d2]);
        win += c.score();
    }
}

/// 单个窗口形状的完整一轮: 扫描, 归一化, 求和, 选出前 `n` 个候选并累加.
///
/// 返回与 `volume` 空间形状一致的分数图, 以及按分数降序排列的候选.
pub fn scoremap_with_candidates(
    volume: &Volume,
    shape: WindowShape,
    n: usize,
    cfg: &ScoreConfig,
) -> SearchResult<(Array3<f64>, Vec<Candidate>)> {
    let mut scores = roi_scores(volume, shape, cfg)?;
    normalize_channels(&mut scores);
    let combined = combine(&scores);
    let top = top_candidates(combined.view(), n);

    let mut acc = Array3::zeros(volume.shape());
    accumulate(&mut acc, shape, &top);
    Ok((acc, top))
}

/// 对每个窗口形状各做一轮 [`scoremap_with_candidates`], 并将分数图逐体素求和.
///
/// 每轮开始前检查 `cancel`, 已置位时返回 `Err(RoiError::Cancelled)`.
/// 打开 `rayon` feature 时各窗口形状并行计算, 各自持有私有分数图, 最后归约求和.
pub fn multi_scale_scoremap(
    volume: &Volume,
    shapes: &[WindowShape],
    n: usize,
    cfg: &ScoreConfig,
    cancel: &AtomicBool,
) -> SearchResult<Array3<f64>> {
    let pass = |shape: &WindowShape| -> SearchResult<Array3<f64>> {
        if cancel.load(atomic::Ordering::Relaxed) {
            return Err(RoiError::Cancelled);
        }
        log::debug!("Scanning window shape {:?}", shape.extent());
        let (acc, _) = scoremap_with_candidates(volume, *shape, n, cfg)?;
        Ok(acc)
    };

    #[cfg(feature = "rayon")]
    let acc = shapes
        .par_iter()
        .map(pass)
        .try_reduce(|| Array3::zeros(volume.shape()), |a, b| Ok(a + b));

    #[cfg(not(feature = "rayon"))]
    let acc = shapes
        .iter()
        .try_fold(Array3::zeros(volume.shape()), |a, s| -> SearchResult<_> {
            Ok(a + pass(s)?)
        });

    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 3 x 10 x 10, 全 1, 第 1 个切片的 3..5 行 3..5 列为 5.
    fn bright_block() -> Volume {
        let data = Array4::from_shape_fn((3, 10, 10, 1), |(z, h, w, _)| {
            if z == 1 && (3..5).contains(&h) && (3..5).contains(&w) {
                5.0
            } else {
                1.0
            }
        });
        Volume::new(data, vec!["score".to_string()], [1.0; 3]).unwrap()
    }

    #[test]
    fn test_bright_block_top_origin() {
        let v = bright_block();
        let shape = WindowShape::new(1, 2, 2).unwrap();
        let mut scores = roi_scores(&v, shape, &ScoreConfig::default()).unwrap();

        let raw = top_candidates(combine(&scores).view(), 1);
        assert_eq!(raw[0].origin(), (1, 3, 3));
        assert_eq!(raw[0].score(), 5.0);

        normalize_channels(&mut scores);
        let top = top_candidates(combine(&scores).view(), 1);
        assert_eq!(top[0].origin(), (1, 3, 3));
        assert!(float_eq(top[0].score(), 1.0));
    }

    #[test]
    fn test_normalized_max_is_one() {
        let mut scores = ScoreMap::from_shape_fn((2, 3, 4, 3), |(z, h, w, c)| {
            (z + h + w) as f64 * (c + 1) as f64 + 0.5
        });
        normalize_channels(&mut scores);
        for channel in scores.axis_iter(Axis(3)) {
            let max = channel.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
            assert!(float_eq(max, 1.0));
        }
    }

    #[test]
    fn test_normalize_skips_non_positive_channel() {
        let mut scores = ScoreMap::zeros((1, 2, 2, 3));
        scores.index_axis_mut(Axis(3), 0).fill(2.0);
        scores.index_axis_mut(Axis(3), 1).fill(-3.0);
        // 第 2 个通道全为 0.
        normalize_channels(&mut scores);
        assert!(scores.index_axis(Axis(3), 0).iter().all(|v| *v == 1.0));
        assert!(scores.index_axis(Axis(3), 1).iter().all(|v| *v == -3.0));
        assert!(scores.index_axis(Axis(3), 2).iter().all(|v| *v == 0.0));
        assert!(scores.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_top_candidates_order_and_ties() {
        let mut a = Array3::<f64>::zeros((1, 3, 3));
        a[(0, 2, 2)] = 3.0;
        a[(0, 0, 1)] = 2.0;
        a[(0, 1, 0)] = 2.0;
        a[(0, 1, 1)] = f64::NAN;
        a[(0, 0, 0)] = f64::INFINITY;
        let top = top_candidates(a.view(), 3);
        let origins: Vec<_> = top.iter().map(|c| c.origin()).collect();
        assert_eq!(origins, vec![(0, 2, 2), (0, 0, 1), (0, 1, 0)]);

        let top = top_candidates(a.view(), 2);
        assert_eq!(top[1].origin(), (0, 0, 1));

        assert_eq!(top_candidates(a.view(), 100).len(), 7);
        assert!(top_candidates(a.view(), 0).is_empty());
    }

    #[test]
    fn test_top_candidates_unbounded_n() {
        let a = Array3::<f64>::zeros((1, 3, 3));
        let top = top_candidates(a.view(), usize::MAX);
        assert_eq!(top.len(), 9);
        assert_eq!(top[0].origin(), (0, 0, 0));
        assert_eq!(top[8].origin(), (0, 2, 2));
    }

    #[test]
    fn test_accumulate_overlapping() {
        let mut acc = Array3::zeros((1, 4, 4));
        let shape = WindowShape::new(1, 2, 2).unwrap();
        let top = top_candidates(
            Array3::from_shape_vec((1, 1, 2), vec![1.0, 0.5]).unwrap().view(),
            2,
        );
        accumulate(&mut acc, shape, &top);
        assert_eq!(acc[(0, 0, 0)], 1.0);
        assert_eq!(acc[(0, 1, 1)], 1.5);
        assert_eq!(acc[(0, 0, 2)], 0.5);
        assert_eq!(acc[(0, 3, 3)], 0.0);
    }

    #[test]
    fn test_scoremap_with_candidates() {
        let v = bright_block();
        let shape = WindowShape::new(1, 2, 2).unwrap();
        let (acc, top) = scoremap_with_candidates(&v, shape, 1, &ScoreConfig::default()).unwrap();
        assert_eq!(top.len(), 1);
        assert!(float_eq(acc.sum(), 4.0));
        assert!(float_eq(acc[(1, 4, 4)], 1.0));
        assert_eq!(acc[(0, 4, 4)], 0.0);
    }

    #[test]
    fn test_multi_scale_sums_passes() {
        let v = bright_block();
        let shapes = [
            WindowShape::new(1, 2, 2).unwrap(),
            WindowShape::new(1, 1, 1).unwrap(),
        ];
        let cfg = ScoreConfig::default();
        let cancel = AtomicBool::new(false);
        let acc = multi_scale_scoremap(&v, &shapes, 1, &cfg, &cancel).unwrap();
        // 1x1 窗口的最佳原点为 (1, 3, 3), 与 2x2 窗口叠加.
        assert!(float_eq(acc[(1, 3, 3)], 2.0));
        assert!(float_eq(acc[(1, 4, 4)], 1.0));
        assert!(float_eq(acc.sum(), 5.0));

        let cancel = AtomicBool::new(true);
        assert!(matches!(
            multi_scale_scoremap(&v, &shapes, 1, &cfg, &cancel),
            Err(RoiError::Cancelled)
        ));
    }
}
