//! 最终 ROI 定位.

use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{self, AtomicBool};

use ndarray::{s, Array3, ArrayView3};
use ndarray_npy::WriteNpyError;

use super::aggregate::{multi_scale_scoremap, scoremap_with_candidates};
use crate::config::{CornerStrategy, SearchConfig};
use crate::consts::BANNED_SCORE;
use crate::data::{Mask, Mask3D, Subregion, Volume, WindowShape};
use crate::error::{RoiError, SearchResult};
use crate::score::Containment;
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ROI 搜索结果. 创建后只读.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoiResult {
    corner: Idx3d,
    shape: WindowShape,
    score: f64,
    scoremap: Array3<f64>,
}

impl RoiResult {
    /// ROI 的起始角 (深度, 高, 宽).
    #[inline]
    pub fn corner(&self) -> Idx3d {
        self.corner
    }

    /// ROI 形状.
    #[inline]
    pub fn shape(&self) -> WindowShape {
        self.shape
    }

    /// 各轴上的左闭右开区间 `[corner, corner + extent)`.
    pub fn coords(&self) -> [(usize, usize); 3] {
        let (z, h, w) = self.corner;
        let [d0, d1, d2] = self.shape.extent();
        [(z, z + d0), (h, h + d1), (w, w + d2)]
    }

    /// 最终扫描中被选中窗口的综合分数.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// 产生该结果的多尺度汇总分数图, 与输入图像空间形状一致.
    #[inline]
    pub fn scoremap(&self) -> ArrayView3<f64> {
        self.scoremap.view()
    }

    /// ROI 对应的子区域.
    #[inline]
    pub fn subregion(&self) -> Subregion {
        Subregion::from_window(self.corner, self.shape)
    }

    /// 将 ROI 转换为与输入图像同形的三维掩膜.
    pub fn to_mask3d(&self) -> Mask3D {
        let [(z0, z1), (y0, y1), (x0, x1)] = self.coords();
        let mut data = Array3::from_elem(self.scoremap.dim(), false);
        data.slice_mut(s![z0..z1, y0..y1, x0..x1]).fill(true);
        Mask3D::new(data)
    }

    /// ROI 第一个切片上的二维掩膜, 可直接写为文本格式.
    pub fn roi_slice_mask(&self) -> SearchResult<Mask> {
        self.to_mask3d().slice_mask(self.corner.0)
    }

    /// 将汇总分数图写入 npy 文件.
    pub fn save_scoremap<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        ndarray_npy::write_npy(path, &self.scoremap)
    }
}

/// 在 `volume` 中搜索得分最高的 ROI.
///
/// 若提供了 `mask` (如前列腺掩膜), 则多尺度搜索阶段与最终定位阶段分别按
/// `config` 中的包含策略限制候选窗口.
///
/// # 返回值
///
/// - `mask` 与 `volume` 形状不一致时返回 `Err(RoiError::ShapeMismatch)`;
/// - `mask` 为空时返回 `Err(RoiError::EmptyMask)`;
/// - 任一窗口形状无法放入 `volume` 时返回 `Err(RoiError::InvalidWindow)`;
/// - 所有候选都被禁止或分数都非有限时返回 `Err(RoiError::NoCandidate)`.
///
/// 以上错误 (除最后一种) 都在计算开始前发现.
#[inline]
pub fn find_roi(volume: &Volume, config: &SearchConfig, mask: Option<&Mask3D>) -> SearchResult<RoiResult> {
    find_roi_with_cancel(volume, config, mask, &AtomicBool::new(false))
}

/// 为 `volume` 追加包含通道. 没有掩膜时直接借用.
fn with_containment<'a>(
    volume: &'a Volume,
    mask: Option<&Mask3D>,
    policy: Containment,
) -> SearchResult<Cow<'a, Volume>> {
    match mask {
        Some(m) => Ok(Cow::Owned(
            volume.with_channel(policy.param_name(), m.to_values().view())?,
        )),
        None => Ok(Cow::Borrowed(volume)),
    }
}

/// 同 [`find_roi`], 但每处理一个窗口形状前检查 `cancel`.
/// `cancel` 被置位时返回 `Err(RoiError::Cancelled)`, 不产生部分结果.
pub fn find_roi_with_cancel(
    volume: &Volume,
    config: &SearchConfig,
    mask: Option<&Mask3D>,
    cancel: &AtomicBool,
) -> SearchResult<RoiResult> {
    let shape = volume.shape();
    if let Some(m) = mask {
        m.check_shape(shape)?;
        m.ensure_selected()?;
    }
    let shapes = config.window_shapes();
    for w in shapes.iter().chain([config.roi_shape()].iter()) {
        w.origins_in(shape)?;
    }
    log::info!(
        "Searching ROI {:?} in {:?} over {} window shapes, channels {:?}",
        config.roi_shape().extent(),
        shape,
        shapes.len(),
        volume.names()
    );

    let search = with_containment(volume, mask, config.search_containment())?;
    let scoremap = multi_scale_scoremap(
        &search,
        &shapes,
        config.n_rois(),
        config.score_config(),
        cancel,
    )?;

    if cancel.load(atomic::Ordering::Relaxed) {
        return Err(RoiError::Cancelled);
    }
    let summary = Volume::from_scoremap(scoremap.clone(), volume.spacing())?;
    let summary = with_containment(&summary, mask, config.final_containment())?;
    let (roimap, top) =
        scoremap_with_candidates(&summary, config.roi_shape(), 1, config.score_config())?;

    let best = top.first().ok_or(RoiError::NoCandidate)?;
    if best.score() <= BANNED_SCORE / 2.0 {
        return Err(RoiError::NoCandidate);
    }
    let corner = match config.corner_strategy() {
        CornerStrategy::ArgMax => best.origin(),
        CornerStrategy::FirstNonzero => roimap
            .indexed_iter()
            .find_map(|(pos, v)| (*v != 0.0).then_some(pos))
            .ok_or(RoiError::NoCandidate)?,
    };
    log::info!("ROI found at {corner:?}, score {}", best.score());

    Ok(RoiResult {
        corner,
        shape: config.roi_shape(),
        score: best.score(),
        scoremap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn init_logger() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
    }

    /// 2 x 20 x 20 的分数图. 区块 A (值 5) 位于 y 8..13, x 4..9;
    /// 区块 B (值 9) 位于 y 0..5, x 14..19. 两个区块都贯穿所有切片.
    fn two_blocks() -> Volume {
        let data = Array4::from_shape_fn((2, 20, 20, 1), |(_, h, w, _)| {
            if (8..13).contains(&h) && (4..9).contains(&w) {
                5.0
            } else if (0..5).contains(&h) && (14..19).contains(&w) {
                9.0
            } else {
                1.0
            }
        });
        Volume::new(data, vec!["score".to_string()], [3.0, 0.5, 0.5]).unwrap()
    }

    /// 覆盖区块 A, 不覆盖区块 B 的掩膜.
    fn mask_around_a() -> Mask3D {
        let mut a = Array3::from_elem((2, 20, 20), false);
        a.slice_mut(s![.., 6..16, 2..12]).fill(true);
        Mask3D::new(a)
    }

    fn config() -> SearchConfig {
        let roi = WindowShape::new(1, 5, 5).unwrap();
        SearchConfig::new(1..=2, 5..=5, 5, roi).unwrap()
    }

    #[test]
    fn test_dominant_region() {
        init_logger();
        let v = two_blocks();
        let r = find_roi(&v, &config(), None).unwrap();
        assert_eq!(r.corner(), (0, 0, 14));
        assert_eq!(r.coords(), [(0, 1), (0, 5), (14, 19)]);
        assert_eq!(r.scoremap().dim(), (2, 20, 20));
        assert!(r.score() > 0.0);

        let first = config().with_corner_strategy(CornerStrategy::FirstNonzero);
        assert_eq!(find_roi(&v, &first, None).unwrap().corner(), (0, 0, 14));
    }

    #[test]
    fn test_mask_constrains_search() {
        init_logger();
        let v = two_blocks();
        let mask = mask_around_a();
        let r = find_roi(&v, &config(), Some(&mask)).unwrap();
        assert_eq!(r.corner(), (0, 8, 4));

        let roi = r.to_mask3d();
        assert_eq!(roi.n_selected(), 25);
        assert_eq!(roi.n_outside(&mask).unwrap(), 0);
        assert_eq!(r.subregion().as_flat(), [0, 1, 8, 13, 4, 9]);

        let slice = r.roi_slice_mask().unwrap();
        assert_eq!(slice.slice(), 1);
        assert_eq!(slice.n_selected(), 25);
    }

    #[test]
    fn test_fatal_inputs() {
        let v = two_blocks();
        let wrong = Mask3D::new(Array3::from_elem((2, 20, 19), true));
        assert!(matches!(
            find_roi(&v, &config(), Some(&wrong)),
            Err(RoiError::ShapeMismatch { .. })
        ));

        let empty = Mask3D::new(Array3::from_elem((2, 20, 20), false));
        assert!(matches!(
            find_roi(&v, &config(), Some(&empty)),
            Err(RoiError::EmptyMask)
        ));

        let deep = SearchConfig::new(1..=3, 5..=5, 5, WindowShape::new(1, 5, 5).unwrap()).unwrap();
        assert!(matches!(
            find_roi(&v, &deep, None),
            Err(RoiError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_no_window_fits_strictly() {
        let v = two_blocks();
        let mut a = Array3::from_elem((2, 20, 20), false);
        a.slice_mut(s![.., 0..3, 0..3]).fill(true);
        let tiny = Mask3D::new(a);
        assert!(matches!(
            find_roi(&v, &config(), Some(&tiny)),
            Err(RoiError::NoCandidate)
        ));
    }

    #[test]
    fn test_cancelled() {
        let v = two_blocks();
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            find_roi_with_cancel(&v, &config(), None, &cancel),
            Err(RoiError::Cancelled)
        ));
    }
}
