//! ROI 搜索配置.

use std::ops::RangeInclusive;

use itertools::iproduct;

use crate::consts::DEFAULT_ALLOWED_OUTSIDE;
use crate::data::{MaskCheck, Mask3D, WindowShape};
use crate::error::{RoiError, SearchResult};
use crate::score::{Containment, ScoreConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 最终 ROI 左上角的提取方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CornerStrategy {
    /// 取最终分数图中行优先顺序下第一个非零体素.
    ///
    /// 仅当分数图恰好只有一个连通的非零区域时结果才有意义.
    FirstNonzero,

    /// 取最终扫描中得分最高的候选窗口的原点.
    #[default]
    ArgMax,
}

/// ROI 搜索配置. 一次构建, 之后只读.
///
/// 若要修改某一项, 使用 `with_*` 系列方法创建新的实例.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchConfig {
    depth: (usize, usize),
    side: (usize, usize),
    n_rois: usize,
    roi_shape: WindowShape,
    score: ScoreConfig,
    search_containment: Containment,
    final_containment: Containment,
    corner: CornerStrategy,
    allowed_outside: f64,
}

impl Default for SearchConfig {
    /// 深度 2..=3, 边长 10..=10, 每个窗口形状保留 500 个候选, 目标 ROI 形状 (1, 5, 5).
    fn default() -> Self {
        Self {
            depth: (2, 3),
            side: (10, 10),
            n_rois: 500,
            roi_shape: WindowShape::new_unchecked([1, 5, 5]),
            score: ScoreConfig::default(),
            search_containment: Containment::Lenient,
            final_containment: Containment::Strict,
            corner: CornerStrategy::default(),
            allowed_outside: DEFAULT_ALLOWED_OUTSIDE,
        }
    }
}

#[inline]
fn check_range(r: &RangeInclusive<usize>, what: &'static str) -> SearchResult<(usize, usize)> {
    let (lo, hi) = (*r.start(), *r.end());
    if lo == 0 || lo > hi {
        return Err(RoiError::InvalidConfig(what));
    }
    Ok((lo, hi))
}

impl SearchConfig {
    /// 构建搜索配置.
    ///
    /// `depth` 和 `side` 必须非空且下限为正, `n_rois` 必须为正, 否则返回
    /// `Err(RoiError::InvalidConfig)`. 其余项取默认值.
    pub fn new(
        depth: RangeInclusive<usize>,
        side: RangeInclusive<usize>,
        n_rois: usize,
        roi_shape: WindowShape,
    ) -> SearchResult<Self> {
        let depth = check_range(&depth, "depth range must be non-empty and positive")?;
        let side = check_range(&side, "side range must be non-empty and positive")?;
        if n_rois == 0 {
            return Err(RoiError::InvalidConfig("n_rois must be positive"));
        }
        Ok(Self {
            depth,
            side,
            n_rois,
            roi_shape,
            ..Self::default()
        })
    }

    /// 替换评分规则参数.
    #[inline]
    pub fn with_score_config(self, score: ScoreConfig) -> Self {
        Self { score, ..self }
    }

    /// 替换多尺度搜索阶段使用的包含策略.
    #[inline]
    pub fn with_search_containment(self, search_containment: Containment) -> Self {
        Self {
            search_containment,
            ..self
        }
    }

    /// 替换最终定位阶段使用的包含策略.
    #[inline]
    pub fn with_final_containment(self, final_containment: Containment) -> Self {
        Self {
            final_containment,
            ..self
        }
    }

    /// 替换左上角提取方式.
    #[inline]
    pub fn with_corner_strategy(self, corner: CornerStrategy) -> Self {
        Self { corner, ..self }
    }

    /// 替换参考掩膜允许位于容器外的比例. 必须位于 `[0, 1]`.
    pub fn with_allowed_outside(self, allowed_outside: f64) -> SearchResult<Self> {
        if !(0.0..=1.0).contains(&allowed_outside) {
            return Err(RoiError::InvalidConfig("allowed outside fraction must be in [0, 1]"));
        }
        Ok(Self {
            allowed_outside,
            ..self
        })
    }

    /// 窗口深度范围.
    #[inline]
    pub fn depth(&self) -> RangeInclusive<usize> {
        self.depth.0..=self.depth.1
    }

    /// 窗口边长范围.
    #[inline]
    pub fn side(&self) -> RangeInclusive<usize> {
        self.side.0..=self.side.1
    }

    /// 每个窗口形状保留的候选个数.
    #[inline]
    pub fn n_rois(&self) -> usize {
        self.n_rois
    }

    /// 目标 ROI 形状.
    #[inline]
    pub fn roi_shape(&self) -> WindowShape {
        self.roi_shape
    }

    /// 评分规则参数.
    #[inline]
    pub fn score_config(&self) -> &ScoreConfig {
        &self.score
    }

    /// 多尺度搜索阶段的包含策略.
    #[inline]
    pub fn search_containment(&self) -> Containment {
        self.search_containment
    }

    /// 最终定位阶段的包含策略.
    #[inline]
    pub fn final_containment(&self) -> Containment {
        self.final_containment
    }

    /// 左上角提取方式.
    #[inline]
    pub fn corner_strategy(&self) -> CornerStrategy {
        self.corner
    }

    /// 参考掩膜允许位于容器外的比例.
    #[inline]
    pub fn allowed_outside(&self) -> f64 {
        self.allowed_outside
    }

    /// 参与多尺度搜索的全部窗口形状. 外层遍历边长, 内层遍历深度.
    pub fn window_shapes(&self) -> Vec<WindowShape> {
        iproduct!(self.side(), self.depth())
            .filter_map(|(side, depth)| WindowShape::square(depth, side))
            .collect()
    }

    /// 以 `container` 为容器检查参考掩膜时使用的校验项.
    #[inline]
    pub fn mask_check<'a>(&self, container: &'a Mask3D) -> MaskCheck<'a> {
        MaskCheck::default().with_container(container, self.allowed_outside)
    }
}
