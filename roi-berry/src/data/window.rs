//! 轴对齐的三维窗口.

use ndarray::{s, ArrayView3};

use super::iter::OriginIter;
use super::mask::Mask3D;
use crate::error::{RoiError, SearchResult};
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 三维窗口形状 (深度, 高, 宽). 每个分量都为正.
///
/// 该结构是只读的. 若要修改窗口形状, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowShape {
    extent: [usize; 3],
}

impl WindowShape {
    /// 构建窗口形状. 任一分量为 0 时返回 `None`.
    pub fn new(depth: usize, height: usize, width: usize) -> Option<Self> {
        (depth > 0 && height > 0 && width > 0).then_some(Self {
            extent: [depth, height, width],
        })
    }

    #[inline]
    pub(crate) const fn new_unchecked(extent: [usize; 3]) -> Self {
        Self { extent }
    }

    /// 构建深度为 `depth`, 水平方向为 `side * side` 正方形的窗口形状.
    #[inline]
    pub fn square(depth: usize, side: usize) -> Option<Self> {
        Self::new(depth, side, side)
    }

    /// 各分量.
    #[inline]
    pub fn extent(&self) -> [usize; 3] {
        self.extent
    }

    /// 深度.
    #[inline]
    pub fn depth(&self) -> usize {
        self.extent[0]
    }

    /// 高.
    #[inline]
    pub fn height(&self) -> usize {
        self.extent[1]
    }

    /// 宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.extent[2]
    }

    /// 窗口所含体素个数.
    #[inline]
    pub fn voxels(&self) -> usize {
        self.extent.iter().product()
    }

    /// 窗口能否完整放入空间形状 `shape` 中?
    #[inline]
    pub fn fits(&self, (z, h, w): Idx3d) -> bool {
        let [d0, d1, d2] = self.extent;
        d0 <= z && d1 <= h && d2 <= w
    }

    /// 在空间形状 `shape` 中, 所有合法窗口原点组成的形状
    /// (每个轴上为 `shape - extent + 1`).
    ///
    /// 窗口无法放入时返回 `Err(RoiError::InvalidWindow)`.
    pub fn origins_in(&self, shape: Idx3d) -> SearchResult<Idx3d> {
        if !self.fits(shape) {
            return Err(RoiError::InvalidWindow {
                window: self.extent,
                bounds: [shape.0, shape.1, shape.2],
            });
        }
        let [d0, d1, d2] = self.extent;
        Ok((shape.0 - d0 + 1, shape.1 - d1 + 1, shape.2 - d2 + 1))
    }

    /// 以 `origin` 为起点, 在 `view` 上截取该形状的窗口视图.
    ///
    /// 窗口越界时 panic.
    #[inline]
    pub fn view_at<'a, T>(&self, view: &ArrayView3<'a, T>, (z, h, w): Idx3d) -> ArrayView3<'a, T> {
        let [d0, d1, d2] = self.extent;
        view.clone().slice_move(s![z..z + d0, h..h + d1, w..w + d2])
    }
}

/// 多维滑动窗口迭代器.
///
/// 依次产生 `(窗口中心, 窗口视图)`. 窗口不会越过图像边缘. 若提供了 `mask`,
/// 则中心未被选中的窗口会被跳过. 中心定义为 `origin + extent / 2`.
///
/// 若窗口无法放入 `view`, 返回 `Err(RoiError::InvalidWindow)`;
/// 若 `mask` 与 `view` 形状不一致, 返回 `Err(RoiError::ShapeMismatch)`.
pub fn sliding_windows<'a, T: 'a>(
    view: ArrayView3<'a, T>,
    shape: WindowShape,
    mask: Option<&'a Mask3D>,
) -> SearchResult<impl Iterator<Item = (Idx3d, ArrayView3<'a, T>)> + 'a> {
    let dim = view.dim();
    let origins = shape.origins_in(dim)?;
    if let Some(m) = mask {
        m.check_shape(dim)?;
    }
    let [d0, d1, d2] = shape.extent();
    Ok(OriginIter::new(origins).filter_map(move |(z, h, w)| {
        let center = (z + d0 / 2, h + d1 / 2, w + d2 / 2);
        match mask {
            Some(m) if !m[center] => None,
            _ => Some((center, shape.view_at(&view, (z, h, w)))),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_window_shape_invalid_input() {
        assert!(WindowShape::new(0, 1, 1).is_none());
        assert!(WindowShape::new(1, 0, 1).is_none());
        assert!(WindowShape::square(1, 0).is_none());
        assert!(WindowShape::new(1, 1, 1).is_some());
    }

    #[test]
    fn test_origins_in() {
        let w = WindowShape::new(1, 2, 2).unwrap();
        assert_eq!(w.origins_in((3, 10, 10)).unwrap(), (3, 9, 9));
        assert_eq!(w.origins_in((1, 2, 2)).unwrap(), (1, 1, 1));
        assert!(matches!(
            w.origins_in((1, 1, 10)),
            Err(RoiError::InvalidWindow { .. })
        ));
        assert_eq!(w.voxels(), 4);
    }

    #[test]
    fn test_sliding_windows_stay_in_bounds() {
        let a = Array3::from_shape_fn((4, 5, 6), |(z, h, w)| (z * 100 + h * 10 + w) as f64);
        let shape = WindowShape::new(2, 3, 2).unwrap();
        let mut n = 0;
        for (center, win) in sliding_windows(a.view(), shape, None).unwrap() {
            assert_eq!(win.dim(), (2, 3, 2));
            let (z, h, w) = (center.0 - 1, center.1 - 1, center.2 - 1);
            assert_eq!(win[(0, 0, 0)], a[(z, h, w)]);
            n += 1;
        }
        assert_eq!(n, 3 * 3 * 5);
    }

    #[test]
    fn test_sliding_windows_with_mask() {
        let a = Array3::<f64>::zeros((1, 4, 4));
        let mut m = Array3::from_elem((1, 4, 4), false);
        m[(0, 1, 1)] = true;
        m[(0, 2, 2)] = true;
        let mask = Mask3D::new(m);
        let shape = WindowShape::new(1, 2, 2).unwrap();
        let centers: Vec<_> = sliding_windows(a.view(), shape, Some(&mask))
            .unwrap()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(centers, vec![(0, 1, 1), (0, 2, 2)]);

        let wrong = Mask3D::new(Array3::from_elem((1, 3, 3), true));
        assert!(matches!(
            sliding_windows(a.view(), shape, Some(&wrong)),
            Err(RoiError::ShapeMismatch { .. })
        ));
    }
}
