//! 二值几何掩膜.
//!
//! [`Mask`] 描述单个水平切片上的二维掩膜, 并记住其所在的切片编号 (从 1 开始);
//! [`Mask3D`] 描述与图像空间形状一致的三维掩膜.

use std::ops::Index;
use std::path::Path;

use ndarray::{s, Array2, Array3, ArrayD, ArrayView, ArrayView2, ArrayView3, Axis, Dimension, Ix3};
use ndarray_npy::{ReadNpyError, WriteNpyError};
use num::Zero;

use super::subregion::{Indexing, Subregion};
use super::volume::{check_spacing, Volume};
use crate::consts::{DEFAULT_ALLOWED_OUTSIDE, DEFAULT_SPACING_DECIMALS};
use crate::error::{RoiError, SearchResult};
use crate::{Idx2d, Idx3d};

mod text;

/// 在切片 `data` 上收集被 `mask` 选中的值 (行优先).
fn collect_masked<T: Copy>(mask: &ArrayView2<bool>, data: ArrayView2<T>) -> SearchResult<Vec<T>> {
    if mask.dim() != data.dim() {
        return Err(RoiError::ShapeMismatch {
            expected: mask.shape().to_vec(),
            actual: data.shape().to_vec(),
        });
    }
    Ok(mask
        .iter()
        .zip(data.iter())
        .filter_map(|(m, v)| m.then_some(*v))
        .collect())
}

/// 单个水平切片上的二维掩膜.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    /// 切片编号, 从 1 开始.
    slice: usize,
    data: Array2<bool>,
}

impl Mask {
    /// 创建掩膜. `slice` 从 1 开始计数, 为 0 时返回 `Err(RoiError::InvalidSlice)`.
    pub fn new(slice: usize, data: Array2<bool>) -> SearchResult<Self> {
        if slice < 1 {
            return Err(RoiError::InvalidSlice(slice));
        }
        Ok(Self { slice, data })
    }

    /// 切片编号, 从 1 开始.
    #[inline]
    pub fn slice(&self) -> usize {
        self.slice
    }

    /// 获得底层数据的不可变视图.
    #[inline]
    pub fn data(&self) -> ArrayView2<bool> {
        self.data.view()
    }

    /// 掩膜的形状 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 被选中的像素个数.
    #[inline]
    pub fn n_selected(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 截取子窗口 `[z0, z1, y0, y1, x0, x1]` 对应的掩膜.
    ///
    /// 子窗口以 `indexing` 约定给出. 结果的切片编号相对于子窗口的起始切片.
    /// 若子窗口超出掩膜范围, 或不包含掩膜所在切片, 则返回 `Err`.
    pub fn subwindow(&self, coords: [usize; 6], indexing: Indexing) -> SearchResult<Self> {
        let (h, w) = self.shape();
        let sub = Subregion::from_flat(coords, indexing).ok_or(RoiError::InvalidConfig(
            "subwindow must be non-empty on every axis",
        ))?;
        let [(z0, z1), (y0, y1), (x0, x1)] = sub.ranges();
        if y1 > h || x1 > w {
            return Err(RoiError::InvalidWindow {
                window: [z1 - z0, y1 - y0, x1 - x0],
                bounds: [self.slice, h, w],
            });
        }
        if !(z0..z1).contains(&(self.slice - 1)) {
            return Err(RoiError::InvalidSlice(self.slice));
        }
        Self::new(
            self.slice - z0,
            self.data.slice(s![y0..y1, x0..x1]).to_owned(),
        )
    }

    /// 获取被选中区域的值 (行优先).
    ///
    /// 若 `array` 是二维的, 其形状必须与掩膜一致; 若是三维的,
    /// 则取其第 `self.slice() - 1` 个切片. 其它维数返回
    /// `Err(RoiError::InvalidDimensionality)`.
    pub fn get_masked<T: Copy, D: Dimension>(&self, array: ArrayView<T, D>) -> SearchResult<Vec<T>> {
        let array = array.into_dyn();
        match array.ndim() {
            2 => {
                let a = array
                    .into_dimensionality()
                    .map_err(|_| RoiError::InvalidDimensionality(2))?;
                collect_masked(&self.data.view(), a)
            }
            3 => {
                let a: ArrayView3<T> = array
                    .into_dimensionality()
                    .map_err(|_| RoiError::InvalidDimensionality(3))?;
                if self.slice > a.len_of(Axis(0)) {
                    return Err(RoiError::InvalidSlice(self.slice));
                }
                collect_masked(&self.data.view(), a.index_axis_move(Axis(0), self.slice - 1))
            }
            n => Err(RoiError::InvalidDimensionality(n)),
        }
    }

    /// 将该掩膜放入形状为 `shape` 的三维掩膜中. 其余切片全部不选中.
    pub fn to_3d(&self, shape: Idx3d) -> SearchResult<Mask3D> {
        let (z, h, w) = shape;
        if self.shape() != (h, w) {
            return Err(RoiError::ShapeMismatch {
                expected: vec![h, w],
                actual: self.data.shape().to_vec(),
            });
        }
        if self.slice > z {
            return Err(RoiError::InvalidSlice(self.slice));
        }
        let mut data = Array3::from_elem(shape, false);
        data.index_axis_mut(Axis(0), self.slice - 1)
            .assign(&self.data);
        Ok(Mask3D { data })
    }
}

/// 边界框在单个轴上的扩展量.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pad {
    /// 向两侧各扩展给定体素数 (在图像边缘处截断).
    By(usize),

    /// 无限扩展, 即取该轴的全部范围.
    Full,
}

/// 边界框在三个轴上的扩展量.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Padding([Pad; 3]);

impl From<usize> for Padding {
    #[inline]
    fn from(value: usize) -> Self {
        Self([Pad::By(value); 3])
    }
}

impl From<Pad> for Padding {
    #[inline]
    fn from(value: Pad) -> Self {
        Self([value; 3])
    }
}

impl From<[Pad; 3]> for Padding {
    #[inline]
    fn from(value: [Pad; 3]) -> Self {
        Self(value)
    }
}

/// 从参数图读取掩膜时的校验项.
#[derive(Copy, Clone, Debug)]
pub struct MaskCheck<'a> {
    expected_spacing: Option<[f64; 3]>,
    decimals: u32,
    container: Option<&'a Mask3D>,
    allowed_outside: f64,
}

impl Default for MaskCheck<'_> {
    fn default() -> Self {
        Self {
            expected_spacing: None,
            decimals: DEFAULT_SPACING_DECIMALS,
            container: None,
            allowed_outside: DEFAULT_ALLOWED_OUTSIDE,
        }
    }
}

impl<'a> MaskCheck<'a> {
    /// 要求体素分辨率在保留 `decimals` 位小数后与 `spacing` 一致.
    #[inline]
    pub fn with_spacing(self, spacing: [f64; 3], decimals: u32) -> Self {
        Self {
            expected_spacing: Some(spacing),
            decimals,
            ..self
        }
    }

    /// 要求掩膜位于 `container` 之外的比例不超过 `allowed_outside`.
    #[inline]
    pub fn with_container(self, container: &'a Mask3D, allowed_outside: f64) -> Self {
        Self {
            container: Some(container),
            allowed_outside,
            ..self
        }
    }

    /// 允许的容器外比例.
    #[inline]
    pub fn allowed_outside(&self) -> f64 {
        self.allowed_outside
    }
}

/// 与图像空间形状一致的三维掩膜.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask3D {
    data: Array3<bool>,
}

impl Index<Idx3d> for Mask3D {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Mask3D {
    /// 直接初始化.
    #[inline]
    pub fn new(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// 由任意维数的数组创建. 维数不为 3 时返回 `Err(RoiError::InvalidDimensionality)`.
    pub fn from_dyn(data: ArrayD<bool>) -> SearchResult<Self> {
        let n = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| RoiError::InvalidDimensionality(n))?;
        Ok(Self { data })
    }

    /// 由数值数组创建. 非零值视为选中.
    pub fn from_values<T: Zero>(data: ArrayView3<T>) -> Self {
        Self {
            data: data.map(|v| !v.is_zero()),
        }
    }

    /// 将参数图 `volume` 的第一个通道解释为掩膜, 并按 `check` 校验.
    ///
    /// # 返回值
    ///
    /// - 体素分辨率不一致时返回 `Err(RoiError::SpacingMismatch)`;
    /// - 与容器形状不一致时返回 `Err(RoiError::ShapeMismatch)`;
    /// - 掩膜为空且指定了容器时返回 `Err(RoiError::EmptyMask)`;
    /// - 位于容器外的比例超出容忍度时返回 `Err(RoiError::ContainmentViolation)`.
    pub fn from_volume(volume: &Volume, check: &MaskCheck) -> SearchResult<Self> {
        if let Some(expected) = check.expected_spacing {
            check_spacing(expected, volume.spacing(), check.decimals)?;
        }
        let mask = Self::from_values(volume.channel(0));
        if let Some(container) = check.container {
            mask.check_within(container, check.allowed_outside)?;
        }
        Ok(mask)
    }

    /// 获得底层数据的不可变视图.
    #[inline]
    pub fn data(&self) -> ArrayView3<bool> {
        self.data.view()
    }

    /// 掩膜形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 检查掩膜形状是否为 `shape`. 不一致时返回 `Err(RoiError::ShapeMismatch)`.
    pub fn check_shape(&self, shape: Idx3d) -> SearchResult<()> {
        if self.shape() == shape {
            Ok(())
        } else {
            Err(RoiError::ShapeMismatch {
                expected: vec![shape.0, shape.1, shape.2],
                actual: self.data.shape().to_vec(),
            })
        }
    }

    /// 被选中的体素个数.
    #[inline]
    pub fn n_selected(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 掩膜为空时返回 `Err(RoiError::EmptyMask)`.
    #[inline]
    pub fn ensure_selected(&self) -> SearchResult<()> {
        if self.data.iter().any(|p| *p) {
            Ok(())
        } else {
            Err(RoiError::EmptyMask)
        }
    }

    /// 每个水平切片上被选中的体素个数.
    pub fn slice_counts(&self) -> Vec<usize> {
        self.data
            .axis_iter(Axis(0))
            .map(|s| s.iter().filter(|p| **p).count())
            .collect()
    }

    /// 被选中体素最多的切片索引 (从 0 开始, 升序). 掩膜为空时返回空 `Vec`.
    pub fn selected_slices(&self) -> Vec<usize> {
        let counts = self.slice_counts();
        let max = counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return vec![];
        }
        counts
            .iter()
            .enumerate()
            .filter_map(|(i, c)| (*c == max).then_some(i))
            .collect()
    }

    /// 收集所有被选中体素的索引. 结果按行优先存储.
    pub fn selected_positions(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| p.then_some(pos))
            .collect()
    }

    /// 获取 `array` 中被选中的值 (行优先). 形状不一致时返回 `Err`.
    pub fn get_masked<T: Copy>(&self, array: ArrayView3<T>) -> SearchResult<Vec<T>> {
        self.check_shape(array.dim())?;
        Ok(self
            .data
            .iter()
            .zip(array.iter())
            .filter_map(|(m, v)| m.then_some(*v))
            .collect())
    }

    /// 带扩展量的最小边界框. 每个轴上为左闭右开区间 `[start, stop)`,
    /// 且不会超出掩膜范围. 对于 [`Pad::Full`] 的轴, 结果总是 `[0, len)`.
    ///
    /// 掩膜为空时返回 `Err(RoiError::EmptyMask)`.
    pub fn bounding_box<P: Into<Padding>>(&self, pad: P) -> SearchResult<[(usize, usize); 3]> {
        let Padding(pad) = pad.into();
        let (z, h, w) = self.shape();
        let lens = [z, h, w];

        let mut lo = lens;
        let mut hi = [0usize; 3];
        for ((a, b, c), _) in self.data.indexed_iter().filter(|(_, p)| **p) {
            for (i, v) in [a, b, c].into_iter().enumerate() {
                lo[i] = lo[i].min(v);
                hi[i] = hi[i].max(v + 1);
            }
        }
        if hi[0] == 0 {
            return Err(RoiError::EmptyMask);
        }

        let mut ans = [(0, 0); 3];
        for i in 0..3 {
            ans[i] = match pad[i] {
                Pad::Full => (0, lens[i]),
                Pad::By(p) => (lo[i].saturating_sub(p), hi[i].saturating_add(p).min(lens[i])),
            };
        }
        Ok(ans)
    }

    /// 带扩展量的最小边界框, 以 [`Subregion`] 表示.
    pub fn bounding_subregion<P: Into<Padding>>(&self, pad: P) -> SearchResult<Subregion> {
        let bb = self.bounding_box(pad)?;
        Subregion::new(bb).ok_or(RoiError::EmptyMask)
    }

    /// 被选中体素中位于 `container` 之外的比例.
    ///
    /// 形状不一致时返回 `Err(RoiError::ShapeMismatch)`,
    /// 自身为空时返回 `Err(RoiError::EmptyMask)`.
    pub fn outside_fraction(&self, container: &Mask3D) -> SearchResult<f64> {
        container.check_shape(self.shape())?;
        let total = self.n_selected();
        if total == 0 {
            return Err(RoiError::EmptyMask);
        }
        Ok(self.n_outside(container)? as f64 / total as f64)
    }

    /// 被选中但不在 `container` 中的体素个数.
    pub fn n_outside(&self, container: &Mask3D) -> SearchResult<usize> {
        container.check_shape(self.shape())?;
        Ok(self
            .data
            .iter()
            .zip(container.data.iter())
            .filter(|(o, c)| **o && !**c)
            .count())
    }

    /// 检查自身 (如病灶) 是否基本位于 `container` (如前列腺) 之内.
    ///
    /// 位于容器外的比例超出 `allowed` 时返回 `Err(RoiError::ContainmentViolation)`,
    /// 否则返回该比例.
    pub fn check_within(&self, container: &Mask3D, allowed: f64) -> SearchResult<f64> {
        let outside = self.outside_fraction(container)?;
        if outside > allowed {
            log::warn!("{:.2}% of selected voxels outside container", outside * 100.0);
            return Err(RoiError::ContainmentViolation { outside, allowed });
        }
        Ok(outside)
    }

    /// 计算与 `container` 的逐体素重叠编码:
    /// 0 为都不选中, 1 为仅容器选中, 2 为自身选中但在容器外, 3 为都选中.
    pub fn overlap(&self, container: &Mask3D) -> SearchResult<Array3<u8>> {
        container.check_shape(self.shape())?;
        let mut ans = Array3::zeros(self.shape());
        ndarray::Zip::from(&mut ans)
            .and(&self.data)
            .and(&container.data)
            .for_each(|o, &me, &c| {
                *o = match (me, c) {
                    (false, false) => 0,
                    (false, true) => 1,
                    (true, false) => 2,
                    (true, true) => 3,
                }
            });
        Ok(ans)
    }

    /// 获取第 `z_index` (从 0 开始) 个水平切片对应的二维掩膜.
    pub fn slice_mask(&self, z_index: usize) -> SearchResult<Mask> {
        if z_index >= self.shape().0 {
            return Err(RoiError::InvalidSlice(z_index + 1));
        }
        Mask::new(z_index + 1, self.data.index_axis(Axis(0), z_index).to_owned())
    }

    /// 转换为 0.0/1.0 数值数组, 以便作为参数图的额外通道.
    #[inline]
    pub fn to_values(&self) -> Array3<f64> {
        self.data.map(|p| if *p { 1.0 } else { 0.0 })
    }

    /// 从 npy 文件读取掩膜.
    pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<Self, ReadNpyError> {
        let data: Array3<bool> = ndarray_npy::read_npy(path)?;
        Ok(Self { data })
    }

    /// 将掩膜写入 npy 文件.
    pub fn write_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        ndarray_npy::write_npy(path, &self.data)
    }
}
