//! 多通道参数图.

use std::sync::Arc;

use ndarray::{s, Array3, Array4, ArrayView3, ArrayView4, Axis, Zip};
use num::ToPrimitive;

use super::mask::{Mask3D, Padding};
use super::subregion::{Indexing, Subregion};
use crate::consts::params::SCOREMAP;
use crate::error::{RoiError, SearchResult};
use crate::score::Param;
use crate::Idx3d;

/// 参数图的元数据: 通道名称, 解析后的参数标签和体素分辨率.
///
/// 元数据一经创建便不可修改. 多个 [`Volume`] 可通过 `Arc` 共享同一份元数据;
/// 改变通道的派生操作总是构建新的元数据.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeMeta {
    names: Vec<String>,
    params: Vec<Param>,
    spacing: [f64; 3],
}

impl VolumeMeta {
    fn new(names: Vec<String>, spacing: [f64; 3]) -> Self {
        let params = names.iter().map(|n| Param::from_name(n)).collect();
        Self {
            names,
            params,
            spacing,
        }
    }

    /// 通道名称.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 各通道的参数标签.
    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// 体素分辨率 (深度, 高, 宽).
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }
}

/// 多通道参数图. 数据按 `(深度, 高, 宽, 通道)` 存储, 所有通道空间形状一致.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array4<f64>,
    meta: Arc<VolumeMeta>,
}

impl Volume {
    /// 由样本数组, 通道名称和体素分辨率创建参数图.
    ///
    /// 通道数为 0, 通道名称个数与通道数不一致, 或体素分辨率不是正有限值时返回 `Err`.
    pub fn new(data: Array4<f64>, names: Vec<String>, spacing: [f64; 3]) -> SearchResult<Self> {
        let c = data.len_of(Axis(3));
        if c == 0 {
            return Err(RoiError::InvalidConfig("volume must have at least one channel"));
        }
        if names.len() != c {
            return Err(RoiError::ShapeMismatch {
                expected: vec![c],
                actual: vec![names.len()],
            });
        }
        if !spacing.iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(RoiError::InvalidConfig("voxel spacing must be positive"));
        }
        Ok(Self {
            data,
            meta: Arc::new(VolumeMeta::new(names, spacing)),
        })
    }

    /// 由任意数值类型的样本创建参数图. 无法表示为 `f64` 的样本记为 NaN.
    pub fn from_samples<T: ToPrimitive>(
        data: ArrayView4<T>,
        names: Vec<String>,
        spacing: [f64; 3],
    ) -> SearchResult<Self> {
        let data = data.map(|v| v.to_f64().unwrap_or(f64::NAN));
        Self::new(data, names, spacing)
    }

    /// 将单通道分数图包装为参数图. 通道名为 [`SCOREMAP`].
    pub fn from_scoremap(scoremap: Array3<f64>, spacing: [f64; 3]) -> SearchResult<Self> {
        let data = scoremap.insert_axis(Axis(3));
        Self::new(data, vec![SCOREMAP.to_string()], spacing)
    }

    /// 空间形状 (深度, 高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let (z, h, w, _) = self.data.dim();
        (z, h, w)
    }

    /// 通道数.
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    /// 获取第 `i` 个通道的视图. `i` 越界时 panic.
    #[inline]
    pub fn channel(&self, i: usize) -> ArrayView3<f64> {
        self.data.index_axis(Axis(3), i)
    }

    /// 全部样本.
    #[inline]
    pub fn data(&self) -> ArrayView4<f64> {
        self.data.view()
    }

    /// 共享的元数据句柄.
    #[inline]
    pub fn meta(&self) -> &Arc<VolumeMeta> {
        &self.meta
    }

    /// 通道名称.
    #[inline]
    pub fn names(&self) -> &[String] {
        self.meta.names()
    }

    /// 各通道的参数标签.
    #[inline]
    pub fn params(&self) -> &[Param] {
        self.meta.params()
    }

    /// 体素分辨率 (深度, 高, 宽).
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.meta.spacing()
    }

    /// 依次产生 `(参数标签, 通道视图)`.
    pub fn each_param(&self) -> impl Iterator<Item = (Param, ArrayView3<f64>)> + '_ {
        self.params()
            .iter()
            .copied()
            .zip(self.data.axis_iter(Axis(3)))
    }

    /// 追加名为 `name` 的通道, 返回新的参数图. 元数据被复制.
    ///
    /// `values` 与空间形状不一致时返回 `Err(RoiError::ShapeMismatch)`.
    pub fn with_channel(&self, name: &str, values: ArrayView3<f64>) -> SearchResult<Self> {
        let (z, h, w) = self.shape();
        if values.dim() != (z, h, w) {
            return Err(RoiError::ShapeMismatch {
                expected: vec![z, h, w],
                actual: values.shape().to_vec(),
            });
        }
        let c = self.n_channels();
        let mut data = Array4::zeros((z, h, w, c + 1));
        data.slice_mut(s![.., .., .., ..c]).assign(&self.data);
        data.index_axis_mut(Axis(3), c).assign(&values);

        let mut names = self.names().to_vec();
        names.push(name.to_string());
        Ok(Self {
            data,
            meta: Arc::new(VolumeMeta::new(names, self.spacing())),
        })
    }

    /// 截取子窗口 `[z0, z1, y0, y1, x0, x1]` (以 `indexing` 约定给出), 返回新的参数图.
    /// 通道不变, 因此元数据被共享.
    pub fn crop(&self, coords: [usize; 6], indexing: Indexing) -> SearchResult<Self> {
        let sub = Subregion::from_flat(coords, indexing)
            .ok_or(RoiError::InvalidConfig("crop window must be non-empty"))?;
        self.crop_to(&sub)
    }

    /// 截取子区域 `sub`, 返回新的参数图. 元数据被共享.
    pub fn crop_to(&self, sub: &Subregion) -> SearchResult<Self> {
        let (z, h, w) = self.shape();
        if !sub.fits((z, h, w)) {
            let (a, b, c) = sub.shape();
            return Err(RoiError::InvalidWindow {
                window: [a, b, c],
                bounds: [z, h, w],
            });
        }
        let [(z0, z1), (y0, y1), (x0, x1)] = sub.ranges();
        Ok(Self {
            data: self.data.slice(s![z0..z1, y0..y1, x0..x1, ..]).to_owned(),
            meta: Arc::clone(&self.meta),
        })
    }

    /// 按各通道参数的合理取值范围裁剪离群值. 没有取值范围的通道不变.
    pub fn clip_outliers(&mut self) {
        for (param, mut ch) in self.meta.params.iter().zip(self.data.axis_iter_mut(Axis(3))) {
            if let Some((lo, hi)) = param.clip_range() {
                ch.mapv_inplace(|v| v.clamp(lo, hi));
            }
        }
    }

    /// 将 `mask` 之外的全部样本置为 `background` (通常为 NaN).
    ///
    /// 掩膜形状与空间形状不一致时返回 `Err(RoiError::ShapeMismatch)`.
    pub fn apply_mask(&mut self, mask: &Mask3D, background: f64) -> SearchResult<()> {
        mask.check_shape(self.shape())?;
        for mut ch in self.data.axis_iter_mut(Axis(3)) {
            Zip::from(&mut ch).and(mask.data()).for_each(|v, &m| {
                if !m {
                    *v = background;
                }
            });
        }
        Ok(())
    }

    /// 任一通道取非零有限值的体素的最小边界框, 可带 `pad` 填充.
    ///
    /// 不存在这样的体素时返回 `Err(RoiError::EmptyMask)`.
    pub fn mbb<P: Into<Padding>>(&self, pad: P) -> SearchResult<[(usize, usize); 3]> {
        let support = self
            .data
            .map_axis(Axis(3), |v| v.iter().any(|x| x.is_finite() && *x != 0.0));
        Mask3D::new(support).bounding_box(pad)
    }

    /// 第 `i` 个通道的质心 (深度, 高, 宽). NaN 视为没有质量.
    ///
    /// 总质量为 0 或非有限时返回 `None`. `i` 越界时 panic.
    pub fn centroid(&self, i: usize) -> Option<[f64; 3]> {
        let mut mass = 0.0;
        let mut moment = [0.0; 3];
        for ((z, h, w), v) in self.channel(i).indexed_iter() {
            if v.is_nan() {
                continue;
            }
            mass += v;
            for (m, p) in moment.iter_mut().zip([z, h, w]) {
                *m += v * p as f64;
            }
        }
        (mass != 0.0 && mass.is_finite()).then(|| moment.map(|m| m / mass))
    }

    /// 检查体素分辨率在保留 `decimals` 位小数后是否与 `expected` 一致.
    #[inline]
    pub fn check_spacing(&self, expected: [f64; 3], decimals: u32) -> SearchResult<()> {
        check_spacing(expected, self.spacing(), decimals)
    }
}

#[inline]
fn round_to(v: f64, decimals: u32) -> f64 {
    let k = 10f64.powi(decimals as i32);
    (v * k).round() / k
}

/// 检查两组体素分辨率在保留 `decimals` 位小数后是否一致.
///
/// 不一致时返回 `Err(RoiError::SpacingMismatch)`, 其中携带舍入后的值.
pub fn check_spacing(expected: [f64; 3], actual: [f64; 3], decimals: u32) -> SearchResult<()> {
    let expected = expected.map(|v| round_to(v, decimals));
    let actual = actual.map(|v| round_to(v, decimals));
    if expected == actual {
        Ok(())
    } else {
        Err(RoiError::SpacingMismatch { expected, actual })
    }
}
