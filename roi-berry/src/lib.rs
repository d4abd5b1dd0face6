#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 在多通道 DWI 参数图 (pmap) 中自动搜索最可疑的矩形 ROI.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 文件格式 (ASCII, HDF5, DICOM 等) 的解析不在本 crate 范围内.
//!   调用方应自行读取样本, 通道名称和体素分辨率, 再构建 [`Volume`].
//! 2. 所有致命错误都在计算开始前以 [`RoiError`] 返回, 不会产生部分结果.
//!
//! # 功能
//!
//! ### 评分规则 ✅
//!
//! 按通道名解析参数标签 (ADC, K, score, 包含通道), 每个标签对应一条单窗口评分规则.
//!
//! 实现位于 `roi-berry/src/score.rs`.
//!
//! ### 滑动窗口 ✅
//!
//! 窗口形状, 行优先原点迭代器, 以及可选掩膜约束下的滑动窗口.
//! 纹理特征提取等上层功能也以此为基础.
//!
//! 实现位于 `roi-berry/src/data/window.rs`.
//!
//! ### 多尺度搜索 ✅
//!
//! 1. 对每个窗口形状扫描全部合法原点, 逐通道评分;
//! 2. 逐通道按最大值归一化, 求和, 选出前 N 个候选并累加到分数图;
//! 3. 对全部窗口形状的分数图求和;
//! 4. 以目标 ROI 形状在汇总分数图上再搜索一次.
//!
//! 打开 `rayon` feature 时各窗口形状并行计算.
//!
//! 实现位于 `roi-berry/src/search`.
//!
//! ### 掩膜 ✅
//!
//! 1. 单切片二维掩膜及其文本格式. ✅
//! 2. 三维掩膜: 边界框, 包含关系检查, 重叠编码. ✅
//! 3. 子区域文本格式. ✅
//!
//! 实现位于 `roi-berry/src/data/mask`.
//!
//! # 示例
//!
//! ```
//! use ndarray::Array4;
//! use roi_berry::prelude::*;
//!
//! let data = Array4::from_shape_fn((2, 12, 12, 1), |(_, h, w, _)| {
//!     if (4..9).contains(&h) && (4..9).contains(&w) { 3.0 } else { 1.0 }
//! });
//! let volume = Volume::new(data, vec!["score".to_string()], [3.0, 0.5, 0.5]).unwrap();
//! let roi = WindowShape::new(1, 5, 5).unwrap();
//! let config = SearchConfig::new(1..=2, 5..=5, 3, roi).unwrap();
//!
//! let result = find_roi(&volume, &config, None).unwrap();
//! assert_eq!(result.coords()[1..], [(4, 9), (4, 9)]);
//! ```

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 参数图, 掩膜, 窗口等基础数据结构.
pub mod data;

pub use data::{
    sliding_windows, Indexing, Mask, Mask3D, MaskCheck, OriginIter, Pad, Padding, Subregion,
    Volume, VolumeMeta, WindowShape,
};

pub mod config;
pub use config::{CornerStrategy, SearchConfig};

pub mod consts;

mod error;
pub use error::{RoiError, SearchResult};

pub mod score;
pub use score::{Containment, Param, ScoreConfig};

pub mod search;
pub use search::{find_roi, find_roi_with_cancel, RoiResult};

pub mod prelude;
