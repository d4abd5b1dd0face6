//! 运行时错误.

use std::fmt::{self, Display, Formatter};
use std::io;

/// ROI 搜索及掩膜操作的运行时错误.
///
/// 除 [`RoiError::Cancelled`] 外, 所有错误都会在计算开始前发现,
/// 不会产生任何部分结果.
#[derive(Debug)]
pub enum RoiError {
    /// 图像与掩膜 (或两个掩膜之间) 的形状不一致.
    ShapeMismatch {
        /// 期望的形状.
        expected: Vec<usize>,
        /// 实际的形状.
        actual: Vec<usize>,
    },

    /// 数组维数不符合要求. 参数为实际维数.
    InvalidDimensionality(usize),

    /// 掩膜没有任何被选中的体素.
    EmptyMask,

    /// 分数图中不存在可用的候选窗口 (如全部为非有限值或全为 0).
    NoCandidate,

    /// 体素分辨率在给定精度下不一致.
    SpacingMismatch {
        /// 期望的体素分辨率 (已按精度舍入).
        expected: [f64; 3],
        /// 实际的体素分辨率 (已按精度舍入).
        actual: [f64; 3],
    },

    /// 参考掩膜位于容器掩膜之外的比例超出容忍度.
    ContainmentViolation {
        /// 实际位于容器外的比例.
        outside: f64,
        /// 允许的最大比例.
        allowed: f64,
    },

    /// 窗口形状非法 (含 0), 或无法放入给定范围.
    InvalidWindow {
        /// 窗口形状.
        window: [usize; 3],
        /// 容纳窗口的范围.
        bounds: [usize; 3],
    },

    /// 非法的切片编号 (切片编号从 1 开始).
    InvalidSlice(usize),

    /// 非法的配置.
    InvalidConfig(&'static str),

    /// 文本格式解析错误. `line` 从 1 开始计数, 为 0 时表示整个输入.
    Parse {
        /// 出错的行号.
        line: usize,
        /// 出错原因.
        reason: &'static str,
    },

    /// 搜索被外部信号取消.
    Cancelled,

    /// 底层 I/O 错误.
    Io(io::Error),
}

impl Display for RoiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected:?}, got {actual:?}")
            }
            Self::InvalidDimensionality(n) => write!(f, "invalid dimensionality: {n}"),
            Self::EmptyMask => f.write_str("mask has no selected voxels"),
            Self::NoCandidate => f.write_str("no usable candidate in scoremap"),
            Self::SpacingMismatch { expected, actual } => {
                write!(f, "expected voxel spacing {expected:?}, got {actual:?}")
            }
            Self::ContainmentViolation { outside, allowed } => write!(
                f,
                "portion of selected voxels outside container is {:.2}% (allowed {:.2}%)",
                outside * 100.0,
                allowed * 100.0
            ),
            Self::InvalidWindow { window, bounds } => {
                write!(f, "window {window:?} does not fit into {bounds:?}")
            }
            Self::InvalidSlice(s) => write!(f, "invalid slice number {s}"),
            Self::InvalidConfig(what) => write!(f, "invalid configuration: {what}"),
            Self::Parse { line, reason } => write!(f, "parse error at line {line}: {reason}"),
            Self::Cancelled => f.write_str("search cancelled"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for RoiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RoiError {
    #[inline]
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// 搜索 / 掩膜操作结果.
pub type SearchResult<T> = Result<T, RoiError>;
