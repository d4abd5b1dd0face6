//! 图像子区域 (subregion) 及其文本文件格式.
//!
//! 文本格式每行一个索引 (从 0 开始), 依次为
//! `y_first, y_last, x_first, x_last, z_first, z_last`,
//! 其中 "last" 为闭区间端点. 以 `#` 开头的内容为注释.

use std::fs;
use std::io::Write;
use std::path::Path;

use super::window::WindowShape;
use crate::consts::COMMENT_PREFIX;
use crate::error::{RoiError, SearchResult};
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 坐标的索引约定.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Indexing {
    /// 从 1 开始计数.
    OneBased,

    /// 从 0 开始计数.
    ZeroBased,
}

impl Indexing {
    /// 将该约定下的坐标转换为从 0 开始的坐标. 1-based 坐标中出现 0 时返回 `None`.
    #[inline]
    pub fn to_zero_based(&self, i: usize) -> Option<usize> {
        match self {
            Self::OneBased => i.checked_sub(1),
            Self::ZeroBased => Some(i),
        }
    }
}

/// 三维子区域. 每个轴上为左闭右开区间 `[start, stop)`, 从 0 开始计数.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subregion {
    ranges: [(usize, usize); 3],
}

impl Subregion {
    /// 由 (深度, 高, 宽) 三个轴上的 `(start, stop)` 创建子区域.
    /// 任一区间为空时返回 `None`.
    pub fn new(ranges: [(usize, usize); 3]) -> Option<Self> {
        ranges
            .iter()
            .all(|(a, b)| a < b)
            .then_some(Self { ranges })
    }

    /// 以 `origin` 为起点, 形状为 `shape` 的子区域.
    pub fn from_window((z, h, w): Idx3d, shape: WindowShape) -> Self {
        let [d0, d1, d2] = shape.extent();
        Self {
            ranges: [(z, z + d0), (h, h + d1), (w, w + d2)],
        }
    }

    /// 由 `[z0, z1, y0, y1, x0, x1]` 形式的扁平坐标创建子区域.
    /// 若 `indexing` 为 [`Indexing::OneBased`], 则所有坐标先减一.
    pub fn from_flat(flat: [usize; 6], indexing: Indexing) -> Option<Self> {
        let mut z = [0usize; 6];
        for (dst, src) in z.iter_mut().zip(flat) {
            *dst = indexing.to_zero_based(src)?;
        }
        Self::new([(z[0], z[1]), (z[2], z[3]), (z[4], z[5])])
    }

    /// 获取 `[z0, z1, y0, y1, x0, x1]` 形式的扁平坐标 (从 0 开始).
    #[inline]
    pub fn as_flat(&self) -> [usize; 6] {
        let [(z0, z1), (y0, y1), (x0, x1)] = self.ranges;
        [z0, z1, y0, y1, x0, x1]
    }

    /// 各轴区间.
    #[inline]
    pub fn ranges(&self) -> [(usize, usize); 3] {
        self.ranges
    }

    /// 子区域形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let [(z0, z1), (y0, y1), (x0, x1)] = self.ranges;
        (z1 - z0, y1 - y0, x1 - x0)
    }

    /// 子区域能否完整放入空间形状 `shape` 中?
    #[inline]
    pub fn fits(&self, (z, h, w): Idx3d) -> bool {
        let [(_, z1), (_, y1), (_, x1)] = self.ranges;
        z1 <= z && y1 <= h && x1 <= w
    }

    /// 从文本解析子区域.
    pub fn from_text(text: &str) -> SearchResult<Self> {
        let mut entries = Vec::with_capacity(6);
        for (no, raw) in text.lines().enumerate() {
            let line = raw.split(COMMENT_PREFIX).next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let v: f64 = line.parse().map_err(|_| RoiError::Parse {
                line: no + 1,
                reason: "index is not a number",
            })?;
            if !v.is_finite() || v < 0.0 {
                return Err(RoiError::Parse {
                    line: no + 1,
                    reason: "index must be a non-negative number",
                });
            }
            entries.push(v as usize);
        }
        let &[y0, y1, x0, x1, z0, z1] = entries.as_slice() else {
            return Err(RoiError::Parse {
                line: 0,
                reason: "subregion needs exactly 6 indices",
            });
        };
        Self::new([(z0, z1 + 1), (y0, y1 + 1), (x0, x1 + 1)]).ok_or(RoiError::Parse {
            line: 0,
            reason: "empty subregion",
        })
    }

    /// 转换为文本. `comment` 的每一行都会被写为注释行.
    pub fn to_text(&self, comment: &str) -> String {
        let mut s = String::with_capacity(64);
        for line in comment.lines() {
            s.push_str(&format!("{COMMENT_PREFIX} {line}\n"));
        }
        let [(z0, z1), (y0, y1), (x0, x1)] = self.ranges;
        for v in [y0, y1 - 1, x0, x1 - 1, z0, z1 - 1] {
            s.push_str(&format!("{v}\n"));
        }
        s
    }

    /// 从文件 `path` 读取子区域.
    pub fn load<P: AsRef<Path>>(path: P) -> SearchResult<Self> {
        Self::from_text(&fs::read_to_string(path)?)
    }

    /// 将子区域写入文件 `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P, comment: &str) -> SearchResult<()> {
        let mut f = fs::File::create(path)?;
        f.write_all(self.to_text(comment).as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_one_based() {
        let s = Subregion::from_flat([1, 2, 3, 8, 4, 9], Indexing::OneBased).unwrap();
        assert_eq!(s.as_flat(), [0, 1, 2, 7, 3, 8]);
        assert_eq!(s.shape(), (1, 5, 5));
        assert!(Subregion::from_flat([0, 2, 3, 8, 4, 9], Indexing::OneBased).is_none());
        assert!(Subregion::from_flat([2, 2, 3, 8, 4, 9], Indexing::ZeroBased).is_none());
    }

    #[test]
    fn test_text_format() {
        let s = Subregion::new([(2, 4), (10, 20), (30, 45)]).unwrap();
        let text = s.to_text("bounding box\nwith padding");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "# bounding box");
        assert_eq!(lines[2..], ["10", "19", "30", "44", "2", "3"]);
        assert_eq!(Subregion::from_text(&text).unwrap(), s);
    }

    #[test]
    fn test_text_format_errors() {
        assert!(matches!(
            Subregion::from_text("1\n2\n3\n"),
            Err(RoiError::Parse { line: 0, .. })
        ));
        assert!(matches!(
            Subregion::from_text("1\nx\n"),
            Err(RoiError::Parse { line: 2, .. })
        ));
        // 支持以浮点数形式书写的索引.
        let s = Subregion::from_text("0.0\n1\n0\n1 # x\n0\n0\n").unwrap();
        assert_eq!(s.shape(), (1, 2, 2));
    }
}
