//! 二维掩膜的文本格式.
//!
//! ```text
//! # 注释
//! slice: 3
//! 0000
//! 0110
//! 0010
//! ```
//!
//! `slice` 缺省为 1. 其余 `key: value` 形式的行被忽略.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use super::Mask;
use crate::consts::COMMENT_PREFIX;
use crate::error::{RoiError, SearchResult};

const SLICE_KEY: &str = "slice";

impl Mask {
    /// 转换为文本格式.
    pub fn to_text(&self) -> String {
        let (h, w) = self.shape();
        let mut s = String::with_capacity(16 + h * (w + 1));
        s.push_str(&format!("{SLICE_KEY}: {}\n", self.slice));
        for row in self.data.rows() {
            s.extend(row.iter().map(|p| if *p { '1' } else { '0' }));
            s.push('\n');
        }
        s
    }

    /// 以文本格式写入 `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> SearchResult<()> {
        writer.write_all(self.to_text().as_bytes())?;
        Ok(())
    }

    /// 以文本格式保存到文件 `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SearchResult<()> {
        let mut f = BufWriter::new(fs::File::create(path)?);
        self.write_to(&mut f)?;
        f.flush()?;
        Ok(())
    }

    /// 从文本格式解析.
    ///
    /// 没有任何掩膜行时返回 `Err(RoiError::Parse)`, 此时 `line` 为 0.
    pub fn from_text(text: &str) -> SearchResult<Self> {
        let mut slice = 1;
        let mut width = None;
        let mut bits = vec![];
        let mut rows = 0;

        for (no, raw) in text.lines().enumerate() {
            let line = raw.split(COMMENT_PREFIX).next().unwrap_or("").trim();
            let err = |reason| RoiError::Parse { line: no + 1, reason };
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                if key.trim() == SLICE_KEY {
                    slice = value.trim().parse().map_err(|_| err("invalid slice number"))?;
                }
                continue;
            }
            if !line.starts_with(['0', '1']) {
                continue;
            }
            let row = line
                .chars()
                .map(|c| match c {
                    '0' => Ok(false),
                    '1' => Ok(true),
                    _ => Err(err("mask row must only contain 0 and 1")),
                })
                .collect::<SearchResult<Vec<_>>>()?;
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => return Err(err("mask rows differ in length")),
                _ => {}
            }
            bits.extend(row);
            rows += 1;
        }

        let Some(width) = width else {
            return Err(RoiError::Parse {
                line: 0,
                reason: "no mask found",
            });
        };
        let data = Array2::from_shape_vec((rows, width), bits).map_err(|_| RoiError::Parse {
            line: 0,
            reason: "malformed mask",
        })?;
        Self::new(slice, data)
    }

    /// 从文件 `path` 读取.
    pub fn load<P: AsRef<Path>>(path: P) -> SearchResult<Self> {
        Self::from_text(&fs::read_to_string(path)?)
    }
}
