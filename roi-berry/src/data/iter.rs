//! 窗口原点迭代器.

use crate::Idx3d;

/// 行优先三维索引迭代器. 用于遍历所有合法的窗口原点.
///
/// 虽然如下函数也能实现相同的功能:
///
/// ```
/// type Idx3d = (usize, usize, usize);
///
/// fn pos_iter_auto((z, h, w): Idx3d) -> impl Iterator<Item = Idx3d> {
///     (0..z).flat_map(move |a| (0..h).flat_map(move |b| (0..w).map(move |c| (a, b, c))))
/// }
///
/// // ...
/// ```
///
/// 但该迭代器对象占用的空间比手写 `OriginIter` 大得多, 且无法提供精确长度.
/// 因此为性能考虑, 我们保留该结构.
#[derive(Debug, Clone)]
pub struct OriginIter {
    cur: Idx3d,
    shape: Idx3d,
    remaining: usize,
}

impl OriginIter {
    /// 创建遍历 `[0, z) x [0, h) x [0, w)` 的迭代器.
    #[inline]
    pub fn new(shape: Idx3d) -> Self {
        let (z, h, w) = shape;
        Self {
            cur: (0, 0, 0),
            shape,
            remaining: z * h * w,
        }
    }
}

impl Iterator for OriginIter {
    type Item = Idx3d;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let ret = self.cur;
        let (_, h, w) = self.shape;
        let (cz, ch, cw) = &mut self.cur;
        *cw += 1;
        if *cw == w {
            *cw = 0;
            *ch += 1;
            if *ch == h {
                *ch = 0;
                *cz += 1;
            }
        }
        self.remaining -= 1;
        Some(ret)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for OriginIter {}

/// 该测试已足够覆盖所有情况, 不用变更.
#[cfg(test)]
mod completeness_tests {
    use super::OriginIter;
    use crate::Idx3d;

    fn pos_iter_builtin((z, h, w): Idx3d) -> impl Iterator<Item = Idx3d> {
        (0..z).flat_map(move |a| (0..h).flat_map(move |b| (0..w).map(move |c| (a, b, c))))
    }

    #[test]
    fn test_origin_iter() {
        for i in 0..=3 {
            for j in 0..=3 {
                for k in 0..=3 {
                    let tup = (i, j, k);
                    assert!(Iterator::eq(pos_iter_builtin(tup), OriginIter::new(tup)));
                    assert_eq!(OriginIter::new(tup).len(), i * j * k);
                }
            }
        }
    }
}
