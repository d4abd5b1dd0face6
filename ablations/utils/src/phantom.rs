//! 合成参数图.
//!
//! 每个参数图包含 `ADCm` 和 `K` 两个通道, 一个椭圆柱形的前列腺掩膜,
//! 一个位于前列腺内的病灶, 以及一个位于前列腺外的干扰区域.
//! 干扰区域的参数比病灶更 "可疑", 因此只有带掩膜的搜索才能避开它.

use ndarray::{Array3, Array4};
use roi_berry::{Mask3D, Subregion, Volume, WindowShape};

/// 参数图形状 (深度, 高, 宽).
pub const SHAPE: (usize, usize, usize) = (6, 48, 48);

/// 体素分辨率.
pub const SPACING: [f64; 3] = [3.0, 0.5, 0.5];

const LESION: [usize; 3] = [3, 5, 5];
const ADC_BACKGROUND: f64 = 0.0016;
const ADC_LESION: f64 = 0.0008;
const ADC_DECOY: f64 = 0.0005;
const K_BACKGROUND: f64 = 0.6;
const K_LESION: f64 = 1.1;
const K_DECOY: f64 = 1.3;

/// 一个合成参数图及其真值.
#[derive(Debug, Clone)]
pub struct Phantom {
    volume: Volume,
    prostate: Mask3D,
    lesion: Subregion,
    decoy: Subregion,
}

#[inline]
fn contains(sub: &Subregion, (z, h, w): (usize, usize, usize)) -> bool {
    let [(z0, z1), (y0, y1), (x0, x1)] = sub.ranges();
    (z0..z1).contains(&z) && (y0..y1).contains(&h) && (x0..x1).contains(&w)
}

/// 确定性的纹理扰动, 取值位于 `[-0.5, 0.5]`.
#[inline]
fn ripple((z, h, w): (usize, usize, usize), seed: usize) -> f64 {
    ((h * 7 + w * 13 + z * 3 + seed) % 11) as f64 / 10.0 - 0.5
}

impl Phantom {
    /// 由 `seed` 确定性地生成参数图.
    pub fn generate(seed: usize) -> Self {
        let (d, h, w) = SHAPE;
        let (cy, cx) = (h as f64 / 2.0, w as f64 / 2.0);
        let prostate = Array3::from_shape_fn(SHAPE, |(z, y, x)| {
            let (dy, dx) = ((y as f64 - cy) / 14.0, (x as f64 - cx) / 16.0);
            z > 0 && z < d - 1 && dy * dy + dx * dx <= 1.0
        });
        let prostate = Mask3D::new(prostate);

        let lesion = Subregion::from_window(
            (1 + seed % 2, 17 + (seed * 5) % 10, 17 + (seed * 3) % 10),
            WindowShape::new(LESION[0], LESION[1], LESION[2]).unwrap(),
        );
        let decoy = Subregion::from_window(
            (1, 2 + seed % 3, 40),
            WindowShape::new(LESION[0], LESION[1], LESION[2]).unwrap(),
        );

        let data = Array4::from_shape_fn((d, h, w, 2), |(z, y, x, c)| {
            let pos = (z, y, x);
            let noise = ripple(pos, seed);
            let (adc, k) = if contains(&lesion, pos) {
                (ADC_LESION, K_LESION)
            } else if contains(&decoy, pos) {
                (ADC_DECOY, K_DECOY)
            } else {
                (ADC_BACKGROUND, K_BACKGROUND)
            };
            match c {
                0 => adc + 0.0001 * noise,
                _ => k + 0.05 * noise,
            }
        });
        let volume = Volume::new(data, vec!["ADCm".to_string(), "K".to_string()], SPACING).unwrap();

        Self {
            volume,
            prostate,
            lesion,
            decoy,
        }
    }

    /// 参数图.
    #[inline]
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// 前列腺掩膜.
    #[inline]
    pub fn prostate(&self) -> &Mask3D {
        &self.prostate
    }

    /// 病灶真值.
    #[inline]
    pub fn lesion(&self) -> Subregion {
        self.lesion
    }

    /// 前列腺外的干扰区域.
    #[inline]
    pub fn decoy(&self) -> Subregion {
        self.decoy
    }

    /// `roi` 是否与病灶相交?
    pub fn hits(&self, roi: &Subregion) -> bool {
        roi.ranges()
            .iter()
            .zip(self.lesion.ranges())
            .all(|((a0, a1), (b0, b1))| *a0 < b1 && b0 < *a1)
    }
}

/// 依次生成 `n` 个合成参数图.
pub fn phantoms(n: usize) -> impl Iterator<Item = Phantom> {
    (0..n).map(Phantom::generate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesion_inside_prostate() {
        for p in phantoms(10) {
            let [(z0, z1), (y0, y1), (x0, x1)] = p.lesion().ranges();
            let mut lesion = Array3::from_elem(SHAPE, false);
            lesion
                .slice_mut(ndarray::s![z0..z1, y0..y1, x0..x1])
                .fill(true);
            let lesion = Mask3D::new(lesion);
            assert_eq!(lesion.n_outside(p.prostate()).unwrap(), 0);

            let [(_, _), (_, _), (dx0, _)] = p.decoy().ranges();
            assert!(!p.prostate()[(1, 4, dx0)]);
            assert!(p.hits(&p.lesion()));
            assert!(!p.hits(&p.decoy()));
        }
    }
}
