//! 窗口扫描.

use ndarray::Array4;

use crate::data::{OriginIter, Volume, WindowShape};
use crate::error::SearchResult;
use crate::score::ScoreConfig;

/// 每个窗口原点, 每个通道一个分数. 形状为 `(原点深度, 原点高, 原点宽, 通道)`.
pub type ScoreMap = Array4<f64>;

/// 计算 `volume` 中所有形状为 `shape` 的窗口在各通道上的分数.
///
/// 窗口不会越过图像边缘. 每个窗口都直接从原始样本重新计算, 不做任何增量优化,
/// 因此总开销为 `原点个数 * 窗口体素个数 * 通道数`.
///
/// 窗口无法放入 `volume` 时返回 `Err(RoiError::InvalidWindow)`.
///
/// [`RoiError::InvalidWindow`]: crate::RoiError::InvalidWindow
pub fn roi_scores(volume: &Volume, shape: WindowShape, cfg: &ScoreConfig) -> SearchResult<ScoreMap> {
    let (oz, oh, ow) = shape.origins_in(volume.shape())?;
    let mut scores = ScoreMap::zeros((oz, oh, ow, volume.n_channels()));
    for (c, (param, channel)) in volume.each_param().enumerate() {
        let rule = param.rule();
        for (z, h, w) in OriginIter::new((oz, oh, ow)) {
            scores[(z, h, w, c)] = rule(shape.view_at(&channel, (z, h, w)), cfg);
        }
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::normalize_channels;
    use crate::RoiError;

    #[test]
    fn test_roi_scores_shape_and_values() {
        let data = Array4::from_shape_fn((2, 4, 5, 2), |(z, h, w, c)| {
            if c == 0 {
                (z * 20 + h * 5 + w) as f64
            } else {
                0.001
            }
        });
        let names = vec!["score".to_string(), "ADCm".to_string()];
        let v = Volume::new(data, names, [1.0; 3]).unwrap();
        let shape = WindowShape::new(1, 2, 2).unwrap();
        let s = roi_scores(&v, shape, &ScoreConfig::default()).unwrap();
        assert_eq!(s.dim(), (2, 3, 4, 2));
        // (0 + 1 + 5 + 6) / 4
        assert_eq!(s[(0, 0, 0, 0)], 3.0);
        assert_eq!(s[(1, 2, 3, 0)], (33.0 + 34.0 + 38.0 + 39.0) / 4.0);
        assert!((s[(1, 2, 3, 1)] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_subnormal_adc_stays_finite() {
        let data =
            Array4::from_shape_vec((1, 2, 2, 1), vec![0.001, 0.002, 1e-310, 0.0005]).unwrap();
        let v = Volume::new(data, vec!["ADCm".to_string()], [1.0; 3]).unwrap();
        let shape = WindowShape::new(1, 1, 1).unwrap();
        let mut s = roi_scores(&v, shape, &ScoreConfig::default()).unwrap();
        assert!(s.iter().all(|x| x.is_finite()));
        assert_eq!(s[(0, 1, 0, 0)], 0.0);

        normalize_channels(&mut s);
        assert!((s[(0, 1, 1, 0)] - 1.0).abs() < 1e-9);
        assert!((s[(0, 0, 0, 0)] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_roi_scores_window_too_large() {
        let v = Volume::new(Array4::zeros((1, 3, 3, 1)), vec!["score".into()], [1.0; 3]).unwrap();
        let shape = WindowShape::new(2, 1, 1).unwrap();
        assert!(matches!(
            roi_scores(&v, shape, &ScoreConfig::default()),
            Err(RoiError::InvalidWindow { .. })
        ));
    }
}
