//! 单通道窗口评分规则.
//!
//! 每个通道在构建 [`crate::Volume`] 时就被解析为一个 [`Param`] 标签,
//! 之后只按标签分派, 不再做任何字符串匹配. 新增一种评分规则意味着新增一个
//! `Param` 变体和一个对应的评分函数, 窗口扫描器无需任何改动.

use ndarray::ArrayView3;

use crate::consts::{self, params::*};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 包含通道的评分策略.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Containment {
    /// 窗口内被选中的掩膜体素比例不低于 [`ScoreConfig::containment_fraction`] 即可.
    Lenient,

    /// 窗口内所有掩膜体素都必须被选中.
    Strict,
}

impl Containment {
    /// 该策略对应的保留通道名.
    #[inline]
    pub const fn param_name(&self) -> &'static str {
        match self {
            Self::Lenient => MASK_LENIENT,
            Self::Strict => MASK_STRICT,
        }
    }
}

/// 通道参数标签. 决定该通道使用哪条评分规则.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Param {
    /// 表观扩散系数. 均值越小越可疑, 因此取倒数.
    Adc,

    /// 峰度类参数. 线性衰减到与其它通道相近的量级.
    Kurtosis,

    /// 通用分数, 直接取均值.
    Score,

    /// 包含通道, 值为 0/1 的掩膜.
    Mask(Containment),

    /// 未知参数. 分数恒为 0, 既不奖励也不禁止.
    Unknown,
}

impl Param {
    /// 将通道名解析为参数标签.
    ///
    /// 包含通道要求名称完全一致, 其它规则按前缀匹配.
    pub fn from_name(name: &str) -> Self {
        match name {
            MASK_LENIENT => Self::Mask(Containment::Lenient),
            MASK_STRICT => Self::Mask(Containment::Strict),
            n if n.starts_with(ADC_PREFIX) => Self::Adc,
            n if n.starts_with(KURTOSIS_PREFIX) => Self::Kurtosis,
            n if n.starts_with(SCORE_PREFIX) => Self::Score,
            n => {
                log::debug!("Unknown parameter `{n}`, scored as zero");
                Self::Unknown
            }
        }
    }

    /// 获取该参数对应的评分函数.
    #[inline]
    pub fn rule(&self) -> ScoreFn {
        match self {
            Self::Adc => adc_score,
            Self::Kurtosis => kurtosis_score,
            Self::Score => mean_score,
            Self::Mask(Containment::Lenient) => lenient_mask_score,
            Self::Mask(Containment::Strict) => strict_mask_score,
            Self::Unknown => neutral_score,
        }
    }

    /// 计算窗口 `window` 在该参数下的分数.
    #[inline]
    pub fn score(&self, window: ArrayView3<f64>, cfg: &ScoreConfig) -> f64 {
        (self.rule())(window, cfg)
    }

    /// 该参数的合理取值范围. 范围外的值被视为离群值.
    #[inline]
    pub fn clip_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Adc => Some(consts::ADC_CLIP),
            Self::Kurtosis => Some(consts::KURTOSIS_CLIP),
            _ => None,
        }
    }
}

/// 评分函数. 输入单通道窗口, 输出有限实数分数.
pub type ScoreFn = fn(ArrayView3<f64>, &ScoreConfig) -> f64;

/// 评分规则的可调参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScoreConfig {
    containment_fraction: f64,
}

impl Default for ScoreConfig {
    #[inline]
    fn default() -> Self {
        Self::new_unchecked(consts::DEFAULT_CONTAINMENT_FRACTION)
    }
}

impl ScoreConfig {
    /// 构建评分配置. `containment_fraction` 必须位于 `[0, 1]`, 否则返回 `None`.
    pub fn new(containment_fraction: f64) -> Option<Self> {
        (0.0..=1.0)
            .contains(&containment_fraction)
            .then_some(Self::new_unchecked(containment_fraction))
    }

    #[inline]
    const fn new_unchecked(containment_fraction: f64) -> Self {
        Self {
            containment_fraction,
        }
    }

    /// 宽松包含策略下窗口内掩膜体素被选中的最低比例.
    #[inline]
    pub fn containment_fraction(&self) -> f64 {
        self.containment_fraction
    }
}

/// 窗口均值. 空窗口或均值非有限 (如求和溢出) 时为 0.
#[inline]
fn mean(window: &ArrayView3<f64>) -> f64 {
    window.mean().filter(|m| m.is_finite()).unwrap_or(0.0)
}

/// 均值为正且倒数有限时取其倒数, 否则为 0.
fn adc_score(window: ArrayView3<f64>, _: &ScoreConfig) -> f64 {
    match mean(&window) {
        m if m > 0.0 => Some(m.recip()).filter(|r| r.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn kurtosis_score(window: ArrayView3<f64>, _: &ScoreConfig) -> f64 {
    mean(&window) / consts::KURTOSIS_DAMPING
}

fn mean_score(window: ArrayView3<f64>, _: &ScoreConfig) -> f64 {
    mean(&window)
}

fn lenient_mask_score(window: ArrayView3<f64>, cfg: &ScoreConfig) -> f64 {
    if window.is_empty() {
        return consts::BANNED_SCORE;
    }
    let selected = window.iter().filter(|v| **v != 0.0).count();
    if selected as f64 / window.len() as f64 >= cfg.containment_fraction {
        1.0
    } else {
        consts::BANNED_SCORE
    }
}

fn strict_mask_score(window: ArrayView3<f64>, _: &ScoreConfig) -> f64 {
    if !window.is_empty() && window.iter().all(|v| *v != 0.0) {
        1.0
    } else {
        consts::BANNED_SCORE
    }
}

fn neutral_score(_: ArrayView3<f64>, _: &ScoreConfig) -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BANNED_SCORE;
    use ndarray::Array3;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_param_from_name() {
        assert_eq!(Param::from_name("ADCm"), Param::Adc);
        assert_eq!(Param::from_name("ADCk"), Param::Adc);
        assert_eq!(Param::from_name("K"), Param::Kurtosis);
        assert_eq!(Param::from_name("score_total"), Param::Score);
        assert_eq!(
            Param::from_name("prostate_mask"),
            Param::Mask(Containment::Lenient)
        );
        assert_eq!(
            Param::from_name("prostate_mask_strict"),
            Param::Mask(Containment::Strict)
        );
        assert_eq!(Param::from_name("T2w"), Param::Unknown);
        assert_eq!(Param::from_name("prostate_mask_x"), Param::Unknown);
    }

    #[test]
    fn test_adc_reciprocal_and_degenerate() {
        let cfg = ScoreConfig::default();
        let a = Array3::from_elem((1, 2, 2), 0.5);
        assert!(float_eq(Param::Adc.score(a.view(), &cfg), 2.0));

        let zero = Array3::<f64>::zeros((1, 2, 2));
        assert_eq!(Param::Adc.score(zero.view(), &cfg), 0.0);

        let neg = Array3::from_elem((2, 1, 1), -1.0);
        assert_eq!(Param::Adc.score(neg.view(), &cfg), 0.0);

        // 次正规数的倒数为 +inf.
        let tiny = Array3::from_elem((1, 1, 1), 1e-310);
        assert_eq!(Param::Adc.score(tiny.view(), &cfg), 0.0);
    }

    #[test]
    fn test_overflowing_mean_is_zero() {
        let cfg = ScoreConfig::default();
        let huge = Array3::from_elem((1, 1, 2), f64::MAX);
        assert_eq!(Param::Score.score(huge.view(), &cfg), 0.0);
        assert_eq!(Param::Kurtosis.score(huge.view(), &cfg), 0.0);
        assert_eq!(Param::Adc.score(huge.view(), &cfg), 0.0);
    }

    #[test]
    fn test_kurtosis_and_mean() {
        let cfg = ScoreConfig::default();
        let a = Array3::from_shape_vec((1, 1, 4), vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        assert!(float_eq(Param::Score.score(a.view(), &cfg), 3.0));
        assert!(float_eq(Param::Kurtosis.score(a.view(), &cfg), 0.003));
        assert_eq!(Param::Unknown.score(a.view(), &cfg), 0.0);
    }

    #[test]
    fn test_lenient_containment() {
        let cfg = ScoreConfig::default();
        let lenient = Param::Mask(Containment::Lenient);

        // 1 / 5 = 20%, 恰好达到门限.
        let a = Array3::from_shape_vec((1, 1, 5), vec![1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(lenient.score(a.view(), &cfg), 1.0);

        // 1 / 6 < 20%.
        let b = Array3::from_shape_vec((1, 1, 6), vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(lenient.score(b.view(), &cfg), BANNED_SCORE);

        let cfg = ScoreConfig::new(0.1).unwrap();
        assert_eq!(lenient.score(b.view(), &cfg), 1.0);
    }

    #[test]
    fn test_strict_containment() {
        let cfg = ScoreConfig::default();
        let strict = Param::Mask(Containment::Strict);
        let full = Array3::from_elem((2, 2, 2), 1.0);
        assert_eq!(strict.score(full.view(), &cfg), 1.0);

        let mut partial = full.clone();
        partial[(1, 1, 1)] = 0.0;
        assert_eq!(strict.score(partial.view(), &cfg), BANNED_SCORE);
    }

    #[test]
    fn test_score_config_range() {
        assert!(ScoreConfig::new(-0.1).is_none());
        assert!(ScoreConfig::new(1.1).is_none());
        assert!(ScoreConfig::new(f64::NAN).is_none());
        assert!(ScoreConfig::new(0.0).is_some());
        assert!(float_eq(ScoreConfig::default().containment_fraction(), 0.2));
    }
}
