//! 通用常量.

/// 参数图通道名称.
pub mod params {
    /// ADC (表观扩散系数) 通道名前缀.
    pub const ADC_PREFIX: &str = "ADC";

    /// 峰度 (kurtosis) 类通道名前缀.
    pub const KURTOSIS_PREFIX: &str = "K";

    /// 通用分数通道名前缀.
    pub const SCORE_PREFIX: &str = "score";

    /// 宽松包含通道名. 窗口中至少有一定比例的掩膜体素被选中即可.
    pub const MASK_LENIENT: &str = "prostate_mask";

    /// 严格包含通道名. 窗口必须完全位于掩膜内.
    pub const MASK_STRICT: &str = "prostate_mask_strict";

    /// 汇总分数图被重新扫描时使用的通道名.
    pub const SCOREMAP: &str = "score";
}

/// 被禁止的候选窗口的分数. 足够小, 使其在任何求和后都不可能被选中.
pub const BANNED_SCORE: f64 = -1e20;

/// 宽松包含策略下, 窗口内掩膜体素被选中的最低比例.
pub const DEFAULT_CONTAINMENT_FRACTION: f64 = 0.2;

/// 参考掩膜 (如病灶) 允许位于容器掩膜 (如前列腺) 之外的默认比例.
pub const DEFAULT_ALLOWED_OUTSIDE: f64 = 0.2;

/// 比较体素分辨率时默认保留的小数位数.
pub const DEFAULT_SPACING_DECIMALS: u32 = 3;

/// ADC 通道的合理取值范围, 用于裁剪离群值.
pub const ADC_CLIP: (f64, f64) = (0.0, 0.002);

/// 峰度类通道的合理取值范围, 用于裁剪离群值.
pub const KURTOSIS_CLIP: (f64, f64) = (0.0, 2.0);

/// 峰度类分数的线性衰减因子.
pub const KURTOSIS_DAMPING: f64 = 1000.0;

/// 文本文件中的注释前缀.
pub const COMMENT_PREFIX: char = '#';
