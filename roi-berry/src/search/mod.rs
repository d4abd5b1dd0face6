//! 多尺度 ROI 搜索.
//!
//! 流程:
//!
//! 1. 对每个窗口形状, 扫描全部合法原点并逐通道评分 ([`roi_scores`]);
//! 2. 逐通道按最大值归一化后求和, 选出前 N 个候选并累加到与图像同形的分数图
//!   ([`scoremap_with_candidates`]);
//! 3. 对所有窗口形状的分数图求和 ([`multi_scale_scoremap`]);
//! 4. 以目标 ROI 形状在汇总分数图上再搜索一次, 取唯一候选 ([`find_roi`]).

mod aggregate;
mod locate;
mod scan;

pub use aggregate::{
    accumulate, combine, multi_scale_scoremap, normalize_channels, scoremap_with_candidates,
    top_candidates, Candidate,
};
pub use locate::{find_roi, find_roi_with_cancel, RoiResult};
pub use scan::{roi_scores, ScoreMap};
