//! 参数图, 掩膜, 窗口和子区域等基础数据结构.

pub mod iter;
pub mod mask;
pub mod subregion;
pub mod volume;
pub mod window;

pub use iter::OriginIter;
pub use mask::{Mask, Mask3D, MaskCheck, Pad, Padding};
pub use subregion::{Indexing, Subregion};
pub use volume::{check_spacing, Volume, VolumeMeta};
pub use window::{sliding_windows, WindowShape};
