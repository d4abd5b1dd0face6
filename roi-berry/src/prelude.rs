//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{Indexing, Mask, Mask3D, MaskCheck, Pad, Subregion, Volume, WindowShape};

pub use crate::config::{CornerStrategy, SearchConfig};
pub use crate::score::{Containment, Param, ScoreConfig};

pub use crate::error::{RoiError, SearchResult};

pub use crate::search::{find_roi, find_roi_with_cancel, RoiResult};
