//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx2dF};

pub use crate::error::MetricError;

pub use crate::grid::{Bitmap, CellMask, Patch, SegmentGrid};

pub use crate::trace::{best_center, clockwise_trace, BorderTrace};

pub use crate::hull::{convex_hull, min_bounding_box, ConvexHull, MinBoundingBoxes};

pub use crate::axis::EccentricityFormula;

pub use crate::texture::{HaralickMatrix, NoTexture, TextureSource};

pub use crate::linalg::{DenseEigh, EighSolver};

pub use crate::extract::{cell_metrics, extract_image, CellRecord, ImageDataset, Metrics};

pub use crate::track::{
    outlier_cells, outlier_cells_per_image, pca_averages, pca_image_set, pca_single_image,
    project_statistics, rank_metrics, rank_metrics_single_image, ImageSample, PcaProjection,
    ProjectStatistics, RankCondition,
};

pub use crate::consts::{key, SHAPE_KEYS};
