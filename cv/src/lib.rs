mod image;
pub use image::*;

pub mod cell;
pub mod grid;
pub mod similarity;

pub use cell::{CellFeatures, ColorBucket, ColorProfile, EMPTY_CELL_VARIANCE};
pub use grid::{Roi, compute_grid};
pub use similarity::Algorithm;
