//! Image processing
//!
//! - `raster`: RGBA pixel buffer shared by the pipeline
//! - `segment`: heuristic background removal
//! - `codec`: decoding uploads, encoding results
//! - `filters`: editor adjustments

pub mod codec;
pub mod filters;
pub mod raster;
pub mod segment;

pub use codec::{CodecError, OutputFormat};
pub use filters::{EditOptions, FilterError};
pub use raster::{Raster, RasterError};
pub use segment::{segment, Segmenter};
