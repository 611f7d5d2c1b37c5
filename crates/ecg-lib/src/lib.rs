pub mod classifier;
pub mod config;
pub mod error;
pub mod io;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pipeline;
pub mod plot;
pub mod record;

pub use classifier::*;
pub use error::*;
pub use pipeline::*;
pub use record::*;

pub use ndarray;
