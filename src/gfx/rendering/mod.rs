//! Pass ordering and pipeline construction
//!
//! [`PassTracker`] enforces the order scene stages run in. The pipeline
//! helpers build every render and compute pipeline from the global
//! [`RenderState`](crate::gfx::backend::RenderState).

pub mod pass_tracker;
pub mod pipeline;

pub use pass_tracker::{PassTracker, Stage};
pub use pipeline::{DepthConfig, PipelineConfig};
