//! Serving side: trained units, the registry that holds them, and the
//! prediction pipeline

mod pipeline;
mod registry;
pub(crate) mod unit;

pub use pipeline::PredictionPipeline;
pub use registry::ModelRegistry;
pub use unit::ScalerModelUnit;
