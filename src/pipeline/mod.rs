//! Pipeline driver (spec.md §4.E): stage registry, per-chain checkpointed
//! execution, and atomic state persistence.

pub mod driver;
pub mod registry;
pub mod state;

pub use driver::{run_chain, ChainContext, StructuralAligner};
pub use registry::{StageId, STAGE_ORDER};
pub use state::PipelineState;
