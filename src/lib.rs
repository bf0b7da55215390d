//! Structural domain partition and ECOD classification pipeline.
//!
//! Parses a predicted protein structure (atomic coordinates plus a
//! residue-pair confidence matrix) into structural domains and assigns each
//! domain to a reference ECOD classification (T-group / H-group) with a
//! confidence label, via a 24-stage per-chain pipeline.
//!
//! ## Layout
//!
//! - [`resid`] / [`structure`] / [`hits`] / [`domain`] — the data model.
//! - [`parsers`] — tolerant parsers for external tool output.
//! - [`refdata`] — ECOD hierarchy, template metadata, classifier checkpoint.
//! - [`probability_tables`] — fixed lookup tables for stage 13.
//! - [`classifier`] — the fixed feed-forward network (stage 16).
//! - [`merge`] — union-find and connectivity helpers for stages 19-22.
//! - [`stages`] — one module per pipeline stage (1-24, no stage 14).
//! - [`pipeline`] — the stage registry and per-chain checkpointed driver.

pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod hits;
pub mod merge;
pub mod parsers;
pub mod pipeline;
pub mod probability_tables;
pub mod refdata;
pub mod resid;
pub mod stages;
pub mod structure;

pub use domain::{Classification, Domain, DomainAssignment, FinalLabel, Quality};
pub use error::{StageError, StageResult};
pub use hits::{Hit, HitEvidence, SequenceHit, StructuralHit};
pub use resid::{ResId, ResSet};
pub use structure::Structure;
