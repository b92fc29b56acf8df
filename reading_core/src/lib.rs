//! # Reading Core
//!
//! The generation-and-validation pipeline for tarot readings. This crate
//! reads deck data from `tarot_rules`, derives symbolic structure from the
//! drawn cards, retrieves supporting passages through an associative graph,
//! and turns a bounded prompt into a gated narrative.
//!
//! ## Core Components
//!
//! - **analysis**: Elemental dignities, spread themes, and archetypal patterns
//! - **knowledge_base**: The tagged reference corpus and its association graph
//! - **retrieval**: Passage selection by spreading activation
//! - **context_assembler**: Prompt assembly under a token budget
//! - **generation**: The backend chain, ending in a local composer
//! - **quality**: The structural gate and the safe fallback narrative
//! - **evaluator**: Learned scoring, detached or as a synchronous gate
//! - **pipeline**: The stages wired together per request
//!
//! ## Design Philosophy
//!
//! - **Always Answer**: Every well-formed request gets a narrative; failures
//!   below chain exhaustion are recovered inside the pipeline
//! - **Deterministic Core**: Analysis, retrieval, and assembly are pure for a
//!   given input
//! - **Gated Output**: No narrative leaves without passing the structural gate

pub mod analysis;
pub mod config;
pub mod context_assembler;
pub mod error;
pub mod evaluator;
pub mod generation;
pub mod knowledge_base;
pub mod metrics;
pub mod pipeline;
pub mod quality;
pub mod request;
pub mod retrieval;
pub mod telemetry;
pub mod tokens;

pub use analysis::*;
pub use config::*;
pub use context_assembler::*;
pub use error::*;
pub use evaluator::*;
pub use generation::*;
pub use knowledge_base::*;
pub use metrics::*;
pub use pipeline::*;
pub use quality::*;
pub use request::*;
pub use retrieval::*;
pub use tokens::*;
