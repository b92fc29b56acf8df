//! Knowledge Base module - the reference corpus as an associative graph.
//!
//! The knowledge graph consists of:
//! - **Tags**: Nodes naming cards, elements, suits, patterns, and themes
//! - **Passages**: Reference text associated with one or more tags
//! - **Associations**: Weighted edges between tags

mod builtin;
mod graph;
mod passage;
mod tag;

pub use builtin::*;
pub use graph::*;
pub use passage::*;
pub use tag::*;
