//! # Tarot Rules
//!
//! The "Deck Bible" crate - the card catalog, correspondences, deck alias sets,
//! spreads, and the archetypal pattern catalog. This crate is the single source
//! of truth for deck data and does not contain any generation logic.

pub mod cards;
pub mod deck;
pub mod patterns;
pub mod spread;

pub use cards::*;
pub use deck::*;
pub use patterns::*;
pub use spread::*;
