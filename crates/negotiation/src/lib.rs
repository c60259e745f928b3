//! Optica capability negotiation.
//!
//! Pure, deterministic building blocks the capture engine composes during a
//! reconfiguration:
//!
//! 1. **Scoring** each format of a lens against quality criteria.
//! 2. **Ranking** a catalog by score (stable, descending).
//! 3. **Selection** of the best admissible format for a target.
//! 4. **Zoom weighting**: mapping one logical zoom value onto the physical
//!    lens that should serve it and that lens's native zoom factor.

pub mod ranking;
pub mod scoring;
pub mod selection;
pub mod zoom;

pub use ranking::*;
pub use scoring::*;
pub use selection::*;
pub use zoom::*;
