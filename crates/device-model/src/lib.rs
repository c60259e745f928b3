//! Optica Device Model
//!
//! Defines the data contracts shared by the negotiation engine and the
//! capture engine:
//! - **Formats:** Discrete capture modes a lens exposes (dimensions, frame
//!   rates, chroma subtype, focus system, HDR, binning)
//! - **Lenses:** Physical lenses, their roles, and the device topology
//! - **Session:** The caller's target and the committed session snapshot
//!
//! Everything here is immutable data enumerated at discovery time or
//! produced as a snapshot; no type in this crate talks to hardware.

pub mod format;
pub mod lens;
pub mod session;

pub use format::*;
pub use lens::*;
pub use session::*;
