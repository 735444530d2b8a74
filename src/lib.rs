//! Flowchart layout and hit-testing core.
//!
//! A [`layout::Layout`] positions nodes and pads from the [`graph`] model and
//! walks it into a [`layout::DisplayList`]; a [`hit::Area`] built from that
//! list resolves pointer positions back to nodes and pads.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod hit;
pub mod ids;
pub mod interaction;
pub mod layout;
pub mod layout_dump;
pub mod model;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{Error, Result};
