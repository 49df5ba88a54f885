//! Data collection pipeline - multi-source fusion with graceful degradation
//!
//! Data flows strictly left to right: address -> coordinates -> property
//! attributes -> location features + comparables. Each stage has a real
//! path and a documented fallback; source failures never propagate past
//! their collector.

pub mod address;
pub mod cache;
pub mod client;
pub mod comps;
pub mod geo;
pub mod geocode;
pub mod location;
pub mod property;
pub mod types;

pub use types::*;
