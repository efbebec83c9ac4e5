//! Data models for the tag index
//!
//! Each sub-module covers one persisted or transported shape.

mod events;
mod record;
mod subscription;
pub mod tags;
mod transient;
mod uri;

pub use events::*;
pub use record::*;
pub use subscription::*;
pub use tags::{TagDeltas, TagMap};
pub use transient::*;
pub use uri::*;
