//! Birdtag API Library
//!
//! HTTP boundary over the birdtag services: request parsing, response shapes,
//! error rendering and application setup.

mod handlers;
mod telemetry;

pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, Collaborators};
