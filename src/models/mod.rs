//! Data models for the board backend.
//!
//! Field names serialize as camelCase to match the frontend contract.

mod comment;
mod post;
mod review;
mod search;
mod tag;
mod user;

pub use comment::*;
pub use post::*;
pub use review::*;
pub use search::*;
pub use tag::*;
pub use user::*;
