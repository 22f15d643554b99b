//! Data models for the CrewSync backend.
//!
//! Field names serialize in camelCase so stored documents keep the layout clients expect.

mod invitation;
mod member;
mod role;
mod team;
mod user;

pub use invitation::*;
pub use member::*;
pub use role::*;
pub use team::*;
pub use user::*;
