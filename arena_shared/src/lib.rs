//! `arena_shared`
//!
//! Types shared by the arena client and its tests.
//!
//! Design goals:
//! - Closed wire protocol that fails closed on malformed frames.
//! - Entity store without policy; policy lives in `arena_client`.
//! - No `unsafe`.

pub mod config;
pub mod entity;
pub mod event;
pub mod math;
pub mod net;
pub mod physics;
pub mod render;
pub mod store;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::entity::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::physics::*;
    pub use crate::store::*;
}
