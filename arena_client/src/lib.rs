//! `arena_client`
//!
//! Client-side state engine for the arena shooter:
//! - Network session (WebSocket, heartbeat, offline fallback)
//! - Local prediction and remote interpolation
//! - Reconciliation of authoritative messages
//! - Projectile simulation and the offline match
//! - Fixed-timestep loop driving a renderer seam

pub mod game;
pub mod game_loop;
pub mod input;
pub mod interp;
pub mod offline;
pub mod prediction;
pub mod projectile;
pub mod reconcile;
pub mod session;
pub mod spawn;
pub mod timer;

pub use game::GameContext;
pub use game_loop::GameLoop;
