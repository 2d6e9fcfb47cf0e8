//! `iso_client`
//!
//! Client-side systems:
//! - Pointer input mapping and UI capture
//! - Entity registry keyed by session id
//! - Interpolation toward server-reported cells
//! - Facing and walk/idle animation selection
//! - Per-frame render updates
//! - Reconnecting network task and session lifecycle

pub mod anim;
pub mod client;
pub mod conn;
pub mod frame;
pub mod input;
pub mod interp;
pub mod registry;
pub mod world;

pub use client::Session;
pub use world::World;
