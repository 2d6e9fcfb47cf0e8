//! `iso_shared`
//!
//! Shared libraries for the isometric world client.
//!
//! Design goals:
//! - Deterministic and pure where practical (math, projection, tables).
//! - Grid and screen space kept apart by type.
//! - The render engine is a trait; the core only writes into it.
//! - No `unsafe`.

pub mod chat;
pub mod config;
pub mod iso;
pub mod map;
pub mod math;
pub mod monster;
pub mod net;
pub mod render;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::chat::*;
    pub use crate::config::*;
    pub use crate::iso::*;
    pub use crate::map::*;
    pub use crate::math::*;
    pub use crate::monster::*;
    pub use crate::net::*;
    pub use crate::render::*;
}
