//! Observer-facing types published by the player.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so a host can
//! forward them as JSON unchanged.

pub mod events;
