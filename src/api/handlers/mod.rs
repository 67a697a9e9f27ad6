//! API handlers for Scoutline.
//!
//! The auth module carries the identity core; everything else here is the
//! thin operational surface around it.

pub mod auth;
pub mod health;
