//! Types shared between the match server and the browser renderer.

pub mod config;
pub mod protocol;
pub mod team;
pub mod vec2;
