//! Soccer match server library.
//!
//! This module exposes the simulation engine and server components for use
//! in tests and binaries.

pub mod ai;
pub mod ball;
pub mod boundary;
pub mod clock;
pub mod collision;
pub mod config;
pub mod control;
pub mod effects;
pub mod engine;
pub mod field;
pub mod game_loop;
pub mod match_state;
pub mod physics;
pub mod protocol;
pub mod recovery;
pub mod ws;
