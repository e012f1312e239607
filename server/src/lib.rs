//! Cosmic arena server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod entity;
pub mod error;
pub mod fanout;
pub mod game_loop;
pub mod highscore;
pub mod physics;
pub mod protocol;
pub mod round;
pub mod state;
pub mod ws;
