// src/engine/mod.rs

pub mod buffer;
pub mod catalog;
pub mod score;
pub mod session;
pub mod snapshot;
pub mod timer;
