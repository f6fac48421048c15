// src/lib.rs

pub mod cli;
pub mod diff;
pub mod error;
pub mod graph;
pub mod layout;
pub mod log;
pub mod model;
pub mod renderer;
pub mod runner;
pub mod session;

pub use error::{JjError, Result};
