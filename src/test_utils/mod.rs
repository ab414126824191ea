//! Test doubles shared across unit tests.

mod memory_coordination;
pub use memory_coordination::*;
