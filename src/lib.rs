mod cluster;
mod config;
mod coordination;
mod errors;
mod optimistic;
mod overlay;
mod props;
mod sync;

pub use cluster::*;
pub use config::*;
pub use coordination::*;
pub use errors::*;
pub use optimistic::*;
pub use overlay::*;
pub use props::*;
pub use sync::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
