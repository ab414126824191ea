//! Runtime-mutable configuration overlay: a versioned, path-addressed,
//! schema-constrained document edited copy-on-write. Every edit returns a
//! new immutable instance; the znode version is carried through and
//! reconciled by the caller via the optimistic document protocol.

mod config_overlay;
mod editable;
pub use config_overlay::*;
pub use editable::*;
