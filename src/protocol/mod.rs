//! protocol
//!
//! Closed vocabulary shared by both backends.
//!
//! # Design
//!
//! Every enum here has a canonical string encoding that is used both as a
//! CLI argument (`--depth infinity`) and as a parsed output token. Parsing
//! is strict: an unrecognized token never silently coerces to a known
//! variant.

mod conflict;
mod depth;
mod event;
mod node_kind;
mod revision;

pub use conflict::{ConflictOperation, ConflictReason};
pub use depth::Depth;
pub use event::EventAction;
pub use node_kind::NodeKind;
pub use revision::Revision;
