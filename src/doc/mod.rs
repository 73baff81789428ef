//! Document model adapter.
//!
//! Owns the note tree and is the only code that mutates it. Positions use
//! the token model: a text node is as wide as its chars, an atom is one
//! position, every other node adds an opening and a closing token around
//! its content. The root's content starts at position 0.

pub mod document;
pub mod layout;
pub mod schema;
pub mod transaction;

pub use document::{Document, DocError, FlatText, ResolvedPos, descendants, node_at, resolve};
pub use layout::{LineKind, LineLayout, PositionResolver};
pub use transaction::{Applied, Mapping, StepMap, Transaction};
