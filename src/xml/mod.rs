//! Streaming XML machinery: path-dispatched pull parsing and bounded
//! element trees.

pub mod pull;
pub mod tree;

pub use pull::{ElementCursor, PathDispatchParser};
pub use tree::XmlElement;
