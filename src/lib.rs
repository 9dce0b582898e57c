use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidSelector(String),
    InvalidContext(String),
    InvalidElement(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSelector(selector) => write!(f, "invalid selector: {selector}"),
            Self::InvalidContext(msg) => write!(f, "invalid context: {msg}"),
            Self::InvalidElement(msg) => write!(f, "invalid element: {msg}"),
        }
    }
}

impl StdError for Error {}

mod composed;
mod dom;
mod matcher;
mod native;
mod query;
mod selector;
mod walker;

pub use composed::{
    NodeKind, TreeView, composed_children, composed_parent, previous_composed_sibling,
};
pub use dom::{Dom, NodeId};
pub use matcher::{NativeMatcher, matches_chain};
pub use native::StructuralMatcher;
pub use query::QueryEngine;
pub use selector::{Combinator, SelectorChain, SelectorList, SelectorNode, parse};
pub use walker::TreeWalker;
