use crate::Result;
use crate::composed::{TreeView, composed_parent, previous_composed_sibling};
use crate::selector::{Combinator, SelectorNode};

/// Host-supplied tester for the selector fragments this engine does not
/// interpret itself: single pseudo-class or attribute clauses, passed as the
/// self-contained source text the parser attached to the node.
///
/// A failure (`Err`) is treated by the engine exactly like a non-match; see
/// `matches_simple`. Substitutable by a fake in tests.
pub trait NativeMatcher<T: TreeView + ?Sized> {
    fn test(&self, view: &T, element: T::Node, fragment: &str) -> Result<bool>;
}

/// Test one element against one selector chain.
///
/// The chain is consumed right-to-left. Simple-selector nodes must all hold
/// on the current element; a combinator node turns the remaining (left)
/// chain into a requirement on a related element:
///
/// - descendant: some composed-tree ancestor, nearest first, must satisfy
///   the whole remaining chain. Candidates that satisfy the adjacent
///   compound but break the rest of the chain are not final: the search
///   keeps climbing until a more distant ancestor satisfies everything or
///   the ancestors run out.
/// - child: the immediate composed-tree parent must satisfy the remaining
///   chain; there is no other candidate.
/// - next sibling: likewise for the nearest previous composed sibling.
/// - subsequent sibling: some previous composed sibling, nearest first.
///
/// Candidate enumeration is iterative; recursion happens only per
/// combinator, so stack growth is bounded by the chain length.
pub fn matches_chain<T, M>(view: &T, native: &M, element: T::Node, nodes: &[SelectorNode]) -> bool
where
    T: TreeView,
    M: NativeMatcher<T>,
{
    if nodes.is_empty() || matches!(nodes.last(), Some(SelectorNode::Combinator(_))) {
        return false;
    }

    let mut end = nodes.len();
    while end > 0 {
        match &nodes[end - 1] {
            SelectorNode::Combinator(combinator) => {
                let rest = &nodes[..end - 1];
                return match combinator {
                    Combinator::Descendant => {
                        let mut cursor = composed_parent(view, element);
                        while let Some(ancestor) = cursor {
                            if matches_chain_guarded(view, native, ancestor, rest) {
                                return true;
                            }
                            cursor = composed_parent(view, ancestor);
                        }
                        false
                    }
                    Combinator::Child => composed_parent(view, element)
                        .is_some_and(|parent| matches_chain_guarded(view, native, parent, rest)),
                    Combinator::NextSibling => previous_composed_sibling(view, element)
                        .is_some_and(|sibling| matches_chain_guarded(view, native, sibling, rest)),
                    Combinator::SubsequentSibling => {
                        let mut cursor = previous_composed_sibling(view, element);
                        while let Some(sibling) = cursor {
                            if matches_chain_guarded(view, native, sibling, rest) {
                                return true;
                            }
                            cursor = previous_composed_sibling(view, sibling);
                        }
                        false
                    }
                };
            }
            simple => {
                if !matches_simple(view, native, element, simple) {
                    return false;
                }
                end -= 1;
            }
        }
    }

    true
}

fn matches_chain_guarded<T, M>(
    view: &T,
    native: &M,
    element: T::Node,
    nodes: &[SelectorNode],
) -> bool
where
    T: TreeView,
    M: NativeMatcher<T>,
{
    stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
        matches_chain(view, native, element, nodes)
    })
}

fn matches_simple<T, M>(view: &T, native: &M, element: T::Node, node: &SelectorNode) -> bool
where
    T: TreeView,
    M: NativeMatcher<T>,
{
    match node {
        SelectorNode::Universal => true,
        SelectorNode::Tag(name) => view.tag_name(element).eq_ignore_ascii_case(name),
        SelectorNode::Id(id) => view.element_id(element).as_deref() == Some(id.as_str()),
        SelectorNode::Class(class_name) => view.has_class(element, class_name),
        // A fragment the native matcher cannot evaluate reads as a
        // non-match, indistinguishable from a genuine one.
        SelectorNode::Attribute { source } | SelectorNode::Pseudo { source } => {
            native.test(view, element, source).unwrap_or(false)
        }
        SelectorNode::Combinator(_) => false,
    }
}
