use log::trace;

use crate::composed::{NodeKind, TreeView, composed_parent};
use crate::matcher::{NativeMatcher, matches_chain};
use crate::selector::{SelectorList, parse};
use crate::walker::TreeWalker;
use crate::{Error, Result};

/// Selector queries over one host tree.
///
/// Bundles the tree view with the native matcher the compound matcher
/// delegates pseudo-class and attribute clauses to. Every operation takes
/// its context or subject node explicitly; there is no ambient document and
/// no state shared between calls: each call parses its own selector and
/// walks with its own cursor, so results are point-in-time snapshots.
pub struct QueryEngine<'env, T: TreeView, M: NativeMatcher<T>> {
    view: &'env T,
    native: &'env M,
}

impl<'env, T: TreeView, M: NativeMatcher<T>> QueryEngine<'env, T, M> {
    pub fn new(view: &'env T, native: &'env M) -> Self {
        Self { view, native }
    }

    /// First element below `context` matching any alternative of `selector`,
    /// in composed pre-order. Stops walking at the first hit.
    pub fn query_selector(&self, selector: &str, context: T::Node) -> Result<Option<T::Node>> {
        let list = parse(selector)?;
        for element in TreeWalker::new(self.view, context) {
            if self.matches_list(element, &list) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// Every element below `context` matching any alternative of `selector`,
    /// in composed pre-order. Each element is visited exactly once, so the
    /// result holds no duplicates.
    pub fn query_selector_all(&self, selector: &str, context: T::Node) -> Result<Vec<T::Node>> {
        let list = parse(selector)?;
        let mut visited = 0usize;
        let mut matched = Vec::new();
        for element in TreeWalker::new(self.view, context) {
            visited += 1;
            if self.matches_list(element, &list) {
                matched.push(element);
            }
        }
        trace!(
            "query_selector_all({selector:?}): {} of {visited} visited elements matched",
            matched.len()
        );
        Ok(matched)
    }

    /// Elements below `context` with the given tag name, ASCII
    /// case-insensitively; `"*"` matches every element.
    pub fn elements_by_tag_name(&self, name: &str, context: T::Node) -> Vec<T::Node> {
        TreeWalker::new(self.view, context)
            .filter(|element| name == "*" || self.view.tag_name(*element).eq_ignore_ascii_case(name))
            .collect()
    }

    /// Namespace-aware tag lookup. The local name is compared case
    /// sensitively against the original-case tag name recovered from the
    /// element's serialized markup (the structural tag-name property may
    /// have been normalized to uppercase). `"*"` wildcards either axis; an
    /// empty namespace matches nothing at all.
    pub fn elements_by_tag_name_ns(
        &self,
        namespace: &str,
        name: &str,
        context: T::Node,
    ) -> Vec<T::Node> {
        if namespace.is_empty() {
            return Vec::new();
        }
        TreeWalker::new(self.view, context)
            .filter(|element| {
                let ns_matches = namespace == "*"
                    || self.view.namespace_uri(*element).as_deref() == Some(namespace);
                ns_matches && (name == "*" || self.original_case_tag(*element) == name)
            })
            .collect()
    }

    /// Elements below `context` carrying *all* of the whitespace-separated
    /// class tokens in `names`. No tokens, no matches.
    pub fn elements_by_class_name(&self, names: &str, context: T::Node) -> Vec<T::Node> {
        let tokens: Vec<&str> = names.split_ascii_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        TreeWalker::new(self.view, context)
            .filter(|element| {
                tokens
                    .iter()
                    .all(|token| self.view.has_class(*element, token))
            })
            .collect()
    }

    /// Elements below `context` whose `name` attribute equals `name`
    /// exactly. The context must be a document or shadow root.
    pub fn elements_by_name(&self, name: &str, context: T::Node) -> Result<Vec<T::Node>> {
        self.require_document_like(context)?;
        Ok(TreeWalker::new(self.view, context)
            .filter(|element| self.view.attr(*element, "name").as_deref() == Some(name))
            .collect())
    }

    /// First element below `context` with the given id; stops walking at the
    /// first hit. The context must be a document or shadow root.
    pub fn element_by_id(&self, id: &str, context: T::Node) -> Result<Option<T::Node>> {
        self.require_document_like(context)?;
        for element in TreeWalker::new(self.view, context) {
            if self.view.element_id(element).as_deref() == Some(id) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// True if `element` itself matches any alternative of `selector`. No
    /// traversal; rejects anything that is not an element.
    pub fn matches(&self, selector: &str, element: T::Node) -> Result<bool> {
        self.require_element(element)?;
        let list = parse(selector)?;
        Ok(self.matches_list(element, &list))
    }

    /// Nearest of `element` and its composed-tree ancestors matching any
    /// alternative of `selector`, or `None` once the root is exhausted.
    pub fn closest(&self, selector: &str, element: T::Node) -> Result<Option<T::Node>> {
        self.require_element(element)?;
        let list = parse(selector)?;
        let mut cursor = Some(element);
        while let Some(current) = cursor {
            if self.matches_list(current, &list) {
                return Ok(Some(current));
            }
            cursor = composed_parent(self.view, current);
        }
        Ok(None)
    }

    fn matches_list(&self, element: T::Node, list: &SelectorList) -> bool {
        list.chains
            .iter()
            .any(|chain| matches_chain(self.view, self.native, element, &chain.nodes))
    }

    fn original_case_tag(&self, element: T::Node) -> String {
        let markup = self.view.outer_markup(element);
        match tag_from_markup(&markup) {
            Some(tag) => tag,
            None => self.view.tag_name(element),
        }
    }

    fn require_document_like(&self, context: T::Node) -> Result<()> {
        match self.view.kind(context) {
            NodeKind::Document | NodeKind::ShadowRoot => Ok(()),
            NodeKind::Element => Err(Error::InvalidContext(
                "context must be a document or shadow root".into(),
            )),
        }
    }

    fn require_element(&self, node: T::Node) -> Result<()> {
        match self.view.kind(node) {
            NodeKind::Element => Ok(()),
            NodeKind::Document | NodeKind::ShadowRoot => {
                Err(Error::InvalidElement("target must be an element".into()))
            }
        }
    }
}

/// Original-case tag token of a serialized element: the run after the
/// opening `<` up to the first whitespace, `/`, or `>`.
fn tag_from_markup(markup: &str) -> Option<String> {
    let rest = markup.strip_prefix('<')?;
    let end = rest
        .find(|ch: char| ch.is_ascii_whitespace() || ch == '>' || ch == '/')
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(rest[..end].to_string())
}
