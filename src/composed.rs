/// Structural kind of a host-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    ShadowRoot,
    Element,
}

/// Read-only access to a host tree, in terms of its *literal* structure.
///
/// Implement this for your DOM layer; the composed-tree functions below and
/// the query engine are generic over it. `Node` is an opaque handle; the
/// host tree is never copied or mutated through this trait, and every method
/// reflects the host state at call time.
pub trait TreeView {
    type Node: Copy + Eq;

    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Literal element children of `node`, in tree order.
    fn child_elements(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Literal parent, only when that parent is itself an element.
    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;

    /// Previous literal sibling that is an element.
    fn previous_sibling_element(&self, node: Self::Node) -> Option<Self::Node>;

    /// Next literal sibling that is an element.
    fn next_sibling_element(&self, node: Self::Node) -> Option<Self::Node>;

    /// Root of the literal tree containing `node` (a document or shadow root).
    fn root(&self, node: Self::Node) -> Self::Node;

    /// Host element of a shadow root.
    fn host(&self, shadow_root: Self::Node) -> Option<Self::Node>;

    /// The document's root element.
    fn document_element(&self, document: Self::Node) -> Option<Self::Node>;

    /// The shadow root attached to `element`, if any.
    fn shadow_root(&self, element: Self::Node) -> Option<Self::Node>;

    /// True if `element` is a content-projection point.
    fn is_slot(&self, element: Self::Node) -> bool;

    /// The slot `element` is assigned to, if any.
    fn assigned_slot(&self, element: Self::Node) -> Option<Self::Node>;

    /// Elements assigned to `slot`, in assignment order.
    fn assigned_elements(&self, slot: Self::Node) -> Vec<Self::Node>;

    /// Tag name as the structural property reports it (HTML elements report
    /// ASCII uppercase; the original spelling survives only in the markup).
    fn tag_name(&self, element: Self::Node) -> String;

    fn element_id(&self, element: Self::Node) -> Option<String>;

    fn has_class(&self, element: Self::Node, class_name: &str) -> bool;

    fn attr(&self, element: Self::Node, name: &str) -> Option<String>;

    fn namespace_uri(&self, element: Self::Node) -> Option<String>;

    /// Serialized outer markup of `element`. Used to recover the
    /// original-case tag name for namespace-aware lookups.
    fn outer_markup(&self, element: Self::Node) -> String;
}

/// Role a node plays when resolving its composed children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Document,
    ShadowRoot,
    ShadowHost,
    Slot,
    Plain,
}

fn role<T: TreeView>(view: &T, node: T::Node) -> Role {
    match view.kind(node) {
        NodeKind::Document => Role::Document,
        NodeKind::ShadowRoot => Role::ShadowRoot,
        NodeKind::Element => {
            if view.shadow_root(node).is_some() {
                Role::ShadowHost
            } else if view.is_slot(node) {
                Role::Slot
            } else {
                Role::Plain
            }
        }
    }
}

/// Ordered composed-tree children of `node`.
///
/// A document exposes its root element; a shadow host exposes its shadow
/// root's children instead of its light children; a slot exposes its
/// assigned elements, falling back to its own children when nothing is
/// assigned; everything else exposes its literal children.
pub fn composed_children<T: TreeView>(view: &T, node: T::Node) -> Vec<T::Node> {
    match role(view, node) {
        Role::Document => view.document_element(node).into_iter().collect(),
        Role::ShadowRoot => view.child_elements(node),
        Role::ShadowHost => match view.shadow_root(node) {
            Some(shadow) => view.child_elements(shadow),
            None => Vec::new(),
        },
        Role::Slot => {
            let assigned = view.assigned_elements(node);
            if assigned.is_empty() {
                view.child_elements(node)
            } else {
                assigned
            }
        }
        Role::Plain => view.child_elements(node),
    }
}

/// Composed-tree parent of `element`.
///
/// A slotted element ignores its literal parent and reports the parent of
/// the slot it is assigned to, unless the element is itself a slot, in
/// which case the literal parent is used. An element at the top of a shadow
/// tree crosses the boundary and reports the shadow host.
pub fn composed_parent<T: TreeView>(view: &T, element: T::Node) -> Option<T::Node> {
    if !view.is_slot(element) {
        if let Some(slot) = view.assigned_slot(element) {
            if let Some(parent) = view.parent_element(slot) {
                return Some(parent);
            }
        }
    }
    if let Some(parent) = view.parent_element(element) {
        return Some(parent);
    }
    let root = view.root(element);
    if view.kind(root) == NodeKind::ShadowRoot {
        return view.host(root);
    }
    None
}

/// Previous sibling of `element` in composed-tree sibling order: within its
/// slot's assigned list when the element is slotted, literal element order
/// otherwise.
pub fn previous_composed_sibling<T: TreeView>(view: &T, element: T::Node) -> Option<T::Node> {
    if !view.is_slot(element) {
        if let Some(slot) = view.assigned_slot(element) {
            let assigned = view.assigned_elements(slot);
            let position = assigned.iter().position(|node| *node == element)?;
            return position.checked_sub(1).map(|prev| assigned[prev]);
        }
    }
    view.previous_sibling_element(element)
}
