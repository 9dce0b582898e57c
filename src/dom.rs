use std::collections::HashMap;

use crate::composed::{NodeKind, TreeView};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    ShadowRoot { host: NodeId },
    Element(ElementData),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag_name: String,
    namespace: Option<String>,
    attrs: HashMap<String, String>,
    shadow_root: Option<NodeId>,
    assigned_slot: Option<NodeId>,
    assigned: Vec<NodeId>,
}

impl ElementData {
    fn new(tag_name: String, namespace: Option<String>) -> Self {
        Self {
            tag_name,
            namespace,
            attrs: HashMap::new(),
            shadow_root: None,
            assigned_slot: None,
            assigned: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Deterministic in-memory host tree: a flat arena of nodes addressed by
/// `NodeId`, with a document at the root. Elements are created under a
/// parent and stay put; shadow roots hang off their host element rather
/// than living in its child list; slot assignment keeps back pointers in
/// both directions. Tag names are stored as written; `TreeView::tag_name`
/// reports the uppercased structural form while the serialized markup keeps
/// the original spelling.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn document(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub fn create_element(&mut self, parent: NodeId, tag_name: &str) -> NodeId {
        self.create_node(
            Some(parent),
            NodeData::Element(ElementData::new(tag_name.to_string(), None)),
        )
    }

    pub fn create_element_ns(&mut self, parent: NodeId, namespace: &str, tag_name: &str) -> NodeId {
        self.create_node(
            Some(parent),
            NodeData::Element(ElementData::new(
                tag_name.to_string(),
                Some(namespace.to_string()),
            )),
        )
    }

    pub fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::InvalidElement("attribute target is not an element".into()))?;
        element.attrs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Attach a shadow root to `host`. At most one per element, created once
    /// and owned by the host for its lifetime.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId> {
        let element = self
            .element(host)
            .ok_or_else(|| Error::InvalidElement("shadow host is not an element".into()))?;
        if element.shadow_root.is_some() {
            return Err(Error::InvalidElement(
                "element already hosts a shadow root".into(),
            ));
        }
        let shadow = self.create_node(None, NodeData::ShadowRoot { host });
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow);
        }
        Ok(shadow)
    }

    /// Assign `elements` to `slot`, replacing any previous assignment and
    /// maintaining the back pointers on the assigned elements.
    pub fn assign_slot(&mut self, slot: NodeId, elements: &[NodeId]) -> Result<()> {
        let is_slot = self
            .element(slot)
            .is_some_and(|element| element.tag_name.eq_ignore_ascii_case("slot"));
        if !is_slot {
            return Err(Error::InvalidElement(
                "assignment target is not a slot".into(),
            ));
        }
        for assigned in elements {
            if self.element(*assigned).is_none() {
                return Err(Error::InvalidElement(
                    "assigned node is not an element".into(),
                ));
            }
        }

        let previous = match self.element_mut(slot) {
            Some(element) => std::mem::replace(&mut element.assigned, elements.to_vec()),
            None => Vec::new(),
        };
        for old in previous {
            if let Some(element) = self.element_mut(old) {
                element.assigned_slot = None;
            }
        }
        for assigned in elements {
            if let Some(element) = self.element_mut(*assigned) {
                element.assigned_slot = Some(slot);
            }
        }
        Ok(())
    }

    fn element(&self, node_id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(node_id.0)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Document | NodeData::ShadowRoot { .. } => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node_id.0)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Document | NodeData::ShadowRoot { .. } => None,
        }
    }

    fn dump_node(&self, node_id: NodeId) -> String {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let Some(element) = self.element(node_id) else {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                return out;
            };

            let mut out = String::new();
            out.push('<');
            out.push_str(&element.tag_name);
            let mut attrs = element.attrs.iter().collect::<Vec<_>>();
            attrs.sort_by(|(left, _), (right, _)| left.cmp(right));
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr_for_serialization(value));
                out.push('"');
            }
            out.push('>');
            for child in &self.nodes[node_id.0].children {
                out.push_str(&self.dump_node(*child));
            }
            out.push_str("</");
            out.push_str(&element.tag_name);
            out.push('>');
            out
        })
    }
}

fn escape_attr_for_serialization(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

impl TreeView for Dom {
    type Node = NodeId;

    fn kind(&self, node: NodeId) -> NodeKind {
        match &self.nodes[node.0].data {
            NodeData::Document => NodeKind::Document,
            NodeData::ShadowRoot { .. } => NodeKind::ShadowRoot,
            NodeData::Element(_) => NodeKind::Element,
        }
    }

    fn child_elements(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        self.element(parent).map(|_| parent)
    }

    fn previous_sibling_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let children = &self.nodes[parent.0].children;
        let pos = children.iter().position(|id| *id == node)?;
        for sibling in children[..pos].iter().rev() {
            if self.element(*sibling).is_some() {
                return Some(*sibling);
            }
        }
        None
    }

    fn next_sibling_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let children = &self.nodes[parent.0].children;
        let pos = children.iter().position(|id| *id == node)?;
        for sibling in children.iter().skip(pos + 1) {
            if self.element(*sibling).is_some() {
                return Some(*sibling);
            }
        }
        None
    }

    fn root(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.nodes[current.0].parent {
            current = parent;
        }
        current
    }

    fn host(&self, shadow_root: NodeId) -> Option<NodeId> {
        match self.nodes[shadow_root.0].data {
            NodeData::ShadowRoot { host } => Some(host),
            NodeData::Document | NodeData::Element(_) => None,
        }
    }

    fn document_element(&self, document: NodeId) -> Option<NodeId> {
        if !matches!(self.nodes[document.0].data, NodeData::Document) {
            return None;
        }
        self.nodes[document.0]
            .children
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    fn shadow_root(&self, element: NodeId) -> Option<NodeId> {
        self.element(element)?.shadow_root
    }

    fn is_slot(&self, element: NodeId) -> bool {
        self.element(element)
            .is_some_and(|element| element.tag_name.eq_ignore_ascii_case("slot"))
    }

    fn assigned_slot(&self, element: NodeId) -> Option<NodeId> {
        self.element(element)?.assigned_slot
    }

    fn assigned_elements(&self, slot: NodeId) -> Vec<NodeId> {
        self.element(slot)
            .map(|element| element.assigned.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, element: NodeId) -> String {
        self.element(element)
            .map(|element| element.tag_name.to_ascii_uppercase())
            .unwrap_or_default()
    }

    fn element_id(&self, element: NodeId) -> Option<String> {
        self.element(element)?.attrs.get("id").cloned()
    }

    fn has_class(&self, element: NodeId, class_name: &str) -> bool {
        self.element(element)
            .and_then(|element| element.attrs.get("class"))
            .is_some_and(|classes| {
                classes
                    .split_ascii_whitespace()
                    .any(|token| token == class_name)
            })
    }

    fn attr(&self, element: NodeId, name: &str) -> Option<String> {
        self.element(element)?.attrs.get(name).cloned()
    }

    fn namespace_uri(&self, element: NodeId) -> Option<String> {
        self.element(element)?.namespace.clone()
    }

    fn outer_markup(&self, element: NodeId) -> String {
        if self.element(element).is_none() {
            return String::new();
        }
        self.dump_node(element)
    }
}
