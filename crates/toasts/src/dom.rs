//! In-memory document implementing [`ToastHost`]

use std::collections::{BTreeMap, BTreeSet};

use crate::reconciler::{ToastError, ToastHost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
struct Node {
    classes: BTreeSet<String>,
    attributes: BTreeMap<String, String>,
    attached: bool,
    show_calls: usize,
    /// Widget construction fails for this node
    broken: bool,
    /// Attribute writes fail for this node
    read_only: bool,
}

/// A flat document of elements identified by [`NodeId`]
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element with the given classes, as an htmx swap would
    pub fn insert(&mut self, classes: &[&str]) -> NodeId {
        self.nodes.push(Node {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            attached: true,
            ..Default::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Append a toast; `hidden` adds the dismissal class
    pub fn insert_toast(&mut self, hidden: bool) -> NodeId {
        if hidden {
            self.insert(&["toast", "hide"])
        } else {
            self.insert(&["toast"])
        }
    }

    /// Append a toast whose widget cannot be constructed
    pub fn insert_broken_toast(&mut self) -> NodeId {
        let id = self.insert(&["toast"]);
        self.nodes[id.0].broken = true;
        id
    }

    /// Append a toast that shows but rejects attribute writes
    pub fn insert_read_only_toast(&mut self) -> NodeId {
        let id = self.insert(&["toast"]);
        self.nodes[id.0].read_only = true;
        id
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.classes.insert(class.to_string());
        }
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).map(|n| n.attached).unwrap_or(false)
    }

    /// How many times `show` ran for this element
    pub fn show_calls(&self, id: NodeId) -> usize {
        self.nodes.get(id.0).map(|n| n.show_calls).unwrap_or(0)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    /// Elements still attached
    pub fn attached_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.attached).count()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|n| n.attached)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).filter(|n| n.attached)
    }
}

impl ToastHost for Document {
    type Element = NodeId;

    fn find_toasts(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached && n.classes.contains("toast"))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn has_class(&self, element: &NodeId, class: &str) -> bool {
        self.node(*element)
            .map(|n| n.classes.contains(class))
            .unwrap_or(false)
    }

    fn has_attribute(&self, element: &NodeId, name: &str) -> bool {
        self.node(*element)
            .map(|n| n.attributes.contains_key(name))
            .unwrap_or(false)
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) -> Result<(), ToastError> {
        let node = self
            .node_mut(*element)
            .ok_or_else(|| ToastError::Attribute(format!("{:?} is detached", element)))?;
        if node.read_only {
            return Err(ToastError::Attribute(format!("{:?} is read-only", element)));
        }
        node.attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, element: &NodeId) -> Result<(), ToastError> {
        let node = self
            .node_mut(*element)
            .ok_or_else(|| ToastError::Remove(format!("{:?} is already detached", element)))?;
        node.attached = false;
        Ok(())
    }

    fn show(&mut self, element: &NodeId) -> Result<(), ToastError> {
        let node = self
            .node_mut(*element)
            .ok_or_else(|| ToastError::Show(format!("{:?} is detached", element)))?;
        if node.broken {
            return Err(ToastError::Show(format!("no widget for {:?}", element)));
        }
        node.show_calls += 1;
        Ok(())
    }
}
