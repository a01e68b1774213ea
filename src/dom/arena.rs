//! Arena-allocated DOM that html5ever parses chapter documents into.

use html5ever::{LocalName, Namespace, QualName};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-split `class` attribute for selector matching.
        classes: Vec<String>,
    },
    Text(String),
    /// Comments, processing instructions and doctypes. Kept so the tree
    /// builder has a handle to return; never matched or rendered.
    Other,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// A parsed chapter document.
///
/// Nodes live in one vector; links between them are indices.
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(NodeData::Document);
        dom
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the document root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let classes = attrs
            .iter()
            .find(|a| a.name.local.as_ref() == "class")
            .map(|a| a.value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        self.alloc(NodeData::Element {
            name,
            attrs,
            classes,
        })
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(NodeData::Text(text))
    }

    pub fn create_other(&mut self) -> NodeId {
        self.alloc(NodeData::Other)
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text, merging into the last child when it is already text.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Unlink a node from its parent and siblings.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Element descendants of the document, in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self.document];
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                let mut children: Vec<_> = self.children(id).collect();
                children.reverse();
                stack.extend(children);
                if self.is_element(id) {
                    return Some(id);
                }
            }
            None
        })
    }

    /// First element with this tag name, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.elements()
            .find(|&id| self.element_name(id).is_some_and(|n| n.as_ref() == tag))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match self.get(id).map(|n| &n.data) {
                Some(NodeData::Text(text)) => out.push_str(text),
                Some(NodeData::Element { .. }) | Some(NodeData::Document) => {
                    let start = stack.len();
                    stack.extend(self.children(id));
                    stack[start..].reverse();
                }
                _ => {}
            }
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ChildrenIter<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self.dom.get(id).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Tree navigation over elements only.
impl Dom {
    /// Parent of `id` when that parent is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id)?.parent;
        self.is_element(parent).then_some(parent)
    }

    /// Nearest element sibling after (`forward`) or before `id`.
    pub fn sibling_element(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        let step = |n: &Node| if forward { n.next_sibling } else { n.prev_sibling };
        let mut current = step(self.get(id)?);
        while current.is_some() {
            if self.is_element(current) {
                return Some(current);
            }
            current = step(self.get(current)?);
        }
        None
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).find(|&child| self.is_element(child))
    }

    /// Strict ancestors of `id`, nearest first, ending at the document.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(id).map_or(NodeId::NONE, |n| n.parent);
        std::iter::from_fn(move || {
            let id = current;
            current = self.get(id)?.parent;
            Some(id)
        })
    }
}

/// Element accessors.
impl Dom {
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Vec<Attribute>> {
        self.get_mut(id).and_then(|n| match &mut n.data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        })
    }

    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    pub fn element_classes(&self, id: NodeId) -> &[String] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }
}

#[cfg(test)]
mod tests {
    use html5ever::ns;

    use super::*;

    fn qname(local: &str) -> QualName {
        QualName::new(None, ns!(html), LocalName::from(local))
    }

    #[test]
    fn test_append_children() {
        let mut dom = Dom::new();

        let parent = dom.create_element(qname("div"), vec![]);
        let child1 = dom.create_element(qname("p"), vec![]);
        let child2 = dom.create_element(qname("p"), vec![]);

        dom.append(dom.document(), parent);
        dom.append(parent, child1);
        dom.append(parent, child2);

        let children: Vec<_> = dom.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
    }

    #[test]
    fn test_text_merging() {
        let mut dom = Dom::new();
        let p = dom.create_element(qname("p"), vec![]);
        dom.append(dom.document(), p);

        dom.append_text(p, "Hello, ");
        dom.append_text(p, "World!");

        assert_eq!(dom.children(p).count(), 1);
        assert_eq!(dom.text_content(p), "Hello, World!");
    }

    #[test]
    fn test_classes_are_split() {
        let mut dom = Dom::new();
        let div = dom.create_element(
            qname("div"),
            vec![Attribute {
                name: qname("class"),
                value: " chapter-title  big ".to_string(),
            }],
        );
        assert_eq!(dom.element_classes(div), ["chapter-title", "big"]);
        assert_eq!(dom.get_attr(div, "class"), Some(" chapter-title  big "));
    }

    #[test]
    fn test_detach_and_insert_before() {
        let mut dom = Dom::new();
        let root = dom.document();
        let a = dom.create_element(qname("a"), vec![]);
        let b = dom.create_element(qname("b"), vec![]);
        let c = dom.create_element(qname("i"), vec![]);
        dom.append(root, a);
        dom.append(root, b);

        dom.insert_before(b, c);
        assert_eq!(dom.children(root).collect::<Vec<_>>(), vec![a, c, b]);

        dom.detach(a);
        assert_eq!(dom.children(root).collect::<Vec<_>>(), vec![c, b]);
        assert!(dom.get(a).unwrap().parent.is_none());
    }

    #[test]
    fn test_elements_in_document_order() {
        let mut dom = Dom::new();
        let root = dom.document();
        let div = dom.create_element(qname("div"), vec![]);
        let h1 = dom.create_element(qname("h1"), vec![]);
        let p = dom.create_element(qname("p"), vec![]);
        dom.append(root, div);
        dom.append(div, h1);
        dom.append(root, p);

        assert_eq!(dom.elements().collect::<Vec<_>>(), vec![div, h1, p]);
        assert_eq!(dom.ancestors(h1).collect::<Vec<_>>(), vec![div, root]);
        assert_eq!(dom.find_by_tag("p"), Some(p));
        assert_eq!(dom.find_by_tag("table"), None);
    }

    #[test]
    fn test_element_navigation_skips_text() {
        let mut dom = Dom::new();
        let root = dom.document();
        let body = dom.create_element(qname("body"), vec![]);
        let h1 = dom.create_element(qname("h1"), vec![]);
        let p = dom.create_element(qname("p"), vec![]);
        dom.append(root, body);
        dom.append_text(body, "  ");
        dom.append(body, h1);
        dom.append_text(body, "\n");
        dom.append(body, p);

        assert_eq!(dom.first_element_child(body), Some(h1));
        assert_eq!(dom.sibling_element(h1, true), Some(p));
        assert_eq!(dom.sibling_element(p, false), Some(h1));
        assert_eq!(dom.sibling_element(h1, false), None);
        assert_eq!(dom.parent_element(h1), Some(body));
        assert_eq!(dom.parent_element(body), None);
    }

    #[test]
    fn test_text_content_of_deep_tree() {
        let mut dom = Dom::new();
        let h1 = dom.create_element(qname("h1"), vec![]);
        dom.append(dom.document(), h1);
        dom.append_text(h1, "A");

        let mut parent = h1;
        for _ in 0..100_000 {
            let span = dom.create_element(qname("span"), vec![]);
            dom.append(parent, span);
            parent = span;
        }
        dom.append_text(parent, "B");
        dom.append_text(h1, "C");

        assert_eq!(dom.text_content(h1), "ABC");
        assert_eq!(dom.text_content(dom.document()), "ABC");
    }
}
