//! In-memory element tree implementing [`ViewElement`].
//!
//! Elements are reference-counted nodes with a tag, attributes, an ordered
//! class list, children and a weak parent link. Clicks are dispatched
//! synchronously to listeners in registration order.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use super::selector::{Selectable, Selector};
use super::{ClickHandler, ListenerId, ViewElement, ViewError};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Event delivered to click listeners of an in-memory [`Element`]
#[derive(Debug, Clone)]
pub struct ClickEvent {
    /// Element that was clicked
    pub target: Element,
    /// Monotonic sequence number across all dispatched clicks
    pub sequence: u64,
}

struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    children: Vec<Element>,
    parent: Weak<RefCell<Node>>,
    listeners: Vec<(ListenerId, ClickHandler<ClickEvent>)>,
}

/// Handle to a node in the in-memory tree
#[derive(Clone)]
pub struct Element(Rc<RefCell<Node>>);

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element(Rc::new(RefCell::new(Node {
            tag: tag.into().to_ascii_lowercase(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: Weak::new(),
            listeners: Vec::new(),
        })))
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.set_attribute("id", id);
        self
    }

    pub fn with_class(self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`Element::append_child`]. A child that would create a
    /// cycle is left out and logged.
    pub fn with_child(self, child: Element) -> Self {
        if let Err(err) = self.append_child(&child) {
            warn!(%err, "child not appended");
        }
        self
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    pub fn classes(&self) -> Vec<String> {
        self.0.borrow().classes.clone()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.borrow().classes.iter().any(|c| c == class)
    }

    pub fn add_class(&self, class: &str) {
        let mut node = self.0.borrow_mut();
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.0.borrow_mut().classes.retain(|c| c != class);
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .borrow_mut()
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.borrow_mut().attributes.remove(name)
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.borrow().children.clone()
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.borrow().parent.upgrade().map(Element)
    }

    /// Previous element in the parent's child list
    pub fn previous_sibling(&self) -> Option<Element> {
        let parent = self.parent()?;
        let node = parent.0.borrow();
        let index = node.children.iter().position(|c| c == self)?;
        index.checked_sub(1).map(|i| node.children[i].clone())
    }

    /// Next element in the parent's child list
    pub fn next_sibling(&self) -> Option<Element> {
        let parent = self.parent()?;
        let node = parent.0.borrow();
        let index = node.children.iter().position(|c| c == self)?;
        node.children.get(index + 1).cloned()
    }

    /// Whether `other` is this element or sits somewhere below it
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if element == *self {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Append `child` as the last child, detaching it from any previous parent
    pub fn append_child(&self, child: &Element) -> Result<(), ViewError> {
        let len = self.0.borrow().children.len();
        self.insert_child(len, child)
    }

    /// Insert `child` at `index` (clamped to the child count), detaching it
    /// from any previous parent. Fails without touching the tree when `child`
    /// is this element or one of its ancestors.
    pub fn insert_child(&self, index: usize, child: &Element) -> Result<(), ViewError> {
        if child.contains(self) {
            return Err(ViewError::HierarchyRequest {
                parent: self.label(),
                child: child.label(),
            });
        }
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        let mut node = self.0.borrow_mut();
        let index = index.min(node.children.len());
        node.children.insert(index, child.clone());
        Ok(())
    }

    /// Remove `child` from this element. Returns false if it was not a child.
    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut node = self.0.borrow_mut();
            let before = node.children.len();
            node.children.retain(|c| !Rc::ptr_eq(&c.0, &child.0));
            node.children.len() != before
        };
        if removed {
            child.0.borrow_mut().parent = Weak::new();
        }
        removed
    }

    /// Detach this element from its parent, if any
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Dispatch a click to every listener on this element. Returns the number
    /// of listeners invoked.
    pub fn click(&self) -> usize {
        let handlers: Vec<ClickHandler<ClickEvent>> = self
            .0
            .borrow()
            .listeners
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        let event = ClickEvent {
            target: self.clone(),
            sequence: NEXT_EVENT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    /// Short human-readable label such as `button#next.stepable-trigger`
    pub fn label(&self) -> String {
        let node = self.0.borrow();
        let mut label = node.tag.clone();
        if let Some(id) = node.attributes.get("id") {
            label.push('#');
            label.push_str(id);
        }
        for class in &node.classes {
            label.push('.');
            label.push_str(class);
        }
        label
    }

    fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(element) = stack.pop() {
            stack.extend(element.children().into_iter().rev());
            out.push(element);
        }
        out
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.label())
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

impl Selectable for Element {
    fn local_name(&self) -> String {
        self.tag()
    }

    fn element_id(&self) -> Option<String> {
        self.id()
    }

    fn has_class(&self, class: &str) -> bool {
        Element::has_class(self, class)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        Element::attribute(self, name)
    }

    fn parent_element(&self) -> Option<Self> {
        self.parent()
    }

    fn previous_sibling_element(&self) -> Option<Self> {
        self.previous_sibling()
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.next_sibling()
    }
}

impl ViewElement for Element {
    type Event = ClickEvent;

    fn query_all(&self, selector: &str) -> Result<Vec<Self>, ViewError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|element| selector.matches(element))
            .collect())
    }

    fn add_class(&self, class: &str) {
        Element::add_class(self, class);
    }

    fn remove_class(&self, class: &str) {
        Element::remove_class(self, class);
    }

    fn has_class(&self, class: &str) -> bool {
        Element::has_class(self, class)
    }

    fn data_attribute(&self, name: &str) -> Option<String> {
        Element::attribute(self, name)
    }

    fn on_click(&self, handler: ClickHandler<ClickEvent>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.0.borrow_mut().listeners.push((id, handler));
        id
    }

    fn off_click(&self, id: ListenerId) {
        self.0
            .borrow_mut()
            .listeners
            .retain(|(listener, _)| *listener != id);
    }

    fn same_element(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Owner of an in-memory tree
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The root itself (if it matches) followed by matching descendants
    pub fn query_all(&self, selector: &str) -> Result<Vec<Element>, ViewError> {
        let parsed = Selector::parse(selector)?;
        let mut matches = Vec::new();
        if parsed.matches(&self.root) {
            matches.push(self.root.clone());
        }
        matches.extend(self.root.query_all(selector)?);
        Ok(matches)
    }

    pub fn query(&self, selector: &str) -> Result<Option<Element>, ViewError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// Click the first element matching `selector`. Returns whether an
    /// element was found.
    pub fn click(&self, selector: &str) -> Result<bool, ViewError> {
        match self.query(selector)? {
            Some(element) => {
                element.click();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
