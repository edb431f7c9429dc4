//! View-layer collaborator abstraction.
//!
//! The step controller never touches a concrete document model. Everything it
//! needs from the view layer is expressed by [`ViewElement`]:
//! - descendant lookup by selector, in document order
//! - class add/remove
//! - reading a named data attribute
//! - click subscription delivering an opaque event
//!
//! [`memory`] provides the in-memory implementation used by the CLI and tests.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

pub mod markup;
pub mod memory;
pub mod selector;

/// Click handler registered on a view element
pub type ClickHandler<E> = Rc<dyn Fn(&E)>;

/// Errors reported by the view layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("cannot insert {child} into {parent}: it is an ancestor or the element itself")]
    HierarchyRequest { parent: String, child: String },
}

impl ViewError {
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        ViewError::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}

/// Identifies one click subscription on one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Handle to an element owned by the view layer.
///
/// Handles are cheap to clone and compare by identity. Implementations must not
/// hold interior borrows while invoking click handlers: handlers call back into
/// the controller, which in turn mutates classes on other elements.
pub trait ViewElement: Clone + 'static {
    /// Native event delivered to click handlers and passed through to hooks
    type Event: Clone + 'static;

    /// All descendants matching `selector`, in document order. The element
    /// itself is never included.
    fn query_all(&self, selector: &str) -> Result<Vec<Self>, ViewError>;

    fn add_class(&self, class: &str);

    fn remove_class(&self, class: &str);

    fn has_class(&self, class: &str) -> bool;

    /// Value of the attribute named `name` (e.g. `data-step`), if present
    fn data_attribute(&self, name: &str) -> Option<String>;

    /// Subscribe `handler` to click notifications on this element
    fn on_click(&self, handler: ClickHandler<Self::Event>) -> ListenerId;

    /// Remove a subscription created by [`ViewElement::on_click`]. Unknown ids
    /// are ignored.
    fn off_click(&self, id: ListenerId);

    /// Identity comparison between two handles
    fn same_element(&self, other: &Self) -> bool;
}

/// Normalize a step key into the attribute name that holds it.
///
/// Both `"data-step"` and `"step"` resolve to `data-step`.
pub fn data_attribute_name(key: &str) -> String {
    let key = key.trim();
    if key.starts_with("data-") {
        key.to_string()
    } else {
        format!("data-{key}")
    }
}
