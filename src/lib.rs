//! Stepable - index-addressed step wizards over a pluggable view layer
//!
//! A [`StepController`] turns a root element and its descendant "step"
//! elements into a linear wizard: exactly one step carries the active marker,
//! and clicks on trigger elements move it forward, backward, or to an explicit
//! index. The view layer is reached only through the [`ViewElement`] trait;
//! [`view::memory`] provides an in-memory implementation used by the CLI and
//! the tests.
//!
//! ```
//! use stepable::view::memory::Element;
//! use stepable::{StepController, StepOptions};
//!
//! let root = Element::new("form")
//!     .with_child(Element::new("section").with_class("stepable"))
//!     .with_child(Element::new("section").with_class("stepable"));
//!
//! let controller = StepController::new(root.clone(), StepOptions::default()).unwrap();
//! assert_eq!(controller.current_index(), 0);
//! assert_eq!(controller.step_count(), 2);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod stepper;
pub mod view;

pub use error::StepperError;
pub use stepper::{
    PendingTransition, StepController, StepOptions, TransitionOutcome, TransitionPolicy,
    TransitionRequest, TriggerKind,
};
pub use view::{ListenerId, ViewElement, ViewError};
