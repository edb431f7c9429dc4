//! Snapshots of controller state for the CLI

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::stepper::{StepController, StepOptions};
use crate::view::memory::Element;
use crate::view::ViewElement;

/// Marker carried by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerState {
    Active,
    Inactive,
    Unmarked,
}

impl MarkerState {
    pub fn of<V: ViewElement>(step: &V, options: &StepOptions<V>) -> Self {
        if step.has_class(&options.active_marker()) {
            MarkerState::Active
        } else if step.has_class(&options.inactive_marker()) {
            MarkerState::Inactive
        } else {
            MarkerState::Unmarked
        }
    }
}

impl fmt::Display for MarkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerState::Active => write!(f, "active"),
            MarkerState::Inactive => write!(f, "inactive"),
            MarkerState::Unmarked => write!(f, "-"),
        }
    }
}

/// A committed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub from: usize,
    pub to: usize,
}

/// Records every committed transition of the controllers it is attached to
#[derive(Debug, Clone, Default)]
pub struct TransitionLog(Rc<RefCell<Vec<TransitionRecord>>>);

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the `after_transition` hook of `options` so commits are recorded
    /// before the original hook runs
    pub fn attach<V: ViewElement>(&self, options: StepOptions<V>) -> StepOptions<V> {
        let previous = options.after_transition.clone();
        let log = self.clone();
        options.after_transition(move |request, event| {
            log.0.borrow_mut().push(TransitionRecord {
                from: request.from,
                to: request.to,
            });
            previous(request, event);
        })
    }

    pub fn records(&self) -> Vec<TransitionRecord> {
        self.0.borrow().clone()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub index: usize,
    pub element: String,
    pub marker: MarkerState,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerSummary {
    pub element: String,
    pub kind: String,
    /// Destination if clicked now
    pub destination: Option<i64>,
}

/// State of an in-memory wizard
#[derive(Debug, Clone, Serialize)]
pub struct WizardReport {
    pub current_index: i64,
    pub steps: Vec<StepSummary>,
    pub triggers: Vec<TriggerSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionRecord>,
}

impl WizardReport {
    pub fn capture(controller: &StepController<Element>) -> Self {
        let current = controller.current_index();
        let steps = controller
            .steps()
            .iter()
            .enumerate()
            .map(|(index, step)| StepSummary {
                index,
                element: step.label(),
                marker: MarkerState::of(step, controller.options()),
            })
            .collect();
        let triggers = controller
            .triggers()
            .into_iter()
            .map(|(element, kind)| TriggerSummary {
                element: element.label(),
                destination: kind.destination(current),
                kind: kind.to_string(),
            })
            .collect();
        Self {
            current_index: current,
            steps,
            triggers,
            transitions: Vec::new(),
        }
    }

    pub fn with_transitions(mut self, transitions: Vec<TransitionRecord>) -> Self {
        self.transitions = transitions;
        self
    }
}

impl fmt::Display for WizardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "current step: {} of {}",
            self.current_index,
            self.steps.len()
        )?;
        writeln!(f, "steps:")?;
        for step in &self.steps {
            let pointer = if step.index as i64 == self.current_index {
                "<"
            } else {
                ""
            };
            writeln!(
                f,
                "  [{}] {:<40} {:<9}{}",
                step.index, step.element, step.marker, pointer
            )?;
        }
        writeln!(f, "triggers:")?;
        for trigger in &self.triggers {
            match trigger.destination {
                Some(to) => writeln!(f, "  {:<40} {} -> {}", trigger.element, trigger.kind, to)?,
                None => writeln!(f, "  {:<40} {}", trigger.element, trigger.kind)?,
            }
        }
        if !self.transitions.is_empty() {
            writeln!(f, "transitions:")?;
            for record in &self.transitions {
                writeln!(f, "  {} -> {}", record.from, record.to)?;
            }
        }
        Ok(())
    }
}
