//! Step controller: discovery, trigger binding and the transition state machine.
//!
//! A controller owns the ordered list of discovered steps and the current
//! index. Exactly one step carries `{active_class}--true` whenever the index
//! is in range; steps left behind carry `{active_class}--false`, and steps
//! never visited carry neither.
//!
//! Transitions run in two phases. `should_transition` may veto a request;
//! `before_transition` receives a [`PendingTransition`] and decides when (or
//! whether) to commit it. Until the commit runs, the index still points at the
//! previously committed step.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::error::StepperError;
use crate::view::{data_attribute_name, ListenerId, ViewElement};

mod options;
mod transition;

pub use options::{
    AfterTransitionHook, BeforeTransitionHook, ShouldTransitionHook, StepOptions,
    TransitionPolicy, DEFAULT_ACTIVE_CLASS, DEFAULT_INITIAL_STEP, DEFAULT_PREV_TRIGGER_SELECTOR,
    DEFAULT_STEP_KEY, DEFAULT_STEP_SELECTOR, DEFAULT_TRIGGER_SELECTOR,
};
pub use transition::{PendingTransition, TransitionOutcome, TransitionRequest};

use transition::PendingStatus;


/// How a bound trigger computes its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    /// Destination is `current - 1` at click time
    Previous,
    /// Destination is `current + 1` at click time
    Next,
    /// Destination read from the step attribute at bind time
    Explicit(i64),
    /// The step attribute holds something that is not an integer; clicks are
    /// ignored
    Invalid(String),
}

impl TriggerKind {
    /// Classify a general trigger by its step attribute.
    ///
    /// Only a missing or empty attribute means "next". Any other value is read
    /// as a number the way a browser coerces attribute text: surrounding
    /// whitespace is ignored, a blank value is 0, and integral decimals such as
    /// `2.0` or `1e1` count. Anything else yields [`TriggerKind::Invalid`].
    pub fn from_indicator(indicator: Option<&str>) -> Self {
        match indicator {
            None | Some("") => TriggerKind::Next,
            Some(raw) => numeric_indicator(raw)
                .map(TriggerKind::Explicit)
                .unwrap_or_else(|| TriggerKind::Invalid(raw.to_string())),
        }
    }

    /// Destination for a click made while the current index is `current`
    pub fn destination(&self, current: i64) -> Option<i64> {
        match self {
            TriggerKind::Previous => Some(current.saturating_sub(1)),
            TriggerKind::Next => Some(current.saturating_add(1)),
            TriggerKind::Explicit(to) => Some(*to),
            TriggerKind::Invalid(_) => None,
        }
    }
}

/// Numeric value of an indicator, if it is a whole number
fn numeric_indicator(raw: &str) -> Option<i64> {
    let text = raw.trim();
    if text.is_empty() {
        return Some(0);
    }
    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| text.strip_prefix(prefix).map(|digits| (digits, radix)));
    if let Some((digits, radix)) = radix {
        return i64::from_str_radix(digits, radix).ok();
    }
    // Rust's float grammar also takes "inf" and "nan", neither of which is whole
    let value = text.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Previous => write!(f, "previous"),
            TriggerKind::Next => write!(f, "next"),
            TriggerKind::Explicit(to) => write!(f, "explicit({to})"),
            TriggerKind::Invalid(raw) => write!(f, "invalid({raw:?})"),
        }
    }
}

struct Binding<V> {
    element: V,
    listener: ListenerId,
    kind: TriggerKind,
}

struct StepperState<V> {
    current_index: i64,
    steps: Vec<V>,
    bindings: Vec<Binding<V>>,
    in_flight: usize,
}

/// State shared between the controller handle, its click handlers and any
/// pending transitions. Handlers and pending transitions hold weak references.
pub(crate) struct Shared<V: ViewElement> {
    root: V,
    options: StepOptions<V>,
    state: RefCell<StepperState<V>>,
}

fn step_at<V: Clone>(steps: &[V], index: i64) -> Option<V> {
    usize::try_from(index)
        .ok()
        .and_then(|i| steps.get(i))
        .cloned()
}

impl<V: ViewElement> Shared<V> {
    fn current_index(&self) -> i64 {
        self.state.borrow().current_index
    }

    fn query(&self, selector: &str) -> Result<Vec<V>, StepperError> {
        if selector.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.root.query_all(selector)?)
    }

    /// Re-run discovery and replace every binding from the previous round.
    ///
    /// All lookups happen before any state changes, so a failed lookup leaves
    /// the previous steps and bindings in place.
    fn discover(this: &Rc<Self>) -> Result<(), StepperError> {
        let steps = this.query(&this.options.step_selector)?;
        let previous = this.query(&this.options.prev_trigger_selector)?;
        let general = this.query(&this.options.trigger_selector)?;

        let stale = std::mem::take(&mut this.state.borrow_mut().bindings);
        for binding in &stale {
            binding.element.off_click(binding.listener);
        }

        let attribute = data_attribute_name(&this.options.step_key);
        let mut bindings = Vec::with_capacity(previous.len() + general.len());
        for element in &previous {
            bindings.push(Self::bind(this, element.clone(), TriggerKind::Previous));
        }
        for element in general {
            if previous.iter().any(|p| p.same_element(&element)) {
                continue;
            }
            let kind = TriggerKind::from_indicator(element.data_attribute(&attribute).as_deref());
            if let TriggerKind::Invalid(raw) = &kind {
                warn!(attribute = %attribute, value = %raw, "trigger has a non-numeric step indicator");
            }
            bindings.push(Self::bind(this, element, kind));
        }

        debug!(
            steps = steps.len(),
            triggers = bindings.len(),
            released = stale.len(),
            "discovered steps and triggers"
        );

        let mut state = this.state.borrow_mut();
        state.steps = steps;
        state.bindings = bindings;
        Ok(())
    }

    fn bind(this: &Rc<Self>, element: V, kind: TriggerKind) -> Binding<V> {
        let weak = Rc::downgrade(this);
        let handler_kind = kind.clone();
        let listener = element.on_click(Rc::new(move |event: &V::Event| {
            if let Some(shared) = weak.upgrade() {
                Self::handle_trigger(&shared, &handler_kind, event.clone());
            }
        }));
        trace!(%listener, %kind, "bound trigger");
        Binding {
            element,
            listener,
            kind,
        }
    }

    fn handle_trigger(this: &Rc<Self>, kind: &TriggerKind, event: V::Event) {
        let current = this.current_index();
        match kind.destination(current) {
            Some(to) => {
                let outcome = Self::transition(this, current, to, event);
                trace!(%kind, from = current, to, %outcome, "trigger clicked");
            }
            None => debug!(%kind, "click on trigger with invalid indicator ignored"),
        }
    }

    fn unbind_all(&self) {
        let bindings = std::mem::take(&mut self.state.borrow_mut().bindings);
        for binding in bindings {
            binding.element.off_click(binding.listener);
        }
    }

    fn release_in_flight(&self) {
        let mut state = self.state.borrow_mut();
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    fn transition(this: &Rc<Self>, from: i64, to: i64, event: V::Event) -> TransitionOutcome {
        let (from_step, to_step, len, in_flight) = {
            let state = this.state.borrow();
            (
                step_at(&state.steps, from),
                step_at(&state.steps, to),
                state.steps.len() as i64,
                state.in_flight,
            )
        };

        let (Some(from_step), Some(to_step)) = (from_step, to_step) else {
            // "next" on the last step reconciles the index instead of failing.
            // Only the upper edge gets this treatment.
            if len > 0 && to == len {
                let index = to - 1;
                this.state.borrow_mut().current_index = index;
                debug!(from, to, index, "transition past the last step clamped");
                return TransitionOutcome::Clamped { index };
            }
            trace!(from, to, len, "out-of-range transition ignored");
            return TransitionOutcome::Ignored;
        };

        if in_flight > 0 && this.options.policy == TransitionPolicy::Exclusive {
            debug!(from, to, in_flight, "transition refused while another is pending");
            return TransitionOutcome::Busy;
        }

        let request = TransitionRequest {
            from: from as usize,
            to: to as usize,
            from_step,
            to_step,
        };

        if !(this.options.should_transition)(&request, &event) {
            debug!(from, to, "transition vetoed");
            return TransitionOutcome::Rejected;
        }

        let status = Rc::new(Cell::new(PendingStatus::Open));
        this.state.borrow_mut().in_flight += 1;
        let pending = PendingTransition::new(
            Rc::downgrade(this),
            request.clone(),
            event.clone(),
            status.clone(),
        );
        (this.options.before_transition)(&request, &event, pending);

        match status.get() {
            PendingStatus::Committed => TransitionOutcome::Committed,
            PendingStatus::Open => {
                debug!(from, to, "transition deferred");
                TransitionOutcome::Deferred
            }
            PendingStatus::Cancelled => TransitionOutcome::Cancelled,
        }
    }

    pub(crate) fn apply_commit(&self, request: &TransitionRequest<V>, event: &V::Event) {
        let active = self.options.active_marker();
        let inactive = self.options.inactive_marker();

        request.from_step.remove_class(&active);
        request.from_step.add_class(&inactive);
        self.state.borrow_mut().current_index = request.to as i64;
        request.to_step.remove_class(&inactive);
        request.to_step.add_class(&active);

        debug!(from = request.from, to = request.to, "transition committed");
        (self.options.after_transition)(request, event);
    }
}

/// Linear wizard controller over a view-layer root element.
///
/// Click handlers registered by the controller are removed when it is dropped.
pub struct StepController<V: ViewElement> {
    shared: Rc<Shared<V>>,
}

impl<V: ViewElement> StepController<V> {
    /// Discover steps under `root`, mark the initial step active and bind
    /// every trigger.
    pub fn new(root: V, options: StepOptions<V>) -> Result<Self, StepperError> {
        validate(&options)?;
        let initial = options.initial_step;
        let active = options.active_marker();
        let shared = Rc::new(Shared {
            root,
            options,
            state: RefCell::new(StepperState {
                current_index: initial,
                steps: Vec::new(),
                bindings: Vec::new(),
                in_flight: 0,
            }),
        });
        Shared::discover(&shared)?;

        let initial_step = step_at(&shared.state.borrow().steps, initial);
        match initial_step {
            Some(step) => step.add_class(&active),
            None => debug!(initial, "initial step out of range; nothing marked"),
        }

        Ok(Self { shared })
    }

    /// Re-run discovery and re-bind triggers. The current index is kept.
    pub fn refresh(&self) -> Result<(), StepperError> {
        Shared::discover(&self.shared)
    }

    /// Request a transition from `from` to `to`.
    ///
    /// Never fails: out-of-range requests are absorbed and reported through
    /// the returned outcome. Hooks run synchronously on this call.
    pub fn transition_to_step(&self, from: i64, to: i64, event: V::Event) -> TransitionOutcome {
        Shared::transition(&self.shared, from, to, event)
    }

    /// Same as clicking a "next" trigger
    pub fn next(&self, event: V::Event) -> TransitionOutcome {
        let current = self.current_index();
        self.transition_to_step(current, current.saturating_add(1), event)
    }

    /// Same as clicking a "previous" trigger
    pub fn previous(&self, event: V::Event) -> TransitionOutcome {
        let current = self.current_index();
        self.transition_to_step(current, current.saturating_sub(1), event)
    }

    /// Same as clicking a trigger with an explicit destination
    pub fn go_to(&self, to: i64, event: V::Event) -> TransitionOutcome {
        self.transition_to_step(self.current_index(), to, event)
    }

    pub fn current_index(&self) -> i64 {
        self.shared.current_index()
    }

    pub fn current_step(&self) -> Option<V> {
        let state = self.shared.state.borrow();
        step_at(&state.steps, state.current_index)
    }

    pub fn step_count(&self) -> usize {
        self.shared.state.borrow().steps.len()
    }

    pub fn steps(&self) -> Vec<V> {
        self.shared.state.borrow().steps.clone()
    }

    /// Bound triggers with the way each computes its destination
    pub fn triggers(&self) -> Vec<(V, TriggerKind)> {
        self.shared
            .state
            .borrow()
            .bindings
            .iter()
            .map(|b| (b.element.clone(), b.kind.clone()))
            .collect()
    }

    pub fn trigger_count(&self) -> usize {
        self.shared.state.borrow().bindings.len()
    }

    /// Whether a transition has been approved but not yet committed or dropped
    pub fn is_transition_pending(&self) -> bool {
        self.shared.state.borrow().in_flight > 0
    }

    pub fn options(&self) -> &StepOptions<V> {
        &self.shared.options
    }

    pub fn root(&self) -> &V {
        &self.shared.root
    }
}

impl<V: ViewElement> Drop for StepController<V> {
    fn drop(&mut self) {
        self.shared.unbind_all();
    }
}

impl<V: ViewElement> fmt::Debug for StepController<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("StepController")
            .field("current_index", &state.current_index)
            .field("steps", &state.steps.len())
            .field("triggers", &state.bindings.len())
            .field("in_flight", &state.in_flight)
            .field("options", &self.shared.options)
            .finish()
    }
}

fn validate<V: ViewElement>(options: &StepOptions<V>) -> Result<(), StepperError> {
    if options.active_class.trim().is_empty() {
        return Err(StepperError::invalid_option(
            "active_class",
            "must not be empty",
        ));
    }
    if options.active_class.chars().any(char::is_whitespace) {
        return Err(StepperError::invalid_option(
            "active_class",
            "must not contain whitespace",
        ));
    }
    if options.step_selector.trim().is_empty() {
        return Err(StepperError::invalid_option(
            "step_selector",
            "must not be empty",
        ));
    }
    Ok(())
}
