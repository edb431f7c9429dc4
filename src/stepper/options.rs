//! Controller options and extension hooks

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::transition::{PendingTransition, TransitionRequest};
use crate::config::StepperConfig;
use crate::view::ViewElement;

pub const DEFAULT_ACTIVE_CLASS: &str = "stepable-active";
pub const DEFAULT_INITIAL_STEP: i64 = 0;
pub const DEFAULT_STEP_KEY: &str = "data-step";
pub const DEFAULT_STEP_SELECTOR: &str = ".stepable";
pub const DEFAULT_TRIGGER_SELECTOR: &str = ".stepable-trigger";
pub const DEFAULT_PREV_TRIGGER_SELECTOR: &str = ".stepable-prev";

/// Veto hook: return false to abort the transition
pub type ShouldTransitionHook<V> =
    Rc<dyn Fn(&TransitionRequest<V>, &<V as ViewElement>::Event) -> bool>;

/// Gate hook: call [`PendingTransition::commit`] now or later to apply the change
pub type BeforeTransitionHook<V> =
    Rc<dyn Fn(&TransitionRequest<V>, &<V as ViewElement>::Event, PendingTransition<V>)>;

/// Notification after a committed transition
pub type AfterTransitionHook<V> = Rc<dyn Fn(&TransitionRequest<V>, &<V as ViewElement>::Event)>;

/// How requests made while another transition is pending are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPolicy {
    /// No guard: overlapping transitions all proceed and the last commit wins
    #[default]
    LastCommitWins,
    /// Requests made while a transition is pending are refused with
    /// [`super::TransitionOutcome::Busy`]
    Exclusive,
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPolicy::LastCommitWins => write!(f, "last-commit-wins"),
            TransitionPolicy::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Options consumed by [`super::StepController::new`]
pub struct StepOptions<V: ViewElement> {
    /// Base name of the marker classes (`{active_class}--true` / `--false`)
    pub active_class: String,
    /// Starting current index
    pub initial_step: i64,
    /// Data attribute holding an explicit trigger destination
    pub step_key: String,
    pub step_selector: String,
    /// General (next / explicit) triggers; empty disables them
    pub trigger_selector: String,
    /// "Previous" triggers; empty disables them
    pub prev_trigger_selector: String,
    pub policy: TransitionPolicy,
    pub should_transition: ShouldTransitionHook<V>,
    pub before_transition: BeforeTransitionHook<V>,
    pub after_transition: AfterTransitionHook<V>,
}

impl<V: ViewElement> Default for StepOptions<V> {
    fn default() -> Self {
        Self {
            active_class: DEFAULT_ACTIVE_CLASS.to_string(),
            initial_step: DEFAULT_INITIAL_STEP,
            step_key: DEFAULT_STEP_KEY.to_string(),
            step_selector: DEFAULT_STEP_SELECTOR.to_string(),
            trigger_selector: DEFAULT_TRIGGER_SELECTOR.to_string(),
            prev_trigger_selector: DEFAULT_PREV_TRIGGER_SELECTOR.to_string(),
            policy: TransitionPolicy::default(),
            should_transition: Rc::new(|_: &TransitionRequest<V>, _: &V::Event| true),
            before_transition: Rc::new(
                |_: &TransitionRequest<V>, _: &V::Event, pending: PendingTransition<V>| {
                    pending.commit();
                },
            ),
            after_transition: Rc::new(|_: &TransitionRequest<V>, _: &V::Event| {}),
        }
    }
}

impl<V: ViewElement> Clone for StepOptions<V> {
    fn clone(&self) -> Self {
        Self {
            active_class: self.active_class.clone(),
            initial_step: self.initial_step,
            step_key: self.step_key.clone(),
            step_selector: self.step_selector.clone(),
            trigger_selector: self.trigger_selector.clone(),
            prev_trigger_selector: self.prev_trigger_selector.clone(),
            policy: self.policy,
            should_transition: self.should_transition.clone(),
            before_transition: self.before_transition.clone(),
            after_transition: self.after_transition.clone(),
        }
    }
}

impl<V: ViewElement> fmt::Debug for StepOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepOptions")
            .field("active_class", &self.active_class)
            .field("initial_step", &self.initial_step)
            .field("step_key", &self.step_key)
            .field("step_selector", &self.step_selector)
            .field("trigger_selector", &self.trigger_selector)
            .field("prev_trigger_selector", &self.prev_trigger_selector)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<V: ViewElement> StepOptions<V> {
    /// Options with every non-hook field taken from configuration
    pub fn from_config(config: &StepperConfig) -> Self {
        Self {
            active_class: config.active_class.clone(),
            initial_step: config.initial_step,
            step_key: config.step_key.clone(),
            step_selector: config.step_selector.clone(),
            trigger_selector: config.trigger_selector.clone(),
            prev_trigger_selector: config.prev_trigger_selector.clone(),
            policy: config.policy,
            ..Self::default()
        }
    }

    /// Class carried by the active step
    pub fn active_marker(&self) -> String {
        format!("{}--true", self.active_class)
    }

    /// Class carried by previously active steps
    pub fn inactive_marker(&self) -> String {
        format!("{}--false", self.active_class)
    }

    pub fn with_active_class(mut self, active_class: impl Into<String>) -> Self {
        self.active_class = active_class.into();
        self
    }

    pub fn with_initial_step(mut self, initial_step: i64) -> Self {
        self.initial_step = initial_step;
        self
    }

    pub fn with_step_key(mut self, step_key: impl Into<String>) -> Self {
        self.step_key = step_key.into();
        self
    }

    pub fn with_step_selector(mut self, selector: impl Into<String>) -> Self {
        self.step_selector = selector.into();
        self
    }

    pub fn with_trigger_selector(mut self, selector: impl Into<String>) -> Self {
        self.trigger_selector = selector.into();
        self
    }

    pub fn with_prev_trigger_selector(mut self, selector: impl Into<String>) -> Self {
        self.prev_trigger_selector = selector.into();
        self
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn should_transition<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransitionRequest<V>, &V::Event) -> bool + 'static,
    {
        self.should_transition = Rc::new(hook);
        self
    }

    pub fn before_transition<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransitionRequest<V>, &V::Event, PendingTransition<V>) + 'static,
    {
        self.before_transition = Rc::new(hook);
        self
    }

    pub fn after_transition<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransitionRequest<V>, &V::Event) + 'static,
    {
        self.after_transition = Rc::new(hook);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::memory::Element;

    #[test]
    fn test_default_options() {
        let options: StepOptions<Element> = StepOptions::default();
        assert_eq!(options.active_class, "stepable-active");
        assert_eq!(options.initial_step, 0);
        assert_eq!(options.step_key, "data-step");
        assert_eq!(options.step_selector, ".stepable");
        assert_eq!(options.trigger_selector, ".stepable-trigger");
        assert_eq!(options.prev_trigger_selector, ".stepable-prev");
        assert_eq!(options.policy, TransitionPolicy::LastCommitWins);
    }

    #[test]
    fn test_marker_names_derive_from_active_class() {
        let options: StepOptions<Element> = StepOptions::default().with_active_class("wiz");
        assert_eq!(options.active_marker(), "wiz--true");
        assert_eq!(options.inactive_marker(), "wiz--false");
    }

    #[test]
    fn test_from_config_copies_fields() {
        let config = StepperConfig {
            active_class: "is".to_string(),
            initial_step: 2,
            step_key: "target".to_string(),
            step_selector: "section".to_string(),
            trigger_selector: "button.go".to_string(),
            prev_trigger_selector: String::new(),
            policy: TransitionPolicy::Exclusive,
        };
        let options: StepOptions<Element> = StepOptions::from_config(&config);
        assert_eq!(options.active_class, "is");
        assert_eq!(options.initial_step, 2);
        assert_eq!(options.step_key, "target");
        assert_eq!(options.step_selector, "section");
        assert_eq!(options.trigger_selector, "button.go");
        assert!(options.prev_trigger_selector.is_empty());
        assert_eq!(options.policy, TransitionPolicy::Exclusive);
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(TransitionPolicy::LastCommitWins.to_string(), "last-commit-wins");
        assert_eq!(TransitionPolicy::Exclusive.to_string(), "exclusive");
    }

    #[test]
    fn test_debug_omits_hooks() {
        let options: StepOptions<Element> = StepOptions::default();
        let debug = format!("{options:?}");
        assert!(debug.contains("stepable-active"));
        assert!(!debug.contains("should_transition"));
    }
}
