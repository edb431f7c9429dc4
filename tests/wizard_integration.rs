//! Integration tests for step wizards built from markup files
//!
//! Each test loads a markup document (TOML, JSON or YAML) from a temp file,
//! attaches a `StepController` through the public API and drives it with
//! simulated clicks, asserting on the marker classes left in the tree.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use stepable::config::Config;
use stepable::report::{MarkerState, TransitionLog, TransitionRecord, WizardReport};
use stepable::view::markup::Markup;
use stepable::view::memory::{Document, Element};
use stepable::{PendingTransition, StepController, StepOptions, TransitionOutcome, TriggerKind};
use tempfile::{NamedTempFile, TempDir};

// ─── Fixtures ────────────────────────────────────────────────────────────────

const CHECKOUT_TOML: &str = r#"
[root]
tag = "form"
id = "checkout"

[[root.children]]
tag = "section"
id = "cart"
classes = ["stepable"]

[[root.children.children]]
tag = "button"
id = "to-shipping"
classes = ["stepable-trigger"]

[[root.children]]
tag = "section"
id = "shipping"
classes = ["stepable"]

[[root.children.children]]
tag = "button"
id = "back-to-cart"
classes = ["stepable-prev"]

[[root.children.children]]
tag = "button"
id = "to-payment"
classes = ["stepable-trigger"]

[[root.children]]
tag = "section"
id = "payment"
classes = ["stepable"]

[[root.children.children]]
tag = "button"
id = "edit-cart"
classes = ["stepable-trigger"]
attributes = { "data-step" = "0" }

[[root.children.children]]
tag = "button"
id = "pay"
classes = ["stepable-trigger"]
"#;

fn write_markup(source: &str, suffix: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn checkout() -> Document {
    let file = write_markup(CHECKOUT_TOML, ".toml");
    Markup::from_path(file.path()).unwrap().build()
}

fn options() -> StepOptions<Element> {
    StepOptions::default()
}

fn by_id(document: &Document, id: &str) -> Element {
    document
        .query(&format!("#{}", id))
        .unwrap()
        .unwrap_or_else(|| panic!("no element #{}", id))
}

fn markers(controller: &StepController<Element>) -> Vec<MarkerState> {
    controller
        .steps()
        .iter()
        .map(|step| MarkerState::of(step, controller.options()))
        .collect()
}

// ─── Click-driven navigation ─────────────────────────────────────────────────

#[test]
fn test_checkout_flow_from_toml_markup() {
    let document = checkout();
    let controller = StepController::new(document.root().clone(), options()).unwrap();

    assert_eq!(controller.step_count(), 3);
    assert_eq!(
        markers(&controller),
        vec![
            MarkerState::Active,
            MarkerState::Unmarked,
            MarkerState::Unmarked
        ]
    );

    assert!(document.click("#to-shipping").unwrap());
    assert_eq!(controller.current_index(), 1);
    assert_eq!(
        markers(&controller),
        vec![
            MarkerState::Inactive,
            MarkerState::Active,
            MarkerState::Unmarked
        ]
    );

    assert!(document.click("#to-payment").unwrap());
    assert_eq!(controller.current_index(), 2);

    // Explicit destination back to the first step
    assert!(document.click("#edit-cart").unwrap());
    assert_eq!(controller.current_index(), 0);
    assert_eq!(
        markers(&controller),
        vec![
            MarkerState::Active,
            MarkerState::Unmarked,
            MarkerState::Inactive
        ]
    );
}

#[test]
fn test_previous_trigger_moves_back() {
    let document = checkout();
    let controller = StepController::new(document.root().clone(), options()).unwrap();

    document.click("#to-shipping").unwrap();
    document.click("#back-to-cart").unwrap();
    assert_eq!(controller.current_index(), 0);
}

#[test]
fn test_next_on_last_step_clamps_to_last() {
    let document = checkout();
    let controller =
        StepController::new(document.root().clone(), options().with_initial_step(2)).unwrap();

    assert!(document.click("#pay").unwrap());
    assert_eq!(controller.current_index(), 2);
    assert_eq!(markers(&controller)[2], MarkerState::Active);
}

#[test]
fn test_previous_on_first_step_is_ignored() {
    let document = checkout();
    let controller = StepController::new(document.root().clone(), options()).unwrap();
    let event = stepable::view::memory::ClickEvent {
        target: document.root().clone(),
        sequence: 0,
    };

    assert_eq!(controller.previous(event), TransitionOutcome::Ignored);
    assert_eq!(controller.current_index(), 0);
}

#[test]
fn test_json_and_yaml_markup_build_the_same_wizard() {
    let json = r#"{
        "root": {
            "tag": "ol",
            "children": [
                { "tag": "li", "classes": ["stepable"],
                  "children": [{ "tag": "a", "id": "go", "classes": ["stepable-trigger"] }] },
                { "tag": "li", "classes": ["stepable"] }
            ]
        }
    }"#;
    let yaml = "
root:
  tag: ol
  children:
    - tag: li
      classes: [stepable]
      children:
        - tag: a
          id: go
          classes: [stepable-trigger]
    - tag: li
      classes: [stepable]
";

    for (source, suffix) in [(json, ".json"), (yaml, ".yaml")] {
        let file = write_markup(source, suffix);
        let document = Markup::from_path(file.path()).unwrap().build();
        let controller = StepController::new(document.root().clone(), options()).unwrap();

        assert_eq!(controller.step_count(), 2, "format {}", suffix);
        document.click("#go").unwrap();
        assert_eq!(controller.current_index(), 1, "format {}", suffix);
    }
}

// ─── Hooks ───────────────────────────────────────────────────────────────────

#[test]
fn test_veto_keeps_the_wizard_in_place() {
    let document = checkout();
    let controller = StepController::new(
        document.root().clone(),
        options().should_transition(|request, _| request.to != 2),
    )
    .unwrap();

    document.click("#to-shipping").unwrap();
    document.click("#to-payment").unwrap();
    assert_eq!(controller.current_index(), 1);
}

#[test]
fn test_deferred_commit_applies_later() {
    let document = checkout();
    let parked: Rc<RefCell<Option<PendingTransition<Element>>>> = Rc::new(RefCell::new(None));
    let slot = parked.clone();
    let controller = StepController::new(
        document.root().clone(),
        options().before_transition(move |_, _, pending| {
            *slot.borrow_mut() = Some(pending);
        }),
    )
    .unwrap();

    document.click("#to-shipping").unwrap();
    assert_eq!(controller.current_index(), 0);
    assert!(controller.is_transition_pending());

    let pending = parked.borrow_mut().take().unwrap();
    assert_eq!(pending.request().to, 1);
    assert_eq!(pending.event().target, by_id(&document, "to-shipping"));
    pending.commit();

    assert_eq!(controller.current_index(), 1);
    assert!(!controller.is_transition_pending());
}

#[test]
fn test_transition_log_records_click_sequence() {
    let document = checkout();
    let log = TransitionLog::new();
    let controller = StepController::new(document.root().clone(), log.attach(options())).unwrap();

    for id in ["#to-shipping", "#to-payment", "#edit-cart"] {
        document.click(id).unwrap();
    }

    let report = WizardReport::capture(&controller).with_transitions(log.records());
    assert_eq!(report.current_index, 0);
    assert_eq!(
        report.transitions,
        vec![
            TransitionRecord { from: 0, to: 1 },
            TransitionRecord { from: 1, to: 2 },
            TransitionRecord { from: 2, to: 0 },
        ]
    );
}

// ─── Refresh and lifetime ────────────────────────────────────────────────────

#[test]
fn test_refresh_picks_up_a_new_step() {
    let document = checkout();
    let controller =
        StepController::new(document.root().clone(), options().with_initial_step(2)).unwrap();

    let review = Element::new("section")
        .with_id("review")
        .with_class("stepable");
    document.root().append_child(&review).unwrap();
    controller.refresh().unwrap();

    assert_eq!(controller.step_count(), 4);
    assert_eq!(controller.current_index(), 2);

    document.click("#pay").unwrap();
    assert_eq!(controller.current_index(), 3);
    assert!(review.has_class("stepable-active--true"));
}

#[test]
fn test_dropping_the_controller_releases_triggers() {
    let document = checkout();
    let controller = StepController::new(document.root().clone(), options()).unwrap();
    let trigger = by_id(&document, "to-shipping");
    assert_eq!(trigger.listener_count(), 1);

    drop(controller);
    assert_eq!(trigger.listener_count(), 0);
    assert_eq!(trigger.click(), 0);
}

#[test]
fn test_trigger_kinds_reported_for_inspection() {
    let document = checkout();
    let controller = StepController::new(document.root().clone(), options()).unwrap();

    let kinds: Vec<(String, TriggerKind)> = controller
        .triggers()
        .into_iter()
        .map(|(element, kind)| (element.id().unwrap_or_default(), kind))
        .collect();

    assert!(kinds.contains(&("back-to-cart".to_string(), TriggerKind::Previous)));
    assert!(kinds.contains(&("to-payment".to_string(), TriggerKind::Next)));
    assert!(kinds.contains(&("edit-cart".to_string(), TriggerKind::Explicit(0))));
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[test]
fn test_options_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    std::fs::write(
        &config_path,
        "[stepper]\nactive_class = \"wiz\"\ninitial_step = 1\nstep_selector = \"section\"\n",
    )
    .unwrap();

    let config = Config::load(Some(config_path.to_str().unwrap())).unwrap();
    let document = checkout();
    let controller = StepController::new(
        document.root().clone(),
        StepOptions::from_config(&config.stepper),
    )
    .unwrap();

    assert_eq!(controller.step_count(), 3);
    assert_eq!(controller.current_index(), 1);
    assert!(by_id(&document, "shipping").has_class("wiz--true"));
}
