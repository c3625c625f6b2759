//! End-to-end debounce behavior: delayed commits, coalescing, and execution
//! context marshaling, with a real timer worker.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use weft_reactive::{ExecutionContext, FieldIdentity, ObservableValue, RuleSet, rules};

#[test]
fn delayed_commit_waits_for_the_delay() {
    let cell = ObservableValue::new(String::from("Test"));
    cell.enable_delay_value_change(Duration::from_millis(100));

    cell.set(String::from("Changed"));
    assert_eq!(cell.value(), "Test", "the commit must be deferred");

    thread::sleep(Duration::from_millis(250));
    assert_eq!(cell.value(), "Changed");

    cell.disable_delay_value_change();
    cell.set(String::from("Modified"));
    assert_eq!(cell.value(), "Modified", "disabled delay commits synchronously");
}

#[test]
fn rapid_changes_coalesce_to_the_final_value() {
    let source = ObservableValue::new(0);
    let target = ObservableValue::new(0);
    target.bind_identity(&source).unwrap();
    target.enable_delay_value_change(Duration::from_millis(100));

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    let _sub = target.on_value_changed(move |args| sink.lock().unwrap().push(*args.new_value()));

    source.set(1);
    thread::sleep(Duration::from_millis(40));
    source.set(2);
    assert_eq!(target.value(), 0);

    thread::sleep(Duration::from_millis(250));
    assert_eq!(target.value(), 2);
    assert_eq!(
        *observed.lock().unwrap(),
        vec![2],
        "the intermediate value must never be committed"
    );
}

#[test]
fn validation_runs_at_set_time_not_commit_time() {
    let cell = ObservableValue::new(String::from("filled"));
    cell.enable_validation(
        FieldIdentity::new("name"),
        RuleSet::new().rule(rules::required()),
    );
    cell.enable_delay_value_change(Duration::from_millis(60));

    cell.set(String::new());
    // The commit is still pending, but error observers are already current.
    assert_eq!(cell.value(), "filled");
    assert!(cell.has_errors());

    thread::sleep(Duration::from_millis(200));
    assert_eq!(cell.value(), "");
}

#[test]
fn disabling_the_delay_discards_a_pending_commit() {
    let cell = ObservableValue::new(1);
    cell.enable_delay_value_change(Duration::from_millis(80));

    cell.set(2);
    cell.disable_delay_value_change();

    thread::sleep(Duration::from_millis(200));
    assert_eq!(cell.value(), 1, "the pending deferred commit must be dropped");
}

struct QueueContext {
    tx: Mutex<Sender<Box<dyn FnOnce() + Send>>>,
}

impl QueueContext {
    fn new() -> (Arc<Self>, Receiver<Box<dyn FnOnce() + Send>>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Self { tx: Mutex::new(tx) }), rx)
    }
}

impl ExecutionContext for QueueContext {
    fn post(&self, action: Box<dyn FnOnce() + Send>) {
        let _ = self.tx.lock().unwrap().send(action);
    }
}

#[test]
fn execution_context_defers_commit_to_the_pumping_thread() {
    let (context, actions) = QueueContext::new();
    let cell = ObservableValue::new(0);
    cell.enable_delay_value_change_on(Duration::from_millis(40), context);

    cell.set(7);
    thread::sleep(Duration::from_millis(150));

    // Expired, but the commit is parked in the context queue.
    assert_eq!(cell.value(), 0);

    let action = actions
        .recv_timeout(Duration::from_millis(500))
        .expect("the timer should post the commit through the context");
    action();
    assert_eq!(cell.value(), 7);
}
