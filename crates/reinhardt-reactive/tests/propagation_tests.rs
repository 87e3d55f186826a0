//! Change Propagation Tests
//!
//! Tests for dependency collection and change fan-out across the store.
//!
//! Success Criteria:
//! 1. Every registered consumer is updated exactly once per effective write
//! 2. Consumers are updated in registration order
//! 3. Strictly equal writes notify nobody
//! 4. Composite replacement re-targets nested bindings

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use reinhardt_reactive::{ReactiveError, Store, Watcher};
use rstest::rstest;
use serde_json::{Value, json};

type Log = Rc<RefCell<Vec<(usize, String)>>>;

fn watch(store: &Store, expr: &str, tag: usize, log: &Log) -> Rc<Watcher> {
	let sink = Rc::clone(log);
	let renderer = store.clone();
	Watcher::new(store, expr, move |value| {
		sink.borrow_mut().push((tag, renderer.render(value)));
		Ok(())
	})
	.unwrap()
}

// ============================================================================
// Fan-out
// ============================================================================

#[rstest]
fn test_consumers_update_in_registration_order() {
	let store = Store::new(json!({ "message": "hello" }));
	let log: Log = Rc::default();
	let _watchers: Vec<_> = (0..3).map(|tag| watch(&store, "message", tag, &log)).collect();

	store.set("message", json!("bye")).unwrap();

	assert_eq!(
		*log.borrow(),
		vec![(0, "bye".into()), (1, "bye".into()), (2, "bye".into())]
	);
}

#[rstest]
fn test_failing_consumer_stops_fan_out() {
	let store = Store::new(json!({ "n": 0 }));
	let log: Log = Rc::default();
	let _first = watch(&store, "n", 0, &log);
	let _failing = Watcher::new(&store, "n", |_| {
		Err(ReactiveError::reaction(std::io::Error::other("render failed")))
	})
	.unwrap();
	let _last = watch(&store, "n", 2, &log);

	let err = store.set("n", json!(1)).unwrap_err();

	assert!(matches!(err, ReactiveError::Reaction(_)));
	assert_eq!(*log.borrow(), vec![(0, "1".into())]);
}

#[rstest]
#[case(json!(1), json!(1))]
#[case(json!(1), json!(1.0))]
#[case(json!("same"), json!("same"))]
#[case(json!(null), json!(null))]
#[case(json!(false), json!(false))]
fn test_equal_write_is_a_no_op(#[case] initial: Value, #[case] written: Value) {
	let store = Store::new(json!({ "v": initial }));
	let log: Log = Rc::default();
	let _watcher = watch(&store, "v", 0, &log);

	store.set("v", written).unwrap();

	assert!(log.borrow().is_empty());
}

#[rstest]
fn test_large_integer_write_is_not_lost() {
	let store = Store::new(json!({ "id": 9_007_199_254_740_992u64 }));
	let log: Log = Rc::default();
	let _watcher = watch(&store, "id", 0, &log);

	store.set("id", json!(9_007_199_254_740_993u64)).unwrap();

	assert_eq!(*log.borrow(), vec![(0, "9007199254740993".into())]);
	assert_eq!(store.get("id").unwrap(), json!(9_007_199_254_740_993u64));
}

#[rstest]
fn test_composite_write_always_notifies() {
	let store = Store::new(json!({ "items": [1, 2] }));
	let log: Log = Rc::default();
	let _watcher = watch(&store, "items", 0, &log);

	store.set("items", json!([1, 2])).unwrap();

	assert_eq!(*log.borrow(), vec![(0, "[1,2]".into())]);
}

// ============================================================================
// Nested bindings
// ============================================================================

#[rstest]
fn test_replacing_parent_updates_nested_binding() {
	let store = Store::new(json!({ "user": { "name": "Ada" } }));
	let log: Log = Rc::default();
	let watcher = watch(&store, "user.name", 0, &log);

	store.set("user", json!({ "name": "Grace" })).unwrap();
	assert_eq!(*log.borrow(), vec![(0, "Grace".into())]);

	// The binding keeps listening to the old `name` cell only; the new cell
	// has no subscribers until something re-evaluates with tracking.
	assert!(!store.is_registered("user.name", &watcher).unwrap());
	assert!(store.is_registered("user", &watcher).unwrap());
}

#[rstest]
fn test_array_slot_binding() {
	let store = Store::new(json!({ "todos": ["write", "test"] }));
	let log: Log = Rc::default();
	let _first = watch(&store, "todos.0", 0, &log);
	let _count = watch(&store, "todos.length", 1, &log);

	store.set("todos.0", json!("ship")).unwrap();
	store.set("todos", json!(["a", "b", "c"])).unwrap();

	assert_eq!(
		*log.borrow(),
		vec![(0, "ship".into()), (0, "a".into()), (1, "3".into())]
	);
}

#[rstest]
fn test_repeated_reads_register_repeatedly() {
	let store = Store::new(json!({ "a": 1 }));
	store.define_computed("twice", |scope| {
		let a: i64 = scope.get_as("a")?;
		let again: i64 = scope.get_as("a")?;
		Ok(json!(a + again))
	});
	let log: Log = Rc::default();
	let _watcher = watch(&store, "twice", 0, &log);

	assert_eq!(store.subscriber_count("a").unwrap(), 2);

	store.set("a", json!(2)).unwrap();
	// The second notification sees an unchanged value.
	assert_eq!(*log.borrow(), vec![(0, "4".into())]);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	/// Property: each live consumer of a property reacts exactly once per
	/// effective write, in registration order.
	#[test]
	fn test_fan_out_exactly_once(consumers in 1usize..12, writes in proptest::collection::vec(0i64..4, 1..16)) {
		let store = Store::new(json!({ "x": -1 }));
		let log: Log = Rc::default();
		let _watchers: Vec<_> = (0..consumers).map(|tag| watch(&store, "x", tag, &log)).collect();

		let mut expected = Vec::new();
		let mut current = -1;
		for value in writes {
			store.set("x", json!(value)).unwrap();
			if value != current {
				expected.extend((0..consumers).map(|tag| (tag, value.to_string())));
				current = value;
			}
		}

		prop_assert_eq!(&*log.borrow(), &expected);
	}

	/// Property: the plain view of the store always matches the last write.
	#[test]
	fn test_to_json_tracks_writes(name in "[a-z]{1,8}", age in 0u32..120) {
		let store = Store::new(json!({ "person": { "name": "", "age": 0 } }));
		store.set("person.name", json!(name.clone())).unwrap();
		store.set("person . age", json!(age)).unwrap();

		prop_assert_eq!(store.to_json(), json!({ "person": { "name": name, "age": age } }));
	}
}
