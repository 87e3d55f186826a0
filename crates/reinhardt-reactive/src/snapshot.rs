//! Values observed by a read.

use serde_json::{Number, Value};

/// Identifier of a reactive composite (object or array) in a store.
///
/// Ids are allocated from a per-store counter and never reused, so two
/// `NodeId`s compare equal exactly when they name the same composite instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

/// The result of resolving a binding path.
#[derive(Debug, Clone)]
pub enum Snapshot {
	/// A reactive object or array owned by the store, compared by identity.
	Node(NodeId),
	/// A scalar, or a composite that lives outside the store (a computed result).
	Value(Value),
}

impl Snapshot {
	/// Strict equality: scalars by type and value, composites by identity.
	///
	/// Two detached composites are never strictly equal, even when their
	/// contents match.
	pub fn strict_eq(&self, other: &Snapshot) -> bool {
		match (self, other) {
			(Snapshot::Node(a), Snapshot::Node(b)) => a == b,
			(Snapshot::Value(a), Snapshot::Value(b)) => strict_eq(a, b),
			_ => false,
		}
	}

	/// Returns the scalar value, if this snapshot is not a reactive composite.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Snapshot::Value(value) => Some(value),
			Snapshot::Node(_) => None,
		}
	}
}

/// Strict equality over plain values.
///
/// Numbers compare numerically (`1` equals `1.0`), integers exactly; arrays
/// and objects are never equal, mirroring reference semantics for freshly
/// assigned composites.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Bool(a), Value::Bool(b)) => a == b,
		(Value::String(a), Value::String(b)) => a == b,
		(Value::Number(a), Value::Number(b)) => numbers_eq(a, b),
		_ => false,
	}
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
	if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
		return x == y;
	}
	if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
		return x == y;
	}
	// Two integers that do not share a representation differ in sign.
	if !a.is_f64() && !b.is_f64() {
		return false;
	}
	match (a.as_f64(), b.as_f64()) {
		(Some(x), Some(y)) => x == y,
		_ => a == b,
	}
}

/// Renders a scalar for display in text content or attribute values.
///
/// `null` renders as the empty string; composites render as compact JSON.
pub fn display_value(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::Bool(b) => b.to_string(),
		Value::String(s) => s.clone(),
		Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
			(Some(i), _, _) => i.to_string(),
			(_, Some(u), _) => u.to_string(),
			(_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
			(_, _, Some(f)) => f.to_string(),
			_ => n.to_string(),
		},
		Value::Array(_) | Value::Object(_) => value.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(json!(1), json!(1), true)]
	#[case(json!(1), json!(1.0), true)]
	#[case(json!(1), json!("1"), false)]
	#[case(json!("a"), json!("a"), true)]
	#[case(json!(null), json!(null), true)]
	#[case(json!(true), json!(false), false)]
	#[case(json!([1]), json!([1]), false)]
	#[case(json!({}), json!({}), false)]
	#[case(json!(9_007_199_254_740_993u64), json!(9_007_199_254_740_992u64), false)]
	#[case(json!(i64::MIN), json!(i64::MIN), true)]
	#[case(json!(-1), json!(u64::MAX), false)]
	#[case(json!(u64::MAX), json!(u64::MAX), true)]
	fn test_strict_eq(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
		assert_eq!(strict_eq(&a, &b), expected);
	}

	#[rstest]
	#[case(json!(null), "")]
	#[case(json!(42), "42")]
	#[case(json!(-3), "-3")]
	#[case(json!(2.0), "2")]
	#[case(json!(2.5), "2.5")]
	#[case(json!(true), "true")]
	#[case(json!("hi <b>"), "hi <b>")]
	#[case(json!([1, "a"]), r#"[1,"a"]"#)]
	fn test_display_value(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(display_value(&value), expected);
	}

	#[rstest]
	fn test_node_snapshots_compare_by_identity() {
		let a = Snapshot::Node(NodeId(1));
		let b = Snapshot::Node(NodeId(1));
		let c = Snapshot::Node(NodeId(2));
		assert!(a.strict_eq(&b));
		assert!(!a.strict_eq(&c));
		assert!(!a.strict_eq(&Snapshot::Value(Value::Null)));
	}
}
