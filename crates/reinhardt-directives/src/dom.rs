//! In-memory markup tree.
//!
//! A small DOM model with the operations bindings need: attribute and text
//! mutation, child moves, per-event listeners, and HTML serialization.
//! [`Node`] is a shared handle; cloning it does not copy the tree.
//!
//! Events are delivered to their target only. There is no capture or bubble
//! phase.

use core::cell::RefCell;
use core::fmt;
use std::borrow::Cow;
use std::rc::{Rc, Weak};

use crate::error::{ParseError, TemplateResult};
use crate::parser::parse_fragment;

/// An event listener.
pub type Listener = Rc<dyn Fn(&Event) -> TemplateResult<()> + 'static>;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// Returns true if `tag` is a void element.
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
	/// An element with a tag name and attributes.
	Element,
	/// A text node.
	Text,
	/// A comment.
	Comment,
	/// A detached container whose children move on append.
	Fragment,
}

enum NodeKind {
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
	},
	Text(String),
	Comment(String),
	Fragment,
}

struct NodeData {
	kind: NodeKind,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<Node>,
	listeners: Vec<(String, Listener)>,
}

/// A handle to a node in a markup tree.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
	fn with_kind(kind: NodeKind) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
			listeners: Vec::new(),
		})))
	}

	/// Creates an element.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::with_kind(NodeKind::Element {
			tag: tag.into(),
			attrs: Vec::new(),
		})
	}

	/// Creates a text node.
	pub fn text(data: impl Into<String>) -> Self {
		Self::with_kind(NodeKind::Text(data.into()))
	}

	/// Creates a comment node.
	pub fn comment(data: impl Into<String>) -> Self {
		Self::with_kind(NodeKind::Comment(data.into()))
	}

	/// Creates an empty fragment.
	pub fn fragment() -> Self {
		Self::with_kind(NodeKind::Fragment)
	}

	/// Parses markup into a new element's children.
	pub fn parse(tag: impl Into<String>, markup: &str) -> Result<Self, ParseError> {
		let element = Self::element(tag);
		element.set_inner_html(markup)?;
		Ok(element)
	}

	/// The node kind.
	pub fn node_type(&self) -> NodeType {
		match self.0.borrow().kind {
			NodeKind::Element { .. } => NodeType::Element,
			NodeKind::Text(_) => NodeType::Text,
			NodeKind::Comment(_) => NodeType::Comment,
			NodeKind::Fragment => NodeType::Fragment,
		}
	}

	/// Returns true for element nodes.
	pub fn is_element(&self) -> bool {
		self.node_type() == NodeType::Element
	}

	/// Returns true for text nodes.
	pub fn is_text(&self) -> bool {
		self.node_type() == NodeType::Text
	}

	/// Returns true if both handles refer to the same node.
	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// The tag name of an element.
	pub fn tag_name(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	// ------------------------------------------------------------------
	// Attributes
	// ------------------------------------------------------------------

	/// The value of an attribute.
	pub fn attr(&self, name: &str) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Element { attrs, .. } => attrs
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	/// Returns true if the attribute is present.
	pub fn has_attr(&self, name: &str) -> bool {
		match &self.0.borrow().kind {
			NodeKind::Element { attrs, .. } => attrs.iter().any(|(key, _)| key == name),
			_ => false,
		}
	}

	/// All attributes in source order.
	pub fn attrs(&self) -> Vec<(String, String)> {
		match &self.0.borrow().kind {
			NodeKind::Element { attrs, .. } => attrs.clone(),
			_ => Vec::new(),
		}
	}

	/// Sets an attribute, keeping its position if it already exists.
	///
	/// Ignored on non-element nodes.
	pub fn set_attr(&self, name: &str, value: impl Into<String>) {
		if let NodeKind::Element { attrs, .. } = &mut self.0.borrow_mut().kind {
			let value = value.into();
			match attrs.iter_mut().find(|(key, _)| key == name) {
				Some((_, existing)) => *existing = value,
				None => attrs.push((name.to_string(), value)),
			}
		}
	}

	/// Removes an attribute and returns its value.
	pub fn remove_attr(&self, name: &str) -> Option<String> {
		match &mut self.0.borrow_mut().kind {
			NodeKind::Element { attrs, .. } => {
				let index = attrs.iter().position(|(key, _)| key == name)?;
				Some(attrs.remove(index).1)
			}
			_ => None,
		}
	}

	/// The form value of an element.
	///
	/// The `value` property and attribute are the same storage in this model.
	pub fn value(&self) -> String {
		self.attr("value").unwrap_or_default()
	}

	/// Sets the form value of an element.
	pub fn set_value(&self, value: impl Into<String>) {
		self.set_attr("value", value);
	}

	// ------------------------------------------------------------------
	// Character data
	// ------------------------------------------------------------------

	/// The data of a text or comment node.
	pub fn data(&self) -> Option<String> {
		match &self.0.borrow().kind {
			NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
			_ => None,
		}
	}

	/// Replaces the data of a text or comment node.
	pub fn set_data(&self, value: impl Into<String>) {
		if let NodeKind::Text(data) | NodeKind::Comment(data) = &mut self.0.borrow_mut().kind {
			*data = value.into();
		}
	}

	/// Concatenated text of this node and its descendants.
	pub fn text_content(&self) -> String {
		let mut out = String::new();
		self.collect_text(&mut out);
		out
	}

	fn collect_text(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Comment(_) => {}
			NodeKind::Element { .. } | NodeKind::Fragment => {
				for child in &data.children {
					child.collect_text(out);
				}
			}
		}
	}

	// ------------------------------------------------------------------
	// Tree structure
	// ------------------------------------------------------------------

	/// The parent node.
	pub fn parent(&self) -> Option<Node> {
		self.0.borrow().parent.upgrade().map(Node)
	}

	/// Child nodes, in order.
	pub fn children(&self) -> Vec<Node> {
		self.0.borrow().children.clone()
	}

	/// The last child node.
	pub fn last_child(&self) -> Option<Node> {
		self.0.borrow().children.last().cloned()
	}

	/// Number of child nodes.
	pub fn child_count(&self) -> usize {
		self.0.borrow().children.len()
	}

	/// Returns true if `other` is this node or one of its descendants.
	pub fn contains(&self, other: &Node) -> bool {
		let mut cursor = Some(other.clone());
		while let Some(node) = cursor {
			if node.ptr_eq(self) {
				return true;
			}
			cursor = node.parent();
		}
		false
	}

	/// Appends `child`, moving it from its current parent.
	///
	/// Appending a fragment moves the fragment's children instead and leaves
	/// it empty. Appending an ancestor of `self` is ignored.
	pub fn append_child(&self, child: &Node) {
		if child.node_type() == NodeType::Fragment {
			for grandchild in child.take_children() {
				self.append_child(&grandchild);
			}
			return;
		}
		if child.contains(self) {
			tracing::warn!("ignoring append of a node into its own subtree");
			return;
		}

		child.detach();
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.0.borrow_mut().children.push(child.clone());
	}

	/// Detaches all children and returns them.
	pub fn take_children(&self) -> Vec<Node> {
		let children = core::mem::take(&mut self.0.borrow_mut().children);
		for child in &children {
			child.0.borrow_mut().parent = Weak::new();
		}
		children
	}

	/// Removes this node from its parent.
	pub fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent
				.0
				.borrow_mut()
				.children
				.retain(|sibling| !sibling.ptr_eq(self));
		}
		self.0.borrow_mut().parent = Weak::new();
	}

	/// First descendant element with the given tag, in document order.
	pub fn find(&self, tag: &str) -> Option<Node> {
		for child in self.children() {
			if child.tag_name().as_deref() == Some(tag) {
				return Some(child);
			}
			if let Some(found) = child.find(tag) {
				return Some(found);
			}
		}
		None
	}

	// ------------------------------------------------------------------
	// Serialization
	// ------------------------------------------------------------------

	/// Serializes this node and its subtree.
	pub fn to_html(&self) -> String {
		let mut out = String::new();
		self.write_html(&mut out);
		out
	}

	/// Serializes the children of this node.
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		for child in &self.0.borrow().children {
			child.write_html(&mut out);
		}
		out
	}

	/// Replaces the children of this node with parsed markup.
	pub fn set_inner_html(&self, markup: &str) -> Result<(), ParseError> {
		let fragment = parse_fragment(markup)?;
		drop(self.take_children());
		self.append_child(&fragment);
		Ok(())
	}

	fn write_html(&self, out: &mut String) {
		let data = self.0.borrow();
		match &data.kind {
			NodeKind::Element { tag, attrs } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attrs {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&escape_attr(value));
					out.push('"');
				}
				out.push('>');
				if is_void_element(tag) {
					return;
				}
				for child in &data.children {
					child.write_html(out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
			NodeKind::Text(text) => out.push_str(&escape_text(text)),
			NodeKind::Comment(comment) => {
				out.push_str("<!--");
				out.push_str(comment);
				out.push_str("-->");
			}
			NodeKind::Fragment => {
				for child in &data.children {
					child.write_html(out);
				}
			}
		}
	}

	// ------------------------------------------------------------------
	// Events
	// ------------------------------------------------------------------

	/// Registers a listener for `event_type`.
	pub fn add_event_listener<F>(&self, event_type: impl Into<String>, listener: F)
	where
		F: Fn(&Event) -> TemplateResult<()> + 'static,
	{
		self.0
			.borrow_mut()
			.listeners
			.push((event_type.into(), Rc::new(listener)));
	}

	/// Number of listeners registered for `event_type`.
	pub fn listener_count(&self, event_type: &str) -> usize {
		self.0
			.borrow()
			.listeners
			.iter()
			.filter(|(kind, _)| kind == event_type)
			.count()
	}

	/// Invokes the listeners for the event's type in registration order.
	///
	/// The first failing listener stops dispatch and its error is returned.
	pub fn dispatch_event(&self, event: &Event) -> TemplateResult<()> {
		let listeners: Vec<Listener> = self
			.0
			.borrow()
			.listeners
			.iter()
			.filter(|(kind, _)| kind == event.event_type())
			.map(|(_, listener)| Rc::clone(listener))
			.collect();

		for listener in listeners {
			listener(event)?;
		}
		Ok(())
	}

	/// Dispatches a new event of `event_type` targeting this node.
	pub fn dispatch(&self, event_type: &str) -> TemplateResult<()> {
		self.dispatch_event(&Event::new(event_type, self))
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Node").field(&self.to_html()).finish()
	}
}

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
	event_type: String,
	target: Node,
}

impl Event {
	/// Creates an event targeting `target`.
	pub fn new(event_type: impl Into<String>, target: &Node) -> Self {
		Self {
			event_type: event_type.into(),
			target: target.clone(),
		}
	}

	/// The event type, e.g. `"click"`.
	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	/// The node the event was dispatched to.
	pub fn target(&self) -> &Node {
		&self.target
	}
}

fn escape_text(s: &str) -> Cow<'_, str> {
	escape(s, &['&', '<', '>'])
}

fn escape_attr(s: &str) -> Cow<'_, str> {
	escape(s, &['&', '"'])
}

fn escape<'a>(s: &'a str, special: &[char]) -> Cow<'a, str> {
	if !s.contains(special) {
		return Cow::Borrowed(s);
	}
	let mut escaped = String::with_capacity(s.len() + 8);
	for c in s.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' if special.contains(&c) => escaped.push_str("&lt;"),
			'>' if special.contains(&c) => escaped.push_str("&gt;"),
			'"' if special.contains(&c) => escaped.push_str("&quot;"),
			_ => escaped.push(c),
		}
	}
	Cow::Owned(escaped)
}
