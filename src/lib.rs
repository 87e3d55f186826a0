//! # Reinhardt MVVM
//!
//! A minimal data-binding engine: give it a plain data object and a markup
//! tree with directives, and writes to the data update exactly the nodes that
//! depend on them. No virtual tree, no diffing.
//!
//! ## Crates
//!
//! - [`reactive`]: reactive store, dependency registries, watchers
//! - [`directives`]: markup tree, directive compiler, view model
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use reinhardt_mvvm::prelude::*;
//! use serde_json::json;
//!
//! let el = Node::parse("div", r#"
//!     <input v-model="name">
//!     <p>Hello, {{ name }}!</p>
//!     <button v-on:click="reset">reset</button>
//! "#)?;
//!
//! let vm = ViewModel::new(
//!     ViewModelOptions::new()
//!         .el(el.clone())
//!         .data(json!({ "name": "world" }))
//!         .method("reset", |vm, _event| vm.set("name", json!("world"))),
//! )?;
//!
//! vm.set("name", json!("Ada"))?;
//! assert_eq!(el.find("p").unwrap().text_content(), "Hello, Ada!");
//! ```

pub mod directives;
pub mod reactive;

pub use reinhardt_directives::{
	Event, Node, TemplateError, TemplateResult, TemplateSettings, ViewModel, ViewModelOptions,
};
pub use reinhardt_reactive::{ReactiveError, ReactiveResult, Scope, Store, Watcher};

/// Common imports for building view models.
pub mod prelude {
	pub use crate::{
		Event, Node, ReactiveError, ReactiveResult, Scope, Store, TemplateError, TemplateResult,
		TemplateSettings, ViewModel, ViewModelOptions, Watcher,
	};
}
