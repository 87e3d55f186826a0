//! Reinhardt Directives - template compilation for MVVM bindings
//!
//! Binds a markup tree to reactive data. The compiler walks the tree once,
//! recognizes directive attributes and `{{ }}` interpolation markers, and
//! wires each to a [`Watcher`](reinhardt_reactive::Watcher) so that later
//! writes update only the affected nodes.
//!
//! ## Architecture
//!
//! - [`dom`]: in-memory markup tree with events
//! - [`parser`]: markup parsing (nom)
//! - [`directive`]: directive attribute recognition
//! - [`handlers`]: built-in directive handlers and the dispatch table
//! - [`interpolation`]: `{{ }}` markers
//! - [`compiler`]: the two-phase template compiler
//! - [`view_model`]: the root coordinator
//! - [`settings`]: prefix, delimiters, strictness
//!
//! ## Directives
//!
//! | attribute | effect |
//! |---|---|
//! | `v-html="path"` | renders the value as unescaped markup; the first render is compiled |
//! | `v-text="Hi {{ path }}"` | renders the interpolated attribute value as text |
//! | `v-model="path"` | two-way binding of the element's value |
//! | `v-on:<event>="method"` | calls a view-model method on `<event>` |

#![warn(missing_docs)]

pub mod compiler;
pub mod directive;
pub mod dom;
pub mod error;
pub mod handlers;
pub mod interpolation;
pub mod parser;
pub mod settings;
pub mod view_model;

pub use compiler::Compiler;
pub use directive::{Directive, DirectiveKind};
pub use dom::{Event, Listener, Node, NodeType};
pub use error::{ParseError, TemplateError, TemplateResult};
pub use handlers::{Binding, DirectiveTable, Handler};
pub use interpolation::Interpolator;
pub use parser::parse_fragment;
pub use settings::TemplateSettings;
pub use view_model::{Derivation, Method, ViewModel, ViewModelOptions, WeakViewModel};
