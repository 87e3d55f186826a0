//! Directive compiler and view model
//!
//! This module provides access to reinhardt-directives: the markup tree, the
//! `v-*` directive vocabulary, `{{ }}` interpolation, and the view model that
//! ties them to a reactive store.

// Re-export all reinhardt-directives functionality
pub use reinhardt_directives::*;
