//! Core of a CustomTkinter GUI builder: the widget document model, the
//! deterministic Python code generator, the heuristic reverse parser that
//! turns edited code back into widgets, and bounded snapshot undo/redo.
//!
//! Everything here is pure data and synchronous operations; rendering, input
//! handling and dialogs belong to the embedding application.

pub mod codegen;
pub mod history;
pub mod parser;
pub mod project;
pub mod widget;

pub use codegen::{effective_window_size, generate, validate, StyleConfig, FIT_MARGIN};
pub use history::{History, Snapshot, DEFAULT_MAX_DEPTH};
pub use parser::parse;
pub use project::{Document, GroupError, ProjectError, WidgetGroup, WindowSpec};
pub use widget::{
    sanitize_id, Property, PropertyType, PropertyValue, Widget, WidgetId, WidgetKind,
};
