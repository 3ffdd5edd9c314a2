//! Bounded snapshot undo/redo over the document's widgets, groups and
//! selection.

use crate::project::{Document, WidgetGroup};
use crate::widget::{Widget, WidgetId};
use indexmap::IndexMap;
use std::collections::VecDeque;

pub const DEFAULT_MAX_DEPTH: usize = 50;

/// A deep structural copy of the undoable document state. The window spec is
/// deliberately not captured: window edits go through their own dialog flow
/// and are not part of canvas undo.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    widgets: IndexMap<WidgetId, Widget>,
    groups: IndexMap<String, WidgetGroup>,
    selection: Vec<WidgetId>,
}

impl Snapshot {
    pub fn capture(doc: &Document, selection: &[WidgetId]) -> Self {
        Self {
            widgets: doc.widgets.clone(),
            groups: doc.groups.clone(),
            selection: selection.to_vec(),
        }
    }

    /// Wholesale replacement of the document's undoable state. Properties are
    /// re-normalized against the per-kind schema on the way in, and the
    /// restored selection keeps only ids that still resolve.
    fn apply(self, doc: &mut Document, selection: &mut Vec<WidgetId>) {
        doc.widgets = self.widgets;
        doc.groups = self.groups;
        for widget in doc.widgets.values_mut() {
            widget.normalize_properties();
        }
        *selection = self
            .selection
            .into_iter()
            .filter(|id| doc.widgets.contains_key(id))
            .collect();
    }
}

/// Undo/redo stacks with a bounded undo depth. Pushing past the bound evicts
/// the oldest snapshot; popping an empty stack is a no-op.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Records the current state before a mutation. Any redoable future is
    /// discarded.
    pub fn snapshot(&mut self, doc: &Document, selection: &[WidgetId]) {
        if self.undo_stack.len() >= self.max_depth {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(Snapshot::capture(doc, selection));
        self.redo_stack.clear();
    }

    /// Steps back one snapshot, parking the current state on the redo stack.
    /// Returns whether anything was restored.
    pub fn undo(&mut self, doc: &mut Document, selection: &mut Vec<WidgetId>) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            log::debug!("undo requested with empty stack");
            return false;
        };
        self.redo_stack.push(Snapshot::capture(doc, selection));
        snapshot.apply(doc, selection);
        true
    }

    /// Re-applies the most recently undone snapshot, parking the current
    /// state back on the undo stack. Returns whether anything was restored.
    pub fn redo(&mut self, doc: &mut Document, selection: &mut Vec<WidgetId>) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            log::debug!("redo requested with empty stack");
            return false;
        };
        self.undo_stack.push_back(Snapshot::capture(doc, selection));
        snapshot.apply(doc, selection);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetKind;

    fn doc_with_button(x: i32) -> Document {
        let mut doc = Document::new();
        doc.add_widget(Widget::new("b", WidgetKind::Button, x, 0));
        doc
    }

    #[test]
    fn test_undo_then_redo_restores_exact_state() {
        let mut doc = doc_with_button(0);
        let mut selection = vec![WidgetId::new("b")];
        let mut history = History::new();

        history.snapshot(&doc, &selection);
        doc.widgets[&WidgetId::new("b")].x = 99;
        let edited = doc.clone();

        assert!(history.undo(&mut doc, &mut selection));
        assert_eq!(doc.widgets[&WidgetId::new("b")].x, 0);
        assert!(history.redo(&mut doc, &mut selection));
        assert_eq!(doc.widgets, edited.widgets);
        assert_eq!(selection, [WidgetId::new("b")]);
    }

    #[test]
    fn test_empty_stacks_are_no_ops() {
        let mut doc = doc_with_button(5);
        let mut selection = Vec::new();
        let mut history = History::new();
        assert!(!history.undo(&mut doc, &mut selection));
        assert!(!history.redo(&mut doc, &mut selection));
        assert_eq!(doc.widgets[&WidgetId::new("b")].x, 5);
    }

    #[test]
    fn test_new_snapshot_clears_redo() {
        let mut doc = doc_with_button(0);
        let mut selection = Vec::new();
        let mut history = History::new();

        history.snapshot(&doc, &selection);
        doc.widgets[&WidgetId::new("b")].x = 1;
        history.undo(&mut doc, &mut selection);
        assert!(history.can_redo());

        history.snapshot(&doc, &selection);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_bound_evicts_oldest() {
        let mut doc = doc_with_button(0);
        let mut selection = Vec::new();
        let mut history = History::with_max_depth(50);

        for step in 1..=51 {
            history.snapshot(&doc, &selection);
            doc.widgets[&WidgetId::new("b")].x = step;
        }
        assert_eq!(history.undo_depth(), 50);

        while history.undo(&mut doc, &mut selection) {}
        // the very first state (x = 0) was evicted; the earliest reachable
        // state is the one captured on the second edit
        assert_eq!(doc.widgets[&WidgetId::new("b")].x, 1);
    }

    #[test]
    fn test_restore_drops_stale_selection() {
        let mut doc = doc_with_button(0);
        doc.add_widget(Widget::new("gone", WidgetKind::Label, 10, 10));
        let mut selection = vec![WidgetId::new("gone")];
        let mut history = History::new();

        history.snapshot(&doc, &selection);
        doc.delete_widget(&WidgetId::new("gone"));
        doc.widgets[&WidgetId::new("b")].x = 7;

        // undo restores the deleted widget, so the old selection is valid again
        assert!(history.undo(&mut doc, &mut selection));
        assert_eq!(selection, [WidgetId::new("gone")]);

        // redo removes it again and the selection follows
        assert!(history.redo(&mut doc, &mut selection));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_groups_travel_with_snapshots() {
        let mut doc = Document::new();
        doc.add_widget(Widget::new("a", WidgetKind::Button, 0, 0));
        doc.add_widget(Widget::new("b", WidgetKind::Button, 50, 0));
        let mut selection = Vec::new();
        let mut history = History::new();

        history.snapshot(&doc, &selection);
        let gid = doc
            .create_group("pair", &[WidgetId::new("a"), WidgetId::new("b")])
            .unwrap();
        assert!(doc.groups.contains_key(&gid));

        history.undo(&mut doc, &mut selection);
        assert!(doc.groups.is_empty());
        assert!(doc.widgets[&WidgetId::new("a")].group_id.is_none());

        history.redo(&mut doc, &mut selection);
        assert!(doc.groups.contains_key(&gid));
        assert_eq!(
            doc.widgets[&WidgetId::new("a")].group_id.as_deref(),
            Some(gid.as_str())
        );
    }
}
