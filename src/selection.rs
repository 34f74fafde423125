//! Selection tracking for export
//!
//! The selection is a set of image references (URLs), not record identifiers.
//! It is stored as an insertion-ordered list so downloads run in a
//! deterministic order; membership is still unique.
//!
//! The "select all" state is derived, never stored: it is on exactly when the
//! visible records contribute at least one image reference and every one of
//! them is selected. Toggling single items or changing the filter therefore
//! cannot leave a stale flag behind.

use crate::types::SalesRecord;

/// Tracks which image references are checked
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: Vec<String>,
}

impl SelectionTracker {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `image_ref` if absent, remove it if present
    ///
    /// Returns whether the reference is selected afterwards.
    pub fn toggle(&mut self, image_ref: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|s| s == image_ref) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(image_ref.to_string());
            true
        }
    }

    /// Whether `image_ref` is selected (checkbox state for a row)
    pub fn is_selected(&self, image_ref: &str) -> bool {
        self.selected.iter().any(|s| s == image_ref)
    }

    /// Whether every image of the visible records is selected
    ///
    /// False when the visible records carry no images at all.
    pub fn is_all_selected(&self, visible: &[&SalesRecord]) -> bool {
        let mut refs = visible_refs(visible).peekable();
        refs.peek().is_some() && refs.all(|r| self.is_selected(r))
    }

    /// Select every visible image, or clear the selection if all are selected
    ///
    /// Selecting replaces the selection with exactly the visible image
    /// references in record order; records without an image contribute
    /// nothing. Returns the select-all state afterwards.
    pub fn toggle_select_all(&mut self, visible: &[&SalesRecord]) -> bool {
        if self.is_all_selected(visible) {
            self.selected.clear();
            return false;
        }
        self.selected.clear();
        for image_ref in visible_refs(visible) {
            if !self.is_selected(image_ref) {
                self.selected.push(image_ref.to_string());
            }
        }
        self.is_all_selected(visible)
    }

    /// Drop selected references that are not among the visible records
    ///
    /// Returns how many references were removed.
    pub fn retain_visible(&mut self, visible: &[&SalesRecord]) -> usize {
        let before = self.selected.len();
        self.selected
            .retain(|s| visible_refs(visible).any(|r| r == s.as_str()));
        before - self.selected.len()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Number of selected references
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected references in selection order
    pub fn as_slice(&self) -> &[String] {
        &self.selected
    }
}

fn visible_refs<'a>(visible: &'a [&'a SalesRecord]) -> impl Iterator<Item = &'a str> + 'a {
    visible.iter().filter_map(|r| r.image_ref())
}
