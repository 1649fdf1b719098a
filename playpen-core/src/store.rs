//! Session state: the three editable fragments and the selected one.

use playpen_types::{CodeFragment, FragmentKind};
use serde::{Deserialize, Serialize};

/// The fragments being edited, one per kind
///
/// Every kind is always present, so lookups never fail. Cloning yields an
/// independent snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    fragments: [CodeFragment; 3],
    selected: FragmentKind,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Three empty fragments with markup selected
    pub fn new() -> Self {
        Self {
            fragments: FragmentKind::ALL.map(CodeFragment::empty),
            selected: FragmentKind::Markup,
        }
    }

    pub fn get(&self, kind: FragmentKind) -> &CodeFragment {
        &self.fragments[kind.index()]
    }

    /// All fragments in [`FragmentKind::ALL`] order
    pub fn fragments(&self) -> &[CodeFragment] {
        &self.fragments
    }

    /// Return a new state with `kind` replaced; `self` is left as it was
    #[must_use]
    pub fn set(&self, kind: FragmentKind, value: impl Into<String>) -> SessionState {
        let mut next = self.clone();
        next.set_in_place(kind, value);
        next
    }

    pub fn set_in_place(&mut self, kind: FragmentKind, value: impl Into<String>) {
        self.fragments[kind.index()].value = value.into();
    }

    pub fn select(&mut self, kind: FragmentKind) {
        self.selected = kind;
    }

    pub fn selected(&self) -> FragmentKind {
        self.selected
    }

    pub fn selected_fragment(&self) -> &CodeFragment {
        self.get(self.selected)
    }

    /// Replace the text of the selected fragment
    pub fn edit_selected(&mut self, value: impl Into<String>) {
        self.set_in_place(self.selected, value);
    }
}
