//! Buffered multi-select.
//!
//! Toggles only touch the picker's own staged set. The caller sees nothing
//! until [`MultiSelectPicker::commit`], which hands over the whole selection
//! at once and consumes the picker.

use std::collections::HashSet;
use std::hash::Hash;

pub struct MultiSelectPicker<K> {
    title: String,
    options: Vec<(K, String)>,
    staged: HashSet<K>,
}

impl<K: Copy + Eq + Hash> MultiSelectPicker<K> {
    /// Open a picker. Selected ids that are not among `options` are ignored.
    pub fn new(
        title: impl Into<String>,
        options: Vec<(K, String)>,
        selected: impl IntoIterator<Item = K>,
    ) -> Self {
        let staged = selected
            .into_iter()
            .filter(|id| options.iter().any(|(option, _)| option == id))
            .collect();
        Self {
            title: title.into(),
            options,
            staged,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn options(&self) -> &[(K, String)] {
        &self.options
    }

    pub fn is_selected(&self, id: K) -> bool {
        self.staged.contains(&id)
    }

    pub fn set(&mut self, id: K, checked: bool) {
        if !self.options.iter().any(|(option, _)| *option == id) {
            return;
        }
        if checked {
            self.staged.insert(id);
        } else {
            self.staged.remove(&id);
        }
    }

    pub fn toggle(&mut self, id: K) {
        let checked = !self.is_selected(id);
        self.set(id, checked);
    }

    /// Staged ids in option order
    pub fn selection(&self) -> Vec<K> {
        self.options
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| self.staged.contains(id))
            .collect()
    }

    /// Publish the staged selection to `on_submit`, exactly once
    pub fn commit<R>(self, on_submit: impl FnOnce(Vec<K>) -> R) -> R {
        on_submit(self.selection())
    }

    /// Close without publishing anything
    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<(u8, String)> {
        vec![(1, "One".to_string()), (2, "Two".to_string()), (3, "Three".to_string())]
    }

    #[test]
    fn test_commit_publishes_staged_set_once() {
        let mut picker = MultiSelectPicker::new("Numbers", options(), [3]);
        picker.toggle(1);
        picker.toggle(3);
        picker.toggle(2);
        picker.set(3, true);
        picker.set(2, false);

        let mut calls = Vec::new();
        picker.commit(|selected| calls.push(selected));

        assert_eq!(calls, vec![vec![1, 3]]);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut picker = MultiSelectPicker::new("Numbers", options(), [9, 2]);
        picker.toggle(7);
        assert_eq!(picker.selection(), vec![2]);
    }

    #[test]
    fn test_empty_selection_is_still_committed() {
        let mut picker = MultiSelectPicker::new("Numbers", options(), [2]);
        picker.toggle(2);
        let committed = picker.commit(|selected| selected);
        assert!(committed.is_empty());
    }
}
