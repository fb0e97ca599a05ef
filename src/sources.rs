use serde::{Deserialize, Serialize};

use crate::source::CalendarSource;

/// Ordered list of confirmed sources.
///
/// Order is display and precedence order. Nothing is deduplicated; the same
/// directory or name may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceList {
    sources: Vec<CalendarSource>,
}

impl SourceList {
    pub fn new(sources: Vec<CalendarSource>) -> Self {
        Self { sources }
    }

    pub fn as_slice(&self) -> &[CalendarSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CalendarSource> {
        self.sources.get(index)
    }

    pub fn add_source(&mut self, source: CalendarSource) {
        tracing::info!(kind = source.kind().as_str(), name = source.name(), "calendar source added");
        self.sources.push(source);
    }

    pub fn remove_source(&mut self, index: usize) -> Option<CalendarSource> {
        if index >= self.sources.len() {
            return None;
        }
        let removed = self.sources.remove(index);
        tracing::info!(kind = removed.kind().as_str(), name = removed.name(), "calendar source removed");
        Some(removed)
    }

    pub fn set_sources(&mut self, sources: Vec<CalendarSource>) {
        self.sources = sources;
    }

    /// Move the source at `from` so it ends up at `to`
    pub fn move_source(&mut self, from: usize, to: usize) -> bool {
        if from >= self.sources.len() || to >= self.sources.len() {
            return false;
        }
        let source = self.sources.remove(from);
        self.sources.insert(to, source);
        true
    }

    /// Directories already mapped by local sources
    pub fn used_directories(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                CalendarSource::Local { directory, .. } if !directory.is_empty() => {
                    Some(directory.clone())
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str, directory: &str) -> CalendarSource {
        CalendarSource::Local {
            name: name.to_string(),
            color: "#ffffff".to_string(),
            directory: directory.to_string(),
        }
    }

    fn ical(name: &str) -> CalendarSource {
        CalendarSource::Ical {
            name: name.to_string(),
            color: "#ffffff".to_string(),
            url: "https://example.com/feed.ics".to_string(),
        }
    }

    #[test]
    fn test_add_appends_without_dedup() {
        let mut list = SourceList::default();
        list.add_source(local("a", "Events"));
        list.add_source(local("a", "Events"));
        list.add_source(ical("b"));

        assert_eq!(list.len(), 3);
        assert_eq!(list.get(2).unwrap().name(), "b");
        assert_eq!(list.used_directories(), vec!["Events", "Events"]);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut list = SourceList::new(vec![ical("only")]);
        assert!(list.remove_source(1).is_none());
        assert_eq!(list.remove_source(0).unwrap().name(), "only");
        assert!(list.is_empty());
    }

    #[test]
    fn test_move_source() {
        let mut list = SourceList::new(vec![ical("a"), ical("b"), ical("c")]);
        assert!(list.move_source(0, 2));
        let names: Vec<&str> = list.as_slice().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert!(!list.move_source(0, 3));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let list = SourceList::new(vec![local("notes", "Calendar")]);
        let json = serde_json::to_value(&list).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["directory"], "Calendar");
    }
}
