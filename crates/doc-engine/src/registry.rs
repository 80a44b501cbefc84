//! The document registry: explicit session state for cross-document features.
//!
//! Nothing here is global. A host creates one [`DocumentRegistry`] per
//! session (window, workspace) and passes it to whichever component needs to
//! see across documents; word completion scanning other open files is the
//! canonical consumer.

use crate::buffer::Direction;
use crate::document::Document;

/// Stable handle to a document within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocId(usize);

/// The set of open documents in one editing session.
#[derive(Default)]
pub struct DocumentRegistry {
    slots: Vec<Option<Document>>,
}

impl DocumentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, returning its handle. Closed slots are reused.
    pub fn open(&mut self, document: Document) -> DocId {
        if let Some(free) = self.slots.iter().position(Option::is_none) {
            self.slots[free] = Some(document);
            DocId(free)
        } else {
            self.slots.push(Some(document));
            DocId(self.slots.len() - 1)
        }
    }

    /// Remove and return a document. Returns `None` for a stale handle.
    pub fn close(&mut self, id: DocId) -> Option<Document> {
        self.slots.get_mut(id.0)?.take()
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` when no documents are open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a document.
    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.slots.get(id.0)?.as_ref()
    }

    /// Look up a document for mutation.
    pub fn get_mut(&mut self, id: DocId) -> Option<&mut Document> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Iterate over open documents.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|d| (DocId(i), d)))
    }

    /// Cycle word completion in document `id`, drawing candidates from every
    /// other open document as well as the target's own buffer and keywords.
    pub fn complete_word(&mut self, id: DocId, direction: Direction) -> bool {
        let Some(prefix) = self.get(id).and_then(Document::completion_prefix) else {
            return false;
        };

        let mut external: Vec<String> = Vec::new();
        for (other_id, other) in self.iter() {
            if other_id == id {
                continue;
            }
            for word in other
                .buffer()
                .words_beginning_with(0, Direction::Forward, &prefix)
            {
                if !external.contains(&word) {
                    external.push(word);
                }
            }
        }

        match self.get_mut(id) {
            Some(doc) => doc.complete_word(direction, &external),
            None => false,
        }
    }

    /// Idle tick: give each document a chance to re-parse. Returns `true`
    /// when any document did work.
    pub fn on_idle(&mut self) -> bool {
        let mut worked = false;
        for slot in self.slots.iter_mut().flatten() {
            worked |= slot.on_idle();
        }
        worked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;

    #[test]
    fn open_close_reuses_slots() {
        let mut registry = DocumentRegistry::new();
        let a = registry.open(Document::new("a"));
        let b = registry.open(Document::new("b"));
        assert_eq!(registry.len(), 2);

        let closed = registry.close(a).expect("open doc");
        assert_eq!(closed.text(), "a");
        assert!(registry.close(a).is_none());

        let c = registry.open(Document::new("c"));
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(registry.get(c).unwrap().text(), "c");
    }

    #[test]
    fn completion_sees_other_documents() {
        let mut registry = DocumentRegistry::new();
        let target = registry.open(Document::new("fra"));
        registry.open(Document::new("fragment framework"));

        let doc = registry.get_mut(target).unwrap();
        doc.set_selection(Selection::caret(3));

        assert!(registry.complete_word(target, Direction::Forward));
        let text = registry.get(target).unwrap().text();
        assert!(text == "fragment" || text == "framework", "got {text}");
    }

    #[test]
    fn idle_visits_every_document() {
        let mut registry = DocumentRegistry::new();
        registry.open(Document::new("one"));
        registry.open(Document::new("two"));
        assert!(registry.on_idle());
        assert!(!registry.on_idle());
    }
}
