//! In-memory catalogue shared by every route.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A catalogued book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub shelf: String,
}

/// Fields accepted when cataloguing a book.
#[derive(Debug, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default = "default_shelf")]
    pub shelf: String,
}

fn default_shelf() -> String {
    "unsorted".to_string()
}

/// The catalogue.
#[derive(Debug)]
pub struct Library {
    books: RwLock<IndexMap<u64, Book>>,
    next_id: AtomicU64,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Loads the starter collection. Does nothing if books already exist.
    pub fn seed(&self) {
        if !self.books.read().is_empty() {
            return;
        }
        for (title, author, shelf) in [
            ("Dune", "Frank Herbert", "sci-fi"),
            ("The Left Hand of Darkness", "Ursula K. Le Guin", "sci-fi"),
            ("Emma", "Jane Austen", "classics"),
        ] {
            self.add(NewBook {
                title: title.to_string(),
                author: author.to_string(),
                shelf: shelf.to_string(),
            });
        }
    }

    pub fn add(&self, new: NewBook) -> Book {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let book = Book {
            id,
            title: new.title,
            author: new.author,
            shelf: new.shelf,
        };
        self.books.write().insert(id, book.clone());
        book
    }

    pub fn book(&self, id: u64) -> Option<Book> {
        self.books.read().get(&id).cloned()
    }

    pub fn remove(&self, id: u64) -> Option<Book> {
        self.books.write().shift_remove(&id)
    }

    /// Books in catalogue order, optionally limited to one shelf.
    pub fn books(&self, shelf: Option<&str>) -> Vec<Book> {
        self.books
            .read()
            .values()
            .filter(|book| shelf.map_or(true, |s| book.shelf == s))
            .cloned()
            .collect()
    }

    /// Shelf names with their book counts, in first-seen order.
    pub fn shelves(&self) -> IndexMap<String, usize> {
        let mut shelves = IndexMap::new();
        for book in self.books.read().values() {
            *shelves.entry(book.shelf.clone()).or_insert(0) += 1;
        }
        shelves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_idempotent() {
        let library = Library::new();
        library.seed();
        library.seed();
        assert_eq!(library.books(None).len(), 3);
        assert_eq!(library.books(Some("sci-fi")).len(), 2);
        assert_eq!(library.shelves().get("classics"), Some(&1));
    }

    #[test]
    fn ids_are_not_reused() {
        let library = Library::new();
        let first = library.add(NewBook {
            title: "A".into(),
            author: "B".into(),
            shelf: default_shelf(),
        });
        library.remove(first.id);
        let second = library.add(NewBook {
            title: "C".into(),
            author: "D".into(),
            shelf: default_shelf(),
        });
        assert!(second.id > first.id);
        assert_eq!(library.book(first.id), None);
    }
}
