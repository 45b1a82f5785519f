//! Experience catalog: title search with fixed-size pages, lookup and delete.

use std::sync::{PoisonError, RwLock};

use crate::data::seed_experiences;
use crate::models::{Experience, ExperiencesPage};

pub const PAGE_SIZE: u32 = 6;

#[derive(Debug)]
pub struct Catalog {
    items: RwLock<Vec<Experience>>,
}

impl Catalog {
    pub fn new(items: Vec<Experience>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn seeded() -> Self {
        Self::new(seed_experiences())
    }

    /// Case-insensitive title match, paged by [`PAGE_SIZE`]. A page past the
    /// end is empty but still reports the total.
    pub fn search(&self, query: &str, page: u32) -> ExperiencesPage {
        let query = query.to_lowercase();
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let matches: Vec<&Experience> = items
            .iter()
            .filter(|x| x.title.to_lowercase().contains(&query))
            .collect();
        let page = page.max(1);
        let start = (page as usize - 1).saturating_mul(PAGE_SIZE as usize);
        let data = matches
            .iter()
            .skip(start)
            .take(PAGE_SIZE as usize)
            .map(|x| (*x).clone())
            .collect();
        ExperiencesPage {
            data,
            page,
            page_size: PAGE_SIZE,
            total: matches.len() as u64,
        }
    }

    pub fn get(&self, id: u64) -> Option<Experience> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|x| x.id == id)
            .cloned()
    }

    /// Returns `false` if no experience has `id`.
    pub fn remove(&self, id: u64) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|x| x.id != id);
        items.len() != before
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
