//! Experience catalog models.

use serde::{Deserialize, Serialize};

use super::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Adventure,
    Culture,
}

/// A bookable experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: u64,
    pub title: String,
    pub category: Category,
    pub price_cents: u64,
    pub duration_min: u32,
    pub images: Vec<String>,
    pub short_description: String,
}

/// `GET /experiences` response body.
pub type ExperiencesPage = Page<Experience>;
