use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The two flat vocabularies titles are classified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Categories,
    Genres,
}

impl Taxonomy {
    /// Table name; also the module name and URL segment.
    pub const fn table(self) -> &'static str {
        match self {
            Taxonomy::Categories => "categories",
            Taxonomy::Genres => "genres",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            Taxonomy::Categories => "category",
            Taxonomy::Genres => "genre",
        }
    }

    pub const fn schema_name(self) -> &'static str {
        match self {
            Taxonomy::Categories => "Category",
            Taxonomy::Genres => "Genre",
        }
    }
}

/// A category or genre.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Term {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTerm {
    #[garde(length(chars, min = 1, max = 256))]
    pub name: String,
    #[garde(length(chars, min = 1, max = 50), pattern(r"^[-a-zA-Z0-9_]+$"))]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TermSearch {
    pub search: Option<String>,
}
