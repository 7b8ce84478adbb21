use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use verdict_http::AppError;

use crate::modules::taxonomy::models::Term;
use crate::utils::current_year;

/// Title row with its computed rating.
#[derive(Debug, Clone, FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: String,
    pub category_id: Option<i64>,
    pub created: OffsetDateTime,
    /// Mean review score; `None` while the title has no reviews.
    pub rating: Option<f64>,
}

/// A genre attached to a title, as loaded for a batch of titles.
#[derive(Debug, Clone, FromRow)]
pub struct TitleGenre {
    pub title_id: i64,
    #[sqlx(flatten)]
    pub genre: Term,
}

/// Read representation with nested classification.
#[derive(Debug, Clone, Serialize)]
pub struct TitleView {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<Term>,
    pub category: Option<Term>,
}

impl TitleView {
    pub fn new(row: TitleRow, category: Option<Term>, genre: Vec<Term>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            year: row.year,
            rating: row.rating,
            description: row.description,
            genre,
            category,
        }
    }
}

/// Writes refer to the category and genres by slug.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTitle {
    #[garde(length(chars, min = 1, max = 256))]
    pub name: String,
    #[garde(skip)]
    pub year: i32,
    #[serde(default)]
    #[garde(skip)]
    pub description: String,
    #[garde(length(min = 1))]
    pub genre: Vec<String>,
    #[serde(default)]
    #[garde(skip)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTitle {
    #[garde(length(chars, min = 1, max = 256))]
    pub name: Option<String>,
    #[garde(skip)]
    pub year: Option<i32>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(length(min = 1))]
    pub genre: Option<Vec<String>>,
    /// Absent leaves the category alone; `null` clears it.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[garde(skip)]
    pub category: Option<Option<String>>,
}

/// `GET /titles/` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Category slug.
    pub category: Option<String>,
    /// Genre slug.
    pub genre: Option<String>,
    /// Substring of the name, ignoring case.
    pub name: Option<String>,
    pub year: Option<i32>,
}

impl TitleFilter {
    /// Empty query values filter nothing.
    pub fn normalized(self) -> Self {
        let keep = |value: Option<String>| value.filter(|v| !v.is_empty());
        Self {
            category: keep(self.category),
            genre: keep(self.genre),
            name: keep(self.name),
            year: self.year,
        }
    }
}

pub fn title_not_found(title_id: i64) -> AppError {
    AppError::not_found(format!("title {title_id} not found"))
}

/// A release year may not lie in the future.
pub fn check_year(year: i32) -> Result<(), AppError> {
    let now = current_year();
    if year > now {
        return Err(AppError::invalid_field(
            "year",
            format!("year {year} is in the future (current year is {now})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn future_year_is_rejected() {
        assert!(check_year(1999).is_ok());
        assert!(check_year(current_year()).is_ok());
        assert!(check_year(current_year() + 1).is_err());
    }

    #[test]
    fn create_requires_a_genre() {
        let title: CreateTitle = serde_json::from_value(serde_json::json!({
            "name": "Solaris",
            "year": 1972,
            "genre": [],
            "category": "movie"
        }))
        .unwrap();
        assert!(title.validate().is_err());
        assert_eq!(title.description, "");
    }

    #[test]
    fn empty_filters_are_dropped() {
        let filter = TitleFilter {
            category: Some(String::new()),
            name: Some("dune".to_string()),
            ..TitleFilter::default()
        }
        .normalized();
        assert_eq!(filter.category, None);
        assert_eq!(filter.name.as_deref(), Some("dune"));
    }

    #[test]
    fn view_keeps_null_rating() {
        let row = TitleRow {
            id: 1,
            name: "Solaris".to_string(),
            year: 1972,
            description: String::new(),
            category_id: None,
            created: OffsetDateTime::now_utc(),
            rating: None,
        };
        let json = serde_json::to_value(TitleView::new(row, None, vec![])).unwrap();
        assert!(json["rating"].is_null());
        assert!(json["category"].is_null());
        assert_eq!(json["genre"], serde_json::json!([]));
    }

    #[test]
    fn name_limit_counts_characters() {
        let title = |name: String| CreateTitle {
            name,
            year: 1979,
            description: String::new(),
            genre: vec!["drama".to_string()],
            category: None,
        };
        assert!(title("Я".repeat(256)).validate().is_ok());
        assert!(title("Я".repeat(257)).validate().is_err());
    }

    #[test]
    fn null_category_is_distinct_from_absent() {
        let absent: UpdateTitle = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(absent.category, None);

        let cleared: UpdateTitle =
            serde_json::from_value(serde_json::json!({ "category": null })).unwrap();
        assert_eq!(cleared.category, Some(None));

        let set: UpdateTitle =
            serde_json::from_value(serde_json::json!({ "category": "movie" })).unwrap();
        assert_eq!(set.category, Some(Some("movie".to_string())));
    }
}
