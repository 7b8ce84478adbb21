//! Page-number pagination shared by every list endpoint.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `?page=N` query parameter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
}

/// A validated page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(params: PageParams, size: u32) -> Result<Self, AppError> {
        let number = params.page.unwrap_or(1);
        if number == 0 {
            return Err(AppError::not_found("invalid page"));
        }
        Ok(Self { number, size })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }
}

/// One page of results with links to its neighbours.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Assemble a page. Pages past the end are 404, except the first page of
    /// an empty collection.
    pub fn new(
        results: Vec<T>,
        count: i64,
        request: PageRequest,
        uri: &Uri,
    ) -> Result<Self, AppError> {
        if request.number > 1 && request.offset() >= count {
            return Err(AppError::not_found("invalid page"));
        }

        let has_next = request.offset() + request.limit() < count;
        let next = has_next.then(|| page_link(uri, request.number + 1));
        let previous = (request.number > 1).then(|| page_link(uri, request.number - 1));

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Rewrite the request URI with a different `page` value, keeping other
/// query parameters in their original order.
fn page_link(uri: &Uri, page: u32) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();
    if page > 1 {
        pairs.push(format!("page={page}"));
    }

    if pairs.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: u32) -> PageRequest {
        PageRequest::new(PageParams { page: Some(page) }, 10).unwrap()
    }

    #[test]
    fn offset_follows_page_number() {
        assert_eq!(request(1).offset(), 0);
        assert_eq!(request(3).offset(), 20);
        assert!(PageRequest::new(PageParams { page: Some(0) }, 10).is_err());
    }

    #[test]
    fn middle_page_links_both_ways() {
        let uri: Uri = "/api/v1/titles/?genre=drama&page=2".parse().unwrap();
        let page = Page::new(vec![1, 2, 3], 25, request(2), &uri).unwrap();

        assert_eq!(page.next.as_deref(), Some("/api/v1/titles/?genre=drama&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/v1/titles/?genre=drama"));
    }

    #[test]
    fn last_page_has_no_next() {
        let uri: Uri = "/api/v1/genres/".parse().unwrap();
        let page = Page::new(vec![1], 1, request(1), &uri).unwrap();
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn empty_collection_first_page_is_ok() {
        let uri: Uri = "/api/v1/genres/".parse().unwrap();
        let page = Page::<i32>::new(vec![], 0, request(1), &uri).unwrap();
        assert_eq!(page.count, 0);
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        let uri: Uri = "/api/v1/genres/?page=4".parse().unwrap();
        assert!(Page::<i32>::new(vec![], 12, request(4), &uri).is_err());
    }
}
