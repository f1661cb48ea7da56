/// Page-number pagination for list endpoints
///
/// Lists are requested with `?page=N` (1-based) and answered with an
/// envelope:
///
/// ```json
/// {
///   "count": 23,
///   "next": "http://localhost:8080/api/tasks/?page=3",
///   "previous": "http://localhost:8080/api/tasks/",
///   "results": [...]
/// }
/// ```
///
/// `next` and `previous` are absolute and keep every other query parameter.
/// A page number that is not a positive integer, or lies past the last page,
/// is a 404 `Invalid page.`.

use axum::http::{header, HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use tasktrack_shared::filter::QueryParams;
use tasktrack_shared::store::{Page, PageRequest};
use url::Url;

use crate::error::{ApiError, ApiResult};

pub const PAGE_PARAM: &str = "page";

pub const INVALID_PAGE: &str = "Invalid page.";

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

fn invalid_page() -> ApiError {
    ApiError::NotFound(INVALID_PAGE.to_string())
}

/// Reads `?page=`; absent or empty means the first page
pub fn page_request(params: &QueryParams, page_size: u32) -> ApiResult<PageRequest> {
    let page = match params.get(PAGE_PARAM).map(|p| p.trim()) {
        None | Some("") => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(page) if page >= 1 => page,
            _ => return Err(invalid_page()),
        },
    };
    Ok(PageRequest::new(page, page_size))
}

/// Absolute URL of the current request, used to build page links
#[derive(Debug, Clone)]
pub struct PageLinks {
    base: Url,
}

impl PageLinks {
    /// Rebuilds the request URL from the `Host` header and the original URI
    ///
    /// `X-Forwarded-Proto` selects the scheme when a proxy sets it.
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> ApiResult<Self> {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .filter(|proto| matches!(*proto, "http" | "https"))
            .unwrap_or("http");
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        let base = Url::parse(&format!("{scheme}://{host}{path_and_query}"))
            .map_err(|e| ApiError::BadRequest(format!("Invalid request URL: {}", e)))?;
        Ok(Self { base })
    }

    /// Link to `page`; the first page is linked without a `page` parameter
    pub fn link(&self, page: u32) -> String {
        let mut url = self.base.clone();
        let kept: Vec<(String, String)> = self
            .base
            .query_pairs()
            .filter(|(key, _)| key != PAGE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.set_query(None);
        if !kept.is_empty() || page > 1 {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &kept {
                pairs.append_pair(key, value);
            }
            if page > 1 {
                pairs.append_pair(PAGE_PARAM, &page.to_string());
            }
        }
        url.to_string()
    }
}

/// Wraps one page of store results, checking the page exists
pub fn paginate<T, U, F>(
    page: Page<T>,
    request: PageRequest,
    links: &PageLinks,
    serialize: F,
) -> ApiResult<Paginated<U>>
where
    F: FnMut(&T) -> U,
{
    let page_count = page.page_count(request.page_size);
    if request.page > page_count {
        return Err(invalid_page());
    }

    let next = (request.page < page_count).then(|| links.link(request.page + 1));
    let previous = (request.page > 1).then(|| links.link(request.page - 1));

    Ok(Paginated {
        count: page.count,
        next,
        previous,
        results: page.map(serialize),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn links(uri: &str) -> PageLinks {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("testserver"));
        PageLinks::from_request(&headers, &uri.parse().unwrap()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_page_request_parsing() {
        assert_eq!(page_request(&params(&[]), 10).unwrap().page, 1);
        assert_eq!(page_request(&params(&[("page", "")]), 10).unwrap().page, 1);
        assert_eq!(page_request(&params(&[("page", "3")]), 10).unwrap().page, 3);
        assert!(page_request(&params(&[("page", "0")]), 10).is_err());
        assert!(page_request(&params(&[("page", "abc")]), 10).is_err());
        assert!(page_request(&params(&[("page", "-1")]), 10).is_err());
    }

    #[test]
    fn test_links_keep_other_parameters() {
        let links = links("/api/tasks/?completed=true&page=2");

        assert_eq!(
            links.link(3),
            "http://testserver/api/tasks/?completed=true&page=3"
        );
        assert_eq!(links.link(1), "http://testserver/api/tasks/?completed=true");
    }

    #[test]
    fn test_first_page_link_has_no_query() {
        assert_eq!(links("/api/users/?page=2").link(1), "http://testserver/api/users/");
    }

    #[test]
    fn test_paginate_sets_neighbours() {
        let page = Page {
            items: vec![1, 2],
            count: 25,
        };
        let request = PageRequest::new(2, 10);

        let result = paginate(page, request, &links("/api/tasks/?page=2"), |n| n * 10).unwrap();

        assert_eq!(result.count, 25);
        assert_eq!(result.results, vec![10, 20]);
        assert_eq!(result.next.as_deref(), Some("http://testserver/api/tasks/?page=3"));
        assert_eq!(result.previous.as_deref(), Some("http://testserver/api/tasks/"));
    }

    #[test]
    fn test_empty_first_page_is_allowed() {
        let page: Page<i32> = Page {
            items: vec![],
            count: 0,
        };
        let result = paginate(page, PageRequest::new(1, 10), &links("/api/tasks/"), |n| *n).unwrap();

        assert_eq!(result.count, 0);
        assert!(result.next.is_none());
        assert!(result.previous.is_none());
    }

    #[test]
    fn test_page_past_the_end_is_invalid() {
        let page: Page<i32> = Page {
            items: vec![],
            count: 10,
        };
        let err = paginate(page, PageRequest::new(2, 10), &links("/api/tasks/?page=2"), |n| *n)
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(msg) if msg == INVALID_PAGE));
    }
}
