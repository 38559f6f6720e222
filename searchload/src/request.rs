//! Random search requests.
//!
//! Every job issues one `GET {base}/api/search` with parameters drawn uniformly
//! and independently from small fixed domains, so that a run exercises a mix of
//! cached and uncached queries on the target.

use rand::Rng;
use reqwest::Url;

use crate::error::{Error, Result};

pub const KEYWORDS: [&str; 12] = [
    "docker",
    "php",
    "symfony",
    "redis",
    "mysql",
    "kubernetes",
    "api",
    "microservices",
    "testing",
    "architecture",
    "design patterns",
    "clean code",
];
pub const CONTENT_TYPES: [&str; 2] = ["video", "article"];
pub const SORT_FIELDS: [&str; 2] = ["score", "date"];
pub const PAGES: std::ops::RangeInclusive<u32> = 1..=5;
pub const PAGE_SIZES: [u32; 3] = [10, 20, 50];

const SEARCH_PATH: &str = "/api/search";

/// Parse `base_url` and append the search path.
///
/// Done once per run; the result is the template every request is built from.
pub fn endpoint(base_url: &str) -> Result<Url> {
    let raw = format!("{}{SEARCH_PATH}", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| Error::Config(format!("invalid base url `{base_url}`: {e}")))
}

/// Draw a request and render it against `endpoint`.
pub fn generate<R: Rng>(endpoint: &Url, rng: &mut R) -> Url {
    SearchRequest::random(rng).url(endpoint)
}

/// The query of a single search call. Used once, then dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub keyword: &'static str,
    pub content_type: &'static str,
    pub sort_by: &'static str,
    pub page: u32,
    pub per_page: u32,
}

impl SearchRequest {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            keyword: pick(rng, &KEYWORDS),
            content_type: pick(rng, &CONTENT_TYPES),
            sort_by: pick(rng, &SORT_FIELDS),
            page: rng.random_range(PAGES),
            per_page: pick(rng, &PAGE_SIZES),
        }
    }

    /// Render the request as a URL. Parameters are form-encoded, so
    /// `design patterns` goes out as `design+patterns`.
    pub fn url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("keyword", self.keyword)
            .append_pair("type", self.content_type)
            .append_pair("sortBy", self.sort_by)
            .append_pair("page", &self.page.to_string())
            .append_pair("perPage", &self.per_page.to_string());
        url
    }
}

fn pick<R: Rng, T: Copy>(rng: &mut R, domain: &[T]) -> T {
    domain[rng.random_range(0..domain.len())]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn draws_stay_inside_their_domains() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let req = SearchRequest::random(&mut rng);
            assert!(KEYWORDS.contains(&req.keyword));
            assert!(CONTENT_TYPES.contains(&req.content_type));
            assert!(SORT_FIELDS.contains(&req.sort_by));
            assert!(PAGES.contains(&req.page));
            assert!(PAGE_SIZES.contains(&req.per_page));
        }
    }

    #[test]
    fn every_value_is_eventually_drawn() {
        let mut rng = StdRng::seed_from_u64(42);
        let requests: Vec<_> = (0..5_000).map(|_| SearchRequest::random(&mut rng)).collect();

        let keywords: HashSet<_> = requests.iter().map(|r| r.keyword).collect();
        let pages: HashSet<_> = requests.iter().map(|r| r.page).collect();
        let sizes: HashSet<_> = requests.iter().map(|r| r.per_page).collect();
        assert_eq!(keywords.len(), KEYWORDS.len());
        assert_eq!(pages.len(), 5);
        assert_eq!(sizes.len(), PAGE_SIZES.len());
    }

    #[test]
    fn renders_the_search_query() {
        let endpoint = endpoint("http://localhost:8080/").unwrap();
        let req = SearchRequest {
            keyword: "design patterns",
            content_type: "video",
            sort_by: "date",
            page: 3,
            per_page: 20,
        };

        assert_eq!(
            req.url(&endpoint).as_str(),
            "http://localhost:8080/api/search?keyword=design+patterns&type=video&sortBy=date&page=3&perPage=20"
        );
        // the template is left untouched
        assert_eq!(endpoint.as_str(), "http://localhost:8080/api/search");
    }

    #[test]
    fn keeps_a_base_path_prefix() {
        let endpoint = endpoint("https://search.example.com/v2").unwrap();
        assert_eq!(endpoint.path(), "/v2/api/search");
    }

    #[test]
    fn rejects_an_unparseable_base() {
        assert!(matches!(endpoint("not a url"), Err(Error::Config(_))));
    }

    #[test]
    fn generate_is_deterministic_for_a_seed() {
        let endpoint = endpoint("http://127.0.0.1:9000").unwrap();
        let a = generate(&endpoint, &mut StdRng::seed_from_u64(1));
        let b = generate(&endpoint, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
        assert_eq!(a.path(), "/api/search");
    }
}
