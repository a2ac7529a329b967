use crate::error::{Error, Result};
use crate::models::{CatalogMatch, TrackInfo};
use crate::sources::CatalogSearch;

/// 검색어를 만든다. 대표 아티스트와 제목을 공백으로 잇는다.
pub fn build_search_query(info: &TrackInfo) -> String {
    let mut parts = Vec::new();
    if let Some(artist) = info.primary_artist() {
        parts.push(artist.trim());
    }
    parts.push(info.title.trim());
    parts.retain(|p| !p.is_empty());
    parts.join(" ")
}

/// 트랙 하나에 대해 검색을 한 번 수행하고 첫 번째 후보를 그대로 고른다.
pub fn find_match(search: &dyn CatalogSearch, info: &TrackInfo) -> Result<CatalogMatch> {
    let query = build_search_query(info);
    tracing::debug!(%query, "검색");

    let candidates = search.search(&query).map_err(|e| Error::SearchFailed {
        query: query.clone(),
        source: e.into(),
    })?;

    candidates
        .into_iter()
        .next()
        .ok_or(Error::NoMatchFound { query })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct FixedSearch {
        results: Vec<CatalogMatch>,
        queries: RefCell<Vec<String>>,
    }

    impl CatalogSearch for FixedSearch {
        fn search(&self, query: &str) -> anyhow::Result<Vec<CatalogMatch>> {
            self.queries.borrow_mut().push(query.to_string());
            Ok(self.results.clone())
        }
    }

    struct FailingSearch;

    impl CatalogSearch for FailingSearch {
        fn search(&self, _query: &str) -> anyhow::Result<Vec<CatalogMatch>> {
            anyhow::bail!("connection reset")
        }
    }

    fn candidate(id: &str) -> CatalogMatch {
        CatalogMatch {
            video_id: id.to_string(),
            title: format!("title {}", id),
            artists: vec![],
            duration_secs: None,
        }
    }

    #[test]
    fn test_search_query() {
        let info = TrackInfo::new("Blueming", vec!["IU".to_string(), "Other".to_string()]);
        assert_eq!(build_search_query(&info), "IU Blueming");
    }

    #[test]
    fn test_search_query_without_artist() {
        let info = TrackInfo::new(" Blueming ", vec![]);
        assert_eq!(build_search_query(&info), "Blueming");
    }

    #[test]
    fn test_first_candidate_with_single_query() {
        let search = FixedSearch {
            results: vec![candidate("a"), candidate("b"), candidate("c")],
            queries: RefCell::new(Vec::new()),
        };
        let info = TrackInfo::new("Bohemian Rhapsody", vec!["Queen".to_string()]);

        let first = find_match(&search, &info).unwrap();
        let second = find_match(&search, &info).unwrap();

        assert_eq!(first.video_id, "a");
        assert_eq!(first, second);
        assert_eq!(
            *search.queries.borrow(),
            ["Queen Bohemian Rhapsody", "Queen Bohemian Rhapsody"]
        );
    }

    #[test]
    fn test_no_candidates() {
        let search = FixedSearch {
            results: vec![],
            queries: RefCell::new(Vec::new()),
        };
        let info = TrackInfo::new("Nothing", vec!["Nobody".to_string()]);

        match find_match(&search, &info) {
            Err(Error::NoMatchFound { query }) => assert_eq!(query, "Nobody Nothing"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(search.queries.borrow().len(), 1);
    }

    #[test]
    fn test_search_failure() {
        let info = TrackInfo::new("Song", vec![]);
        let err = find_match(&FailingSearch, &info).unwrap_err();
        assert!(matches!(err, Error::SearchFailed { .. }));
        assert!(!err.is_fatal());
    }
}
