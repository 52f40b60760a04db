use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::EstimateError;
use crate::metrics;
use crate::reference::ReferenceData;

/// Year offsets tried in order: exact, next year, previous year
const YEAR_TIERS: [(i32, &str); 3] = [(0, "exact"), (1, "next_year"), (-1, "previous_year")];

/// Reachability check for a single photo URL
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// `true` only when the URL answered with status 200
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Probes URLs with an HTTP GET bounded by a timeout
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, EstimateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                EstimateError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(url, error = %e, "Photo probe failed");
                false
            }
        }
    }
}

/// Photos selected for an estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPhotos {
    pub urls: Vec<String>,
    /// Year whose photos were returned; `None` when the placeholder was used
    pub year: Option<i32>,
}

/// Finds working listing photos, falling back to adjacent years and then a placeholder
pub struct ImageResolver {
    probe: Arc<dyn UrlProbe>,
    max_photos: usize,
    placeholder_url: String,
}

impl ImageResolver {
    pub fn new(probe: Arc<dyn UrlProbe>, max_photos: usize, placeholder_url: impl Into<String>) -> Self {
        Self {
            probe,
            max_photos,
            placeholder_url: placeholder_url.into(),
        }
    }

    /// Walk the year tiers until one yields at least one reachable URL
    ///
    /// Probes within a tier run concurrently; a tier starts only after the
    /// previous one has been fully evaluated.
    pub async fn resolve(
        &self,
        reference: &dyn ReferenceData,
        canonical_model: &str,
        year: i32,
    ) -> Result<ResolvedPhotos, EstimateError> {
        for (offset, tier) in YEAR_TIERS {
            let tier_year = year + offset;
            let urls = self.valid_urls(reference, canonical_model, tier_year).await?;

            if !urls.is_empty() {
                debug!(model = canonical_model, year = tier_year, tier, count = urls.len(), "Resolved photos");
                metrics::record_photo_tier(tier);
                return Ok(ResolvedPhotos {
                    urls,
                    year: Some(tier_year),
                });
            }
        }

        debug!(model = canonical_model, year, "No reachable photos, using placeholder");
        metrics::record_photo_tier("placeholder");
        Ok(ResolvedPhotos {
            urls: vec![self.placeholder_url.clone()],
            year: None,
        })
    }

    async fn valid_urls(
        &self,
        reference: &dyn ReferenceData,
        model: &str,
        year: i32,
    ) -> Result<Vec<String>, EstimateError> {
        let mut candidates = reference.lookup_photos(model, year).await?;
        candidates.truncate(self.max_photos);

        let checks = join_all(candidates.iter().map(|url| self.probe.is_reachable(url))).await;

        Ok(candidates
            .into_iter()
            .zip(checks)
            .filter_map(|(url, ok)| {
                metrics::record_photo_probe(ok);
                ok.then_some(url)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{PhotoRow, ReferenceTables};
    use std::collections::HashSet;
    use std::sync::Mutex;

    const PLACEHOLDER: &str = "https://example.com/noImage_large.png";

    /// Marks a fixed set of URLs reachable and records every probe
    struct StaticProbe {
        reachable: HashSet<String>,
        probed: Mutex<Vec<String>>,
    }

    impl StaticProbe {
        fn new(reachable: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                reachable: reachable.iter().map(|s| s.to_string()).collect(),
                probed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl UrlProbe for StaticProbe {
        async fn is_reachable(&self, url: &str) -> bool {
            self.probed.lock().unwrap().push(url.to_string());
            self.reachable.contains(url)
        }
    }

    fn tables(rows: &[(i32, &str)]) -> ReferenceTables {
        ReferenceTables::from_rows(
            vec![],
            rows.iter()
                .map(|(year, url)| PhotoRow {
                    model: "f-150".to_string(),
                    year: *year,
                    image_url: url.to_string(),
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_exact_year_filters_unreachable() {
        let data = tables(&[(2005, "https://img/a"), (2005, "https://img/b"), (2006, "https://img/c")]);
        let probe = StaticProbe::new(&["https://img/b", "https://img/c"]);
        let resolver = ImageResolver::new(probe.clone(), 4, PLACEHOLDER);

        let photos = resolver.resolve(&data, "f-150", 2005).await.unwrap();
        assert_eq!(photos.urls, vec!["https://img/b"]);
        assert_eq!(photos.year, Some(2005));
        // The next tier is never touched once a tier succeeds
        assert!(!probe.probed.lock().unwrap().contains(&"https://img/c".to_string()));
    }

    #[tokio::test]
    async fn test_falls_back_to_next_year() {
        let data = tables(&[(2006, "https://img/next"), (2004, "https://img/prev")]);
        let probe = StaticProbe::new(&["https://img/next", "https://img/prev"]);
        let resolver = ImageResolver::new(probe, 4, PLACEHOLDER);

        let photos = resolver.resolve(&data, "f-150", 2005).await.unwrap();
        assert_eq!(photos.urls, vec!["https://img/next"]);
        assert_eq!(photos.year, Some(2006));
    }

    #[tokio::test]
    async fn test_falls_back_to_previous_year() {
        let data = tables(&[(2005, "https://img/dead"), (2004, "https://img/prev")]);
        let probe = StaticProbe::new(&["https://img/prev"]);
        let resolver = ImageResolver::new(probe.clone(), 4, PLACEHOLDER);

        let photos = resolver.resolve(&data, "f-150", 2005).await.unwrap();
        assert_eq!(photos.urls, vec!["https://img/prev"]);
        assert_eq!(photos.year, Some(2004));
        assert_eq!(
            *probe.probed.lock().unwrap(),
            vec!["https://img/dead".to_string(), "https://img/prev".to_string()]
        );
    }

    #[tokio::test]
    async fn test_placeholder_when_every_tier_is_empty() {
        let data = tables(&[(2003, "https://img/old"), (2007, "https://img/new")]);
        let probe = StaticProbe::new(&["https://img/old", "https://img/new"]);
        let resolver = ImageResolver::new(probe, 4, PLACEHOLDER);

        let photos = resolver.resolve(&data, "f-150", 2005).await.unwrap();
        assert_eq!(photos.urls, vec![PLACEHOLDER]);
        assert_eq!(photos.year, None);
    }

    #[tokio::test]
    async fn test_candidates_capped_before_probing() {
        let rows: Vec<(i32, String)> = (0..8).map(|i| (2005, format!("https://img/{}", i))).collect();
        let data = ReferenceTables::from_rows(
            vec![],
            rows.iter()
                .map(|(year, url)| PhotoRow {
                    model: "f-150".to_string(),
                    year: *year,
                    image_url: url.clone(),
                })
                .collect(),
        );
        let all: Vec<&str> = rows.iter().map(|(_, u)| u.as_str()).collect();
        let probe = StaticProbe::new(&all);
        let resolver = ImageResolver::new(probe.clone(), 4, PLACEHOLDER);

        let photos = resolver.resolve(&data, "f-150", 2005).await.unwrap();
        assert_eq!(photos.urls.len(), 4);
        assert_eq!(photos.urls[0], "https://img/0");
        assert_eq!(probe.probed.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_http_probe_accepts_only_200() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ok.jpg");
                then.status(200).body("jpeg");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone.jpg");
                then.status(404);
            })
            .await;

        let probe = HttpProbe::new(Duration::from_secs(2)).unwrap();
        assert!(probe.is_reachable(&server.url("/ok.jpg")).await);
        assert!(!probe.is_reachable(&server.url("/gone.jpg")).await);
        // Connection refused is a failed probe, not an error
        assert!(!probe.is_reachable("http://127.0.0.1:1/none.jpg").await);
    }
}
