//! Ward driver: ties scraper → snapshot store / export together.
//!
//! ## Run modes
//!
//! `run_wards()` — fixed-list mode:
//!   Each configured ward is one task (paginate, fetch details, hand off to the
//!   per-ward callback). Tasks run on a semaphore-bounded pool and the call
//!   returns only once every task has finished. No ordering between wards.
//!
//! `discover()` — auto-discovery mode:
//!   Ward 1, 2, … in sequence until a ward has no listings. Summaries only;
//!   the whole set goes to the callback at the end.

use crate::config::AppConfig;
use crate::models::PropertyDetail;
use crate::scraper::{LraScraper, ListingSource, enrich, paginate};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Pipeline {
    source: Arc<dyn ListingSource>,
    concurrency: usize,
    fetch_details: bool,
    max_pages: Option<u32>,
}

impl Pipeline {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let scraper = LraScraper::new(&config.scraper).context("Failed to build scraper")?;
        Ok(Self::with_source(Arc::new(scraper), config))
    }

    pub fn with_source(source: Arc<dyn ListingSource>, config: &AppConfig) -> Self {
        Self {
            source,
            concurrency: config.pipeline.concurrency.max(1),
            fetch_details: config.pipeline.fetch_details,
            max_pages: config.scraper.max_pages,
        }
    }

    /// Crawl the given wards concurrently. `on_ward` runs inside each ward's
    /// task with that ward's complete result.
    pub async fn run_wards<F>(&self, wards: &[u32], on_ward: F) -> Result<PipelineStats>
    where
        F: Fn(u32, Vec<PropertyDetail>) -> Result<()> + Send + Sync + 'static,
    {
        info!("=== Crawling {} wards ({} at a time) ===", wards.len(), self.concurrency);

        let sem = Arc::new(Semaphore::new(self.concurrency));
        let on_ward = Arc::new(on_ward);
        let mut handles = Vec::new();

        for &ward in wards {
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&sem);
            let on_ward = Arc::clone(&on_ward);
            let fetch_details = self.fetch_details;
            let max_pages = self.max_pages;

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await?;

                let properties = scrape_ward(source.as_ref(), ward, fetch_details, max_pages)
                    .await
                    .with_context(|| format!("scrape ward {}", ward))?;

                let n = properties.len();
                info!("{} properties found for ward {}", n, ward);

                on_ward(ward, properties).with_context(|| format!("persist ward {}", ward))?;
                Ok::<usize, anyhow::Error>(n)
            });

            handles.push((ward, handle));
        }

        let mut stats = PipelineStats::default();
        for (ward, handle) in handles {
            match handle.await {
                Ok(Ok(n)) => {
                    stats.wards_processed += 1;
                    stats.properties_found += n;
                }
                Ok(Err(e)) => {
                    warn!("Ward {}: {:#}", ward, e);
                    stats.errors += 1;
                }
                Err(e) => {
                    error!("Task panic for ward {}: {}", ward, e);
                    stats.errors += 1;
                }
            }
        }

        info!(
            "=== Done: {} wards | {} properties | {} errors ===",
            stats.wards_processed, stats.properties_found, stats.errors
        );
        Ok(stats)
    }

    /// Walk wards upward from 1 until one comes back empty, then hand the
    /// accumulated set to `on_done`.
    pub async fn discover<F>(&self, on_done: F) -> Result<PipelineStats>
    where
        F: FnOnce(Vec<PropertyDetail>) -> Result<()>,
    {
        let mut all = Vec::new();
        let mut stats = PipelineStats::default();
        let mut ward = 1u32;

        loop {
            let summaries = paginate(self.source.as_ref(), ward, self.max_pages).await?;
            if summaries.is_empty() {
                info!("Ward {} has no listings, stopping discovery", ward);
                break;
            }

            info!("{} properties found for ward {}", summaries.len(), ward);
            stats.wards_processed += 1;
            stats.properties_found += summaries.len();
            all.extend(summaries.into_iter().map(PropertyDetail::from));
            ward += 1;
        }

        on_done(all)?;
        Ok(stats)
    }
}

async fn scrape_ward(
    source: &dyn ListingSource,
    ward: u32,
    fetch_details: bool,
    max_pages: Option<u32>,
) -> Result<Vec<PropertyDetail>> {
    let summaries = paginate(source, ward, max_pages).await?;
    if fetch_details {
        enrich(source, summaries).await
    } else {
        Ok(summaries.into_iter().map(PropertyDetail::from).collect())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub wards_processed: usize,
    pub properties_found: usize,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetailInfo, PropertySummary};
    use crate::scraper::tests::{FakeSource, summary};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// One listing per ward, served slowly, tracking how many wards are
    /// fetching at once.
    #[derive(Default)]
    struct SlowSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for SlowSource {
        async fn fetch_summary_page(&self, ward: u32, start_row: u32) -> Result<Vec<PropertySummary>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(if start_row == 1 { vec![summary(ward, 0)] } else { vec![] })
        }

        async fn fetch_detail(&self, _parcel_id: &str) -> Result<DetailInfo> {
            Ok(DetailInfo::default())
        }
    }

    fn pipeline(source: Arc<FakeSource>, concurrency: usize) -> Pipeline {
        let mut config = AppConfig::default();
        config.pipeline.concurrency = concurrency;
        Pipeline::with_source(source, &config)
    }

    #[tokio::test]
    async fn every_ward_reaches_the_callback_before_return() {
        let source = Arc::new(
            FakeSource { permits: 1, ..Default::default() }
                .with_ward(1, &[27, 3])
                .with_ward(2, &[5])
                .with_ward(3, &[]),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let stats = pipeline(Arc::clone(&source), 2)
            .run_wards(&[1, 2, 3], move |ward, props| {
                sink.lock().unwrap().push((ward, props.len(), props.iter().all(|p| p.permits.len() == 1)));
                Ok(())
            })
            .await
            .unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![(1, 30, true), (2, 5, true), (3, 0, true)]);
        assert_eq!(stats, PipelineStats { wards_processed: 3, properties_found: 35, errors: 0 });
        assert_eq!(source.details.lock().unwrap().len(), 35);
    }

    #[tokio::test]
    async fn pool_limits_wards_in_flight() {
        let source = Arc::new(SlowSource::default());
        let mut config = AppConfig::default();
        config.pipeline.concurrency = 2;

        let stats = Pipeline::with_source(Arc::clone(&source) as Arc<dyn ListingSource>, &config)
            .run_wards(&[1, 2, 3, 4, 5], |_, _| Ok(()))
            .await
            .unwrap();

        assert_eq!(stats.wards_processed, 5);
        assert_eq!(stats.properties_found, 5);
        assert_eq!(source.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_callback_counts_as_error_without_stopping_others() {
        let source = Arc::new(FakeSource::default().with_ward(1, &[2]).with_ward(2, &[4]));
        let stats = pipeline(source, 25)
            .run_wards(&[1, 2], |ward, _| {
                if ward == 1 { anyhow::bail!("disk full") } else { Ok(()) }
            })
            .await
            .unwrap();
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.wards_processed, 1);
        assert_eq!(stats.properties_found, 4);
    }

    #[tokio::test]
    async fn discovery_stops_at_first_empty_ward() {
        let source = Arc::new(
            FakeSource::default()
                .with_ward(1, &[27, 1])
                .with_ward(2, &[6])
                .with_ward(4, &[9]),
        );
        let mut collected = Vec::new();
        let stats = pipeline(Arc::clone(&source), 1)
            .discover(|props| {
                collected = props;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(stats.wards_processed, 2);
        assert_eq!(collected.len(), 34);
        assert!(collected.iter().all(|p| p.permits.is_empty() && p.zoning.is_none()));
        // ward 3 requested once, ward 4 never
        assert_eq!(source.requested_rows(3), vec![1]);
        assert!(source.requested_rows(4).is_empty());
        assert!(source.details.lock().unwrap().is_empty());
    }
}
