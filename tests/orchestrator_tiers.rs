// tests/orchestrator_tiers.rs
// Tier escalation, short-circuit, failure swallowing and idempotence.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use kpop_lookup::catalog::{SourceCatalog, SourceType};
use kpop_lookup::fetch::{FetchError, PageFetcher};
use kpop_lookup::orchestrator::Stage;
use kpop_lookup::Category;

fn profiles() -> Arc<CountingProfiles> {
    Arc::new(CountingProfiles::from_csv(PROFILES_CSV))
}

#[tokio::test]
async fn rich_first_tier_short_circuits_everything_else() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with(HI_A, Reply::Body(rich_page("A", 6)))
            .with(HI_B, Reply::Body(rich_page("B", 6)))
            .with(MID, Reply::Body(thin_page("mid")))
            .with(LOW, Reply::Body(thin_page("low"))),
    );
    let search = Arc::new(FakeSearch::returning(&["search snippet about Jisoo"]));
    let profiles = profiles();
    let o = orchestrator_with(test_catalog(), fetcher.clone(), profiles.clone(), Some(search.clone()));

    let res = o.aggregate("Jisoo", None, Category::Individual).await;

    assert!(res.normalized_text.chars().count() >= 2500, "got {} chars", res.normalized_text.len());
    assert_eq!(fetcher.calls(), 2);
    assert!(!fetcher.was_requested(MID));
    assert!(!fetcher.was_requested(LOW));
    assert_eq!(search.calls(), 0);
    assert!(!res.visited(Stage::SupplementDatabase));
    assert_eq!(res.stages, vec![Stage::Pending, Stage::TierHigh, Stage::Done]);
    // Only the disambiguation lookup touched the dataset.
    assert_eq!(profiles.by_name.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn escalates_one_tier_at_a_time() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with(HI_A, Reply::Body(thin_page("hi")))
            .with(MID, Reply::Body(rich_page("M", 8)))
            .with(LOW, Reply::Body(thin_page("low"))),
    );
    let o = orchestrator_with(test_catalog(), fetcher.clone(), profiles(), None);

    let res = o.aggregate("Jisoo", None, Category::Individual).await;

    assert!(fetcher.was_requested(HI_A));
    assert!(fetcher.was_requested(HI_B));
    assert!(fetcher.was_requested(MID));
    assert!(!fetcher.was_requested(LOW), "low tier must not run once medium was sufficient");
    assert_eq!(
        res.stages,
        vec![Stage::Pending, Stage::TierHigh, Stage::TierMedium, Stage::Done]
    );
    // Text from the failed high source is absent, thin high text is kept.
    assert!(res.normalized_text.starts_with("hi: Jisoo appeared"));
}

#[tokio::test]
async fn call_counts_never_decrease_with_thinner_sources() {
    // Same catalog; the poorer the early tiers, the more fetches happen.
    let rich = Arc::new(
        FakeFetcher::new()
            .with(HI_A, Reply::Body(rich_page("A", 8)))
            .with(HI_B, Reply::Body(rich_page("B", 8))),
    );
    let thin = Arc::new(
        FakeFetcher::new()
            .with(HI_A, Reply::Body(thin_page("A")))
            .with(HI_B, Reply::Body(thin_page("B")))
            .with(MID, Reply::Body(rich_page("M", 8))),
    );
    let empty = Arc::new(FakeFetcher::new());

    for f in [&rich, &thin, &empty] {
        orchestrator_with(test_catalog(), f.clone(), profiles(), None)
            .aggregate("Jisoo", None, Category::Individual)
            .await;
    }
    assert!(rich.calls() <= thin.calls());
    assert!(thin.calls() <= empty.calls());
    assert_eq!(empty.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn failing_and_hanging_sources_are_swallowed() {
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with(HI_A, Reply::Status(500))
            .with(HI_B, Reply::Delayed(Duration::from_secs(30), rich_page("late", 8)))
            .with(MID, Reply::Body(thin_page("mid"))),
    );
    let o = orchestrator_with(test_catalog(), fetcher.clone(), profiles(), None);

    let res = o.aggregate("Jisoo", None, Category::Individual).await;

    // Hanging source timed out (1s), so its rich text never arrived.
    assert!(!res.normalized_text.contains("late paragraph"));
    assert!(res.normalized_text.contains("mid: Jisoo appeared"));
    // Web was insufficient → database record appended.
    assert!(res.visited(Stage::SupplementDatabase));
    assert!(res.normalized_text.contains("Birth date: 1995-01-03."));
}

#[tokio::test]
async fn identical_input_gives_identical_text() {
    // Completion order differs from catalog order; output must not.
    let fetcher = Arc::new(
        FakeFetcher::new()
            .with(HI_A, Reply::Delayed(Duration::from_millis(40), thin_page("first")))
            .with(HI_B, Reply::Body(thin_page("second")))
            .with(MID, Reply::Delayed(Duration::from_millis(5), thin_page("third"))),
    );
    let o = orchestrator_with(test_catalog(), fetcher, profiles(), None);

    let a = o.aggregate("Jisoo", None, Category::Individual).await;
    let b = o.aggregate("Jisoo", None, Category::Individual).await;

    assert_eq!(a.normalized_text, b.normalized_text);
    let first = a.normalized_text.find("first:").unwrap();
    let second = a.normalized_text.find("second:").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn blank_subject_returns_empty_without_fetching() {
    let fetcher = Arc::new(FakeFetcher::new());
    let o = orchestrator_with(test_catalog(), fetcher.clone(), profiles(), None);

    let res = o.aggregate("   ", None, Category::Individual).await;
    assert!(res.is_empty());
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(res.stages, vec![Stage::Pending, Stage::Done]);
}

#[tokio::test]
async fn shared_urls_are_fetched_once_per_tier() {
    // wikipedia-infobox and wikipedia-summary share one page.
    let wiki = "https://en.wikipedia.org/wiki/Jisoo";
    let fetcher = Arc::new(FakeFetcher::new().with(
        wiki,
        Reply::Body(std::fs::read_to_string("tests/fixtures/wikipedia_jisoo.html").unwrap()),
    ));
    let o = orchestrator_with(SourceCatalog::default_seed(), fetcher.clone(), profiles(), None);

    let res = o.aggregate("Jisoo", Some("BLACKPINK"), Category::Individual).await;
    assert_eq!(fetcher.times_requested(wiki), 1);
    assert!(res.normalized_text.contains("Birth date:"));
    assert!(res.normalized_text.contains("South Korean singer"));
}

/// Records the highest number of fetches running at once.
#[derive(Default)]
struct InFlight {
    now: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PageFetcher for InFlight {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<String, FetchError> {
        let n = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(n, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.now.fetch_sub(1, Ordering::SeqCst);
        Ok(thin_page("busy"))
    }

    fn name(&self) -> &'static str {
        "in_flight"
    }
}

fn wide_high_tier(n: usize) -> SourceCatalog {
    SourceCatalog::new(
        (0..n)
            .map(|i| {
                desc(
                    &format!("hi-{i}"),
                    &format!("https://hi.test/s{i}/{{slug}}"),
                    SourceType::Encyclopedia,
                    0.9,
                    false,
                )
            })
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
async fn fetches_never_exceed_the_concurrency_ceiling() {
    let fetcher = Arc::new(InFlight::default());
    let o = orchestrator_with(wide_high_tier(12), fetcher.clone(), profiles(), None);
    o.aggregate("Jisoo", None, Category::Individual).await;
    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 5);

    for limit in [3, 8] {
        let fetcher = Arc::new(InFlight::default());
        let o = orchestrator_with(wide_high_tier(12), fetcher.clone(), profiles(), None)
            .with_concurrency(limit);
        o.aggregate("Jisoo", None, Category::Individual).await;
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), limit, "limit {limit}");
    }
}
