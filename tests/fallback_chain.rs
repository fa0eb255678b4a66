// tests/fallback_chain.rs
// Empty web → search supplement → local dataset, in that order.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use kpop_lookup::cache::Provenance;
use kpop_lookup::orchestrator::Stage;
use kpop_lookup::Category;

#[tokio::test]
async fn empty_web_falls_back_to_search_then_database() {
    let fetcher = Arc::new(FakeFetcher::new());
    let search = Arc::new(FakeSearch::returning(&[
        "Jisoo Profile. Jisoo is the main vocalist of BLACKPINK.",
    ]));
    let profiles = Arc::new(CountingProfiles::from_csv(PROFILES_CSV));
    let o = orchestrator_with(test_catalog(), fetcher.clone(), profiles.clone(), Some(search.clone()));

    let res = o.aggregate("Jisoo", None, Category::Individual).await;

    assert_eq!(fetcher.calls(), 4);
    assert_eq!(search.calls(), 1);
    // Disambiguation + database supplement.
    assert_eq!(profiles.by_name.load(Ordering::SeqCst), 2);
    assert_eq!(
        res.stages,
        vec![
            Stage::Pending,
            Stage::TierHigh,
            Stage::TierMedium,
            Stage::TierLow,
            Stage::SupplementSearch,
            Stage::SupplementDatabase,
            Stage::Done,
        ]
    );

    // Dataset fields appear verbatim.
    for field in ["Jisoo", "BLACKPINK", "Kim Ji-soo", "1995-01-03", "@sooyaaa__"] {
        assert!(res.normalized_text.contains(field), "missing {field}: {}", res.normalized_text);
    }
    // Search text comes before the database record.
    let s = res.normalized_text.find("main vocalist").unwrap();
    let d = res.normalized_text.find("Name: Jisoo.").unwrap();
    assert!(s < d);
    assert_eq!(res.provenance(), Provenance::General);
}

#[tokio::test]
async fn search_failure_still_reaches_database() {
    let fetcher = Arc::new(FakeFetcher::new());
    let search = Arc::new(FakeSearch::failing());
    let profiles = Arc::new(CountingProfiles::from_csv(PROFILES_CSV));
    let o = orchestrator_with(test_catalog(), fetcher, profiles, Some(search.clone()));

    let res = o.aggregate("Jisoo", None, Category::Individual).await;

    assert_eq!(search.calls(), 1);
    assert_eq!(
        res.normalized_text,
        "Name: Jisoo. Group: BLACKPINK. Also known as: Kim Ji-soo. Birth date: 1995-01-03. Instagram: @sooyaaa__"
    );
    assert_eq!(res.provenance(), Provenance::Database);
}

#[tokio::test]
async fn nothing_anywhere_is_empty_not_an_error() {
    let fetcher = Arc::new(FakeFetcher::new());
    let search = Arc::new(FakeSearch::returning(&[]));
    let profiles = Arc::new(CountingProfiles::from_csv(PROFILES_CSV));
    let o = orchestrator_with(test_catalog(), fetcher, profiles, Some(search));

    let res = o.aggregate("Completely Unknown Rookie", None, Category::Individual).await;
    assert!(res.is_empty());
    assert!(res.raw_fragments.is_empty());
    assert_eq!(res.stages.last(), Some(&Stage::Done));
}

#[tokio::test]
async fn group_subject_gets_member_roster() {
    let fetcher = Arc::new(FakeFetcher::new());
    let profiles = Arc::new(CountingProfiles::from_csv(PROFILES_CSV));
    let o = orchestrator_with(test_catalog(), fetcher, profiles.clone(), None);

    let res = o.aggregate("blackpink", None, Category::Group).await;

    assert_eq!(res.normalized_text, "Group: BLACKPINK. Members: Jisoo, Lisa, Rosé.");
    assert_eq!(profiles.members.load(Ordering::SeqCst), 1);
    // Group subjects skip disambiguation.
    assert_eq!(profiles.by_name.load(Ordering::SeqCst), 0);
    assert_eq!(res.resolved_group, None);
}

#[tokio::test]
async fn database_record_follows_resolved_group() {
    let fetcher = Arc::new(FakeFetcher::new());
    let profiles = Arc::new(CountingProfiles::from_csv(PROFILES_CSV));
    let o = orchestrator_with(test_catalog(), fetcher, profiles, None);

    let aoa = o.aggregate("Jimin", Some("aoa"), Category::Individual).await;
    assert!(aoa.normalized_text.contains("Group: AOA."));
    assert!(aoa.normalized_text.contains("Shin Ji-min"));

    let default = o.aggregate("Jimin", None, Category::Individual).await;
    assert!(default.normalized_text.contains("Group: BTS."));
    assert_eq!(default.resolved_group.as_deref(), Some("BTS"));
}
