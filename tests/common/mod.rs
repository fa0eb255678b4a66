// tests/common/mod.rs
// Shared fakes for the integration tests. Each fake counts its calls.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use kpop_lookup::aliases::AliasTable;
use kpop_lookup::catalog::{SourceCatalog, SourceDescriptor, SourceType};
use kpop_lookup::fetch::{FetchError, PageFetcher};
use kpop_lookup::formatter::QueryFormatter;
use kpop_lookup::profiles::csv::CsvProfileStore;
use kpop_lookup::profiles::{ProfileRecord, ProfileStore};
use kpop_lookup::search::{SearchError, SearchSupplement};
use kpop_lookup::{Category, FetchOrchestrator, Fragment, Origin};

#[derive(Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    /// Sleep before answering (combine with a short timeout to simulate a hang).
    Delayed(Duration, String),
}

/// URL → canned reply. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    replies: HashMap<String, Reply>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requested.lock().unwrap().iter().any(|u| u == url)
    }

    pub fn times_requested(&self, url: &str) -> usize {
        self.requested.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        match self.replies.get(url).cloned() {
            Some(Reply::Body(b)) => Ok(b),
            Some(Reply::Status(s)) => Err(FetchError::Status {
                status: s,
                url: url.to_string(),
            }),
            Some(Reply::Delayed(d, b)) => {
                tokio::time::sleep(d).await;
                Ok(b)
            }
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub struct FakeSearch {
    pub result: Vec<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn returning(texts: &[&str]) -> Self {
        Self {
            result: texts.iter().map(|s| s.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchSupplement for FakeSearch {
    async fn search(
        &self,
        _subject: &str,
        _hint: Option<&str>,
        _category: Category,
    ) -> Result<Vec<Fragment>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Exhausted(2));
        }
        Ok(self
            .result
            .iter()
            .map(|t| Fragment::new(t.clone(), Origin::Search))
            .collect())
    }

    fn name(&self) -> &'static str {
        "fake_search"
    }
}

/// CSV store wrapper counting dataset queries.
pub struct CountingProfiles {
    inner: CsvProfileStore,
    pub by_name: AtomicUsize,
    pub members: AtomicUsize,
}

impl CountingProfiles {
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        Self {
            inner: CsvProfileStore::from_records(records),
            by_name: AtomicUsize::new(0),
            members: AtomicUsize::new(0),
        }
    }

    pub fn from_csv(text: &str) -> Self {
        Self {
            inner: CsvProfileStore::from_csv_str(text).unwrap(),
            by_name: AtomicUsize::new(0),
            members: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProfileStore for CountingProfiles {
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Vec<ProfileRecord>> {
        self.by_name.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_name(name).await
    }

    async fn find_members(&self, group: &str) -> anyhow::Result<Vec<ProfileRecord>> {
        self.members.fetch_add(1, Ordering::SeqCst);
        self.inner.find_members(group).await
    }

    fn name(&self) -> &'static str {
        "counting_csv"
    }
}

pub const PROFILES_CSV: &str = "name,group,aliases,birth_date,instagram,twitter
Jisoo,BLACKPINK,Kim Ji-soo,1995-01-03,@sooyaaa__,
Jimin,BTS,Park Ji-min,1995-10-13,@j.m,
Jimin,AOA,Shin Ji-min,1991-01-08,@jiminbaby_18,
Hyunjin,LOONA,Kim Hyun-jin,2000-11-15,,
Hyunjin,Stray Kids,Hwang Hyun-jin,2000-03-20,,
Yuna,ITZY,Shin Yu-na,2003-12-09,,
Yuna,Apple Pie,,1999-01-01,,
Yuna,Bubble Tea,,1999-02-02,,
Lisa,BLACKPINK,Lalisa Manobal,1997-03-27,@lalalalisa_m,
Rosé,BLACKPINK,Roseanne Park,1997-02-11,@roses_are_rosie,
";

pub fn desc(name: &str, url: &str, t: SourceType, priority: f32, primary: bool) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url_template: url.to_string(),
        selector: "p".to_string(),
        source_type: t,
        priority,
        timeout_seconds: 1,
        is_primary: primary,
        category: None,
        alias_family: None,
        alias_required: false,
    }
}

pub const HI_A: &str = "https://hi.test/a/Jisoo";
pub const HI_B: &str = "https://hi.test/b/Jisoo";
pub const MID: &str = "https://mid.test/search?q=Jisoo%20BLACKPINK";
pub const LOW: &str = "https://low.test/search?q=Jisoo%20BLACKPINK";

/// Two high sources, one medium, one low. Subject `Jisoo` (resolved to BLACKPINK via the
/// dataset) formats to the URL constants above.
pub fn test_catalog() -> SourceCatalog {
    SourceCatalog::new(vec![
        desc("low", "https://low.test/search?q={slug}", SourceType::Forum, 0.4, false),
        desc("hi-a", "https://hi.test/a/{slug}", SourceType::Encyclopedia, 0.9, true),
        desc("mid", "https://mid.test/search?q={slug}", SourceType::News, 0.7, false),
        desc("hi-b", "https://hi.test/b/{slug}", SourceType::Encyclopedia, 0.85, true),
    ])
    .unwrap()
}

pub fn orchestrator_with(
    catalog: SourceCatalog,
    fetcher: Arc<dyn PageFetcher>,
    profiles: Arc<CountingProfiles>,
    search: Option<Arc<FakeSearch>>,
) -> FetchOrchestrator {
    let formatter = Arc::new(QueryFormatter::new(Arc::new(AliasTable::default_seed()), profiles.clone()));
    let o = FetchOrchestrator::new(Arc::new(catalog), formatter, fetcher, profiles);
    match search {
        Some(s) => o.with_search(s),
        None => o,
    }
}

/// HTML page of `n` distinct encyclopedia-style paragraphs rich in profile keywords.
pub fn rich_page(tag: &str, n: usize) -> String {
    let mut html = String::from("<html><body>");
    for i in 0..n {
        html.push_str(&format!(
            "<p>{tag} paragraph {i}: Jisoo is a member of the girl group BLACKPINK, managed by the agency \
             YG Entertainment. She made her debut in August 2016 and her profile lists acting roles as \
             well as vocals on every album the group has released so far.</p>"
        ));
    }
    html.push_str("</body></html>");
    html
}

/// One short paragraph that passes extraction but never satisfies the gate on its own.
pub fn thin_page(tag: &str) -> String {
    format!("<html><body><p>{tag}: Jisoo appeared at a fashion event in Paris this week with friends.</p></body></html>")
}

pub fn words(s: &str) -> std::collections::BTreeSet<String> {
    s.split_whitespace().map(|w| w.to_string()).collect()
}
