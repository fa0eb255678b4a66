// tests/config_load.rs
use std::{env, fs};

use kpop_lookup::bootstrap::LookupRuntime;
use kpop_lookup::config::LookupConfig;
use kpop_lookup::profiles::csv::CsvProfileStore;
use kpop_lookup::profiles::ProfileStore;

const SEARCH_ON: &str = r#"
[search]
enabled = true
credentials = "ENV"
"#;

fn clear_env() {
    for k in [
        "LOOKUP_CONFIG_PATH",
        "GOOGLE_SEARCH_CREDENTIALS",
        "LOOKUP_GATE_MIN_CHARS",
        "LOOKUP_GATE_MIN_HITS",
        "REDIS_URL",
        "LOOKUP_SUMMARIZER",
    ] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn config_path_comes_from_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("lookup.toml");
    fs::write(&p, "group_priority = [\"ITZY\"]\n[fetch]\nmax_concurrent = 2\n").unwrap();

    env::set_var("LOOKUP_CONFIG_PATH", p.display().to_string());
    let cfg = LookupConfig::load().unwrap();
    env::remove_var("LOOKUP_CONFIG_PATH");

    assert_eq!(cfg.fetch.max_concurrent, 2);
    assert_eq!(cfg.group_priority, vec!["ITZY".to_string()]);
}

#[serial_test::serial]
#[test]
fn missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    env::set_var("LOOKUP_CONFIG_PATH", dir.path().join("nope.toml").display().to_string());
    let cfg = LookupConfig::load().unwrap();
    env::remove_var("LOOKUP_CONFIG_PATH");

    assert!(!cfg.search.enabled);
    assert_eq!(cfg.gate.min_chars, 1500);
}

#[serial_test::serial]
#[test]
fn search_credentials_marker_reads_env() {
    clear_env();
    env::set_var("GOOGLE_SEARCH_CREDENTIALS", "k1:cx1,k2:cx2");
    let cfg = LookupConfig::from_toml_str(SEARCH_ON).unwrap();
    env::remove_var("GOOGLE_SEARCH_CREDENTIALS");

    let creds = cfg.search.parsed_credentials();
    assert_eq!(creds.len(), 2);
    assert_eq!(creds[1].key, "k2");
    assert_eq!(creds[1].cx, "cx2");
}

#[serial_test::serial]
#[test]
fn enabled_search_without_credentials_is_an_error() {
    clear_env();
    let err = LookupConfig::from_toml_str(SEARCH_ON).unwrap_err();
    assert!(err.to_string().contains("GOOGLE_SEARCH_CREDENTIALS"), "{err}");

    // Disabled search never looks at the variable.
    assert!(LookupConfig::from_toml_str("[search]\nenabled = false\ncredentials = \"ENV\"\n").is_ok());
}

#[serial_test::serial]
#[test]
fn gate_thresholds_can_be_overridden_from_env() {
    clear_env();
    env::set_var("LOOKUP_GATE_MIN_CHARS", "300");
    env::set_var("LOOKUP_GATE_MIN_HITS", "not-a-number");
    let cfg = LookupConfig::from_toml_str("[gate]\nmin_chars = 2000\nmin_keyword_hits = 4\n").unwrap();
    clear_env();

    assert_eq!(cfg.gate.min_chars, 300);
    assert_eq!(cfg.gate.min_keyword_hits, 4);
    // Relaxed floor is clamped under the overridden one.
    assert_eq!(cfg.gate.relaxed_min_chars, 300);
}

#[serial_test::serial]
#[test]
fn redis_marker_without_env_means_memory_store() {
    clear_env();
    let cfg = LookupConfig::from_toml_str("[cache]\nredis_url = \"ENV\"\n").unwrap();
    assert!(cfg.cache.redis_url.is_none());
}

#[serial_test::serial]
#[tokio::test]
async fn csv_dataset_from_temp_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("profiles.csv");
    fs::write(
        &csv,
        "name,group,aliases,birth_date,instagram,twitter\nWonyoung,IVE,Jang Won-young,2004-08-31,@for_everyoung10,\n",
    )
    .unwrap();
    let toml = format!("[profiles]\ncsv_path = {:?}\n", csv.display().to_string());
    let cfg = LookupConfig::from_toml_str(&toml).unwrap();

    let store = CsvProfileStore::from_path(cfg.profiles.csv_path.as_deref().unwrap()).unwrap();
    let rows = store.find_by_name("wonyoung").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group.as_deref(), Some("IVE"));

    let rt = LookupRuntime::from_config(cfg).await.unwrap();
    assert_eq!(rt.summarizer.provider_name(), "disabled");
}

#[serial_test::serial]
#[tokio::test]
async fn shipped_config_loads() {
    clear_env();
    let cfg = LookupConfig::load_from_file("config/lookup.toml").unwrap();
    assert!(cfg.group_priority.contains(&"BTS".to_string()));
    assert_eq!(cfg.profiles.csv_path.as_deref(), Some(std::path::Path::new("data/profiles.csv")));
    let rt = LookupRuntime::from_config(cfg).await.unwrap();
    assert!(rt.config.cache.redis_url.is_none());
}
