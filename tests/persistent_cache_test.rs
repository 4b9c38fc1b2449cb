use bundlegrep::cache::{Cache, MatchBlobSet, PersistentCache, SharedQueryCache};
use bundlegrep::config::{CacheConfig, Config};
use bundlegrep::search::{Classifier, MatchCursor, Pattern, Query, SearchEngine};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn query(pattern: &str) -> Query {
    Query::builder(Pattern::new(pattern).unwrap())
        .primary()
        .secondary()
        .build()
}

fn blobs(cursors: &mut [MatchCursor]) -> Vec<String> {
    cursors
        .iter_mut()
        .map(MatchCursor::drain_to_blob)
        .filter(|b| !b.is_empty())
        .collect()
}

#[test]
fn test_round_trip_remove_and_reset() {
    let temp_dir = tempdir().unwrap();
    let cache: PersistentCache<Query, MatchBlobSet> =
        PersistentCache::new(temp_dir.path().join("cache")).unwrap();
    let value = MatchBlobSet::new(vec![
        "TEST_1_TEXT\n".to_string(),
        "TEST_2_TEXT\nTESTTEXT\n".to_string(),
    ]);

    cache.set(query("TEST.*TEXT"), value.clone());
    cache.set(query("other"), MatchBlobSet::new(vec!["other\n".to_string()]));
    assert_eq!(cache.get(&query("TEST.*TEXT")), Some(value));

    cache.remove(&query("TEST.*TEXT")).unwrap();
    assert_eq!(cache.get(&query("TEST.*TEXT")), None);
    assert!(cache.get(&query("other")).is_some());

    cache.reset().unwrap();
    assert_eq!(cache.get(&query("other")), None);
}

#[test]
fn test_results_survive_a_restart() {
    let bundle = tempdir().unwrap();
    let logs = bundle.path().join("logs");
    fs::create_dir(&logs).unwrap();
    fs::write(logs.join("NODEMANAGER-1.log"), "x ERROR disk full\nINFO ok\n").unwrap();
    let cache_dir = bundle.path().join("cache");

    let mut config = Config::default();
    config.cache = CacheConfig {
        backend: "persistent".to_string(),
        capacity: 4,
        directory: cache_dir.clone(),
    };

    let first_run = {
        let engine =
            SearchEngine::from_bundle(bundle.path(), &config, config.cache.build().unwrap())
                .unwrap();
        blobs(&mut engine.create_matchers(&query("ERROR.*")).unwrap())
    };
    assert_eq!(first_run, vec!["ERROR disk full\n"]);
    assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 1);

    // The log changes, but the second process still answers from disk.
    fs::write(logs.join("NODEMANAGER-1.log"), "nothing now\n").unwrap();
    let engine =
        SearchEngine::from_bundle(bundle.path(), &config, config.cache.build().unwrap()).unwrap();
    let second_run = blobs(&mut engine.create_matchers(&query("ERROR.*")).unwrap());
    assert_eq!(first_run, second_run);
}

#[test]
fn test_cache_files_written_by_the_engine() {
    let logs = tempdir().unwrap();
    fs::write(logs.path().join("RESOURCEMANAGER.log"), "TESTTEXT\n").unwrap();
    let cache_dir = tempdir().unwrap();
    let cache: SharedQueryCache = Arc::new(
        PersistentCache::<Query, MatchBlobSet>::new(cache_dir.path()).unwrap(),
    );
    let classifier = Classifier::new("RESOURCEMANAGER", "NODEMANAGER").unwrap();
    let engine = SearchEngine::new(logs.path(), &classifier, Some(cache)).unwrap();

    engine.create_matchers(&query("TEST.*TEXT")).unwrap();

    let name = PersistentCache::<Query, MatchBlobSet>::file_name(&query("TEST.*TEXT")).unwrap();
    let stored = fs::read_to_string(cache_dir.path().join(name)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(json["version"], 1);
    assert_eq!(json["key"]["pattern"], "TEST.*TEXT");
    assert_eq!(json["value"]["blobs"][0], "TESTTEXT\n");
}

#[test]
fn test_unrecognised_backend_runs_uncached() {
    let logs = tempdir().unwrap();
    fs::write(logs.path().join("RESOURCEMANAGER.log"), "TESTTEXT\n").unwrap();
    let config = CacheConfig {
        backend: "Redis".to_string(),
        ..CacheConfig::default()
    };
    let cache = config.build().unwrap();
    assert!(cache.is_none());

    let classifier = Classifier::new("RESOURCEMANAGER", "NODEMANAGER").unwrap();
    let engine = SearchEngine::new(logs.path(), &classifier, cache).unwrap();
    let found = blobs(&mut engine.create_matchers(&query("TEST.*TEXT")).unwrap());
    assert_eq!(found, vec!["TESTTEXT\n"]);
}
