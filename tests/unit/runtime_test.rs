//! Tests for the submission API

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use relay_pool::config::PoolOptions;
use relay_pool::core::PermitPool;
use relay_pool::runtime::{health, list_pools, submit_batch};

fn pool(capacity: usize) -> PermitPool {
    PermitPool::create(
        &PoolOptions::new()
            .with_capacity(capacity)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

#[test]
fn test_submit_batch_preserves_order() {
    let pool = pool(2);
    let running = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let links = ["https://a.example", "https://b.example", "https://c.example"];
    let batch: Vec<_> = links
        .iter()
        .map(|link| {
            let running = &running;
            let peak = &peak;
            move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                running.fetch_sub(1, Ordering::SeqCst);
                format!("archived {link}")
            }
        })
        .collect();

    let results = submit_batch(&pool, batch);
    let archived: Vec<String> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(
        archived,
        vec![
            "archived https://a.example",
            "archived https://b.example",
            "archived https://c.example",
        ]
    );
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(pool.stats().available, 2);
}

#[test]
fn test_health_reports_closed_pool() {
    let pool = pool(2);
    let report = health(&pool);
    assert!(report.ok);
    assert_eq!(report.accounted, 2);

    pool.shutdown().unwrap();
    assert!(!health(&pool).ok);
}

#[test]
fn test_list_pools_sorted() {
    let mut pools = HashMap::new();
    pools.insert("wayback".to_string(), pool(3));
    pools.insert("archive_today".to_string(), pool(1));

    let snapshots = list_pools(&pools);
    let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["archive_today", "wayback"]);
    assert_eq!(snapshots[1].stats.capacity, 3);

    let json = serde_json::to_value(&snapshots[0]).unwrap();
    assert_eq!(json["stats"]["available"], 1);
}
