//! Integration tests for the limiter under concurrent load

use groundtruth_domain::RateBudget;
use groundtruth_limiter::{LimiterConfig, LimiterRegistry};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_concurrent_callers_never_exceed_budget() {
    let registry = LimiterRegistry::new(LimiterConfig { max_wait_ms: 5 });
    let limiter = registry.register("edgar", RateBudget::per_minute(5)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let limiter = Arc::clone(&limiter);
        handles.push(tokio::spawn(async move { limiter.acquire().await.is_ok() }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 5);
    let stats = limiter.stats();
    assert_eq!(stats.granted, 5);
    assert_eq!(stats.throttled, 15);
}

#[tokio::test]
async fn test_one_past_capacity_is_throttled_exactly_once() {
    let registry = LimiterRegistry::new(LimiterConfig { max_wait_ms: 10 });
    let limiter = registry.register("quotes", RateBudget::per_minute(4)).unwrap();

    let mut throttled = 0;
    for _ in 0..5 {
        if limiter.acquire().await.is_err() {
            throttled += 1;
        }
    }
    assert_eq!(throttled, 1);
}

#[tokio::test]
async fn test_origins_are_independent() {
    let registry = LimiterRegistry::new(LimiterConfig::aggressive());
    let edgar = registry.register("edgar", RateBudget::per_minute(1)).unwrap();
    let quotes = registry.register("quotes", RateBudget::per_minute(1)).unwrap();

    assert!(edgar.acquire().await.is_ok());
    assert!(edgar.acquire().await.is_err());
    assert!(quotes.acquire().await.is_ok());
}

#[tokio::test]
async fn test_waiting_caller_gets_token_after_refill() {
    let registry = LimiterRegistry::new(LimiterConfig { max_wait_ms: 500 });
    let limiter = registry
        .register("slow", RateBudget::new(1, Duration::from_millis(30)))
        .unwrap();

    limiter.acquire().await.unwrap();
    let permit = limiter.acquire().await.unwrap();
    assert!(permit.waited() >= Duration::from_millis(10));
    assert!(permit.waited() < Duration::from_millis(500));
}
