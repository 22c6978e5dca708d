//! Contract Test: Gateway-Owned Rate Limit Retry
//!
//! Constraints verified:
//! - N rate limits followed by success cost exactly N+1 store calls
//! - Retry stops at the attempt limit and surfaces as a failure result
//! - The backend's retry hint is honored
//! - The overall deadline bounds how long a caller can be held
//! - Non-rate-limit errors are never retried
//!
//! Architectural boundaries:
//! - ✅ GATEWAY: Owns retry policy
//! - ❌ STORE: Must NOT retry (single-shot, reports `RateLimited`)

mod common;

use common::*;
use hackreg_core::{
    AttendeeLookup, CheckInDesk, Day, Error, Flag, Meal, RetryPolicy, StoreGateway,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn n_rate_limits_then_success_costs_n_plus_one_calls() {
    let store = ScriptedStore::new();
    let record = store.seed(new_attendee("ABC123")).await;
    let desk = desk(&store);

    // Lookup succeeds first time; the update is limited twice
    let lookups_before = store.find_calls();
    let attendee = desk.attendee("ABC123").await.unwrap().unwrap();
    assert_eq!(store.find_calls(), lookups_before + 1);

    let gateway = gateway(&store, 4);
    store.rate_limit_next(2);
    gateway
        .set_flag(&attendee.record_id, Flag::CheckedIn)
        .await
        .unwrap();

    assert_eq!(store.set_flag_calls(), 3, "2 rate limits + 1 success");
    assert!(store.snapshot(&record.record_id).await.has(Flag::CheckedIn));
}

#[tokio::test]
async fn redemption_rides_out_rate_limits() {
    let store = ScriptedStore::new();
    store.seed(new_attendee("ABC123")).await;
    let desk = desk(&store);

    // First call (the lookup) is limited, then all is well
    store.rate_limit_next(1);
    let result = desk.claim_meal("ABC123", Day::Friday, Meal::Dinner).await;

    assert!(result.success, "{}", result.status);
    assert_eq!(store.find_calls(), 2);
    assert_eq!(store.set_flag_calls(), 1);
}

#[tokio::test]
async fn exhausted_retries_become_a_failure_result() {
    let store = ScriptedStore::new();
    let record = store.seed(new_attendee("ABC123")).await;
    let desk = CheckInDesk::new(AttendeeLookup::new(gateway(&store, 3)));

    let attendee = desk.attendee("ABC123").await.unwrap().unwrap();
    assert_eq!(attendee.record_id, record.record_id);

    store.rate_limit_next(100);
    let result = desk.check_in("ABC123", Day::Saturday).await;

    assert!(!result.success);
    assert_eq!(store.find_calls(), 1 + 3, "bounded by max_attempts");
    assert_eq!(store.set_flag_calls(), 0);
    assert!(!store.snapshot(&record.record_id).await.has(Flag::CheckedIn));
}

#[tokio::test]
async fn exhaustion_is_reported_as_retries_exhausted() {
    let store = ScriptedStore::new();
    let gateway = gateway(&store, 2);

    store.rate_limit_next(5);
    let err = gateway.find_by_ticket("ABC123").await.unwrap_err();

    assert!(
        matches!(err, Error::RetriesExhausted { attempts: 2, .. }),
        "unexpected error: {err:?}"
    );
    assert!(err.is_rate_limited());
    assert_eq!(store.find_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_hint_is_honored() {
    let store = ScriptedStore::new().with_retry_hint(Duration::from_secs(3));
    store.seed(new_attendee("ABC123")).await;
    let policy = RetryPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(10),
        multiplier: 2.0,
        deadline: Duration::from_secs(60),
    };
    let gateway = StoreGateway::new(Arc::new(store.clone()), policy);

    store.rate_limit_next(2);
    let started = tokio::time::Instant::now();
    let found = gateway.find_by_ticket("ABC123").await.unwrap();

    assert!(found.is_some());
    assert_eq!(started.elapsed(), Duration::from_secs(6), "two 3s hints");
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_total_wait() {
    let store = ScriptedStore::new().with_retry_hint(Duration::from_secs(4));
    let policy = RetryPolicy {
        max_attempts: 100,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(10),
        multiplier: 2.0,
        deadline: Duration::from_secs(10),
    };
    let gateway = StoreGateway::new(Arc::new(store.clone()), policy);

    store.rate_limit_next(1000);
    let started = tokio::time::Instant::now();
    let err = gateway.find_by_ticket("ABC123").await.unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { .. }));
    assert!(started.elapsed() <= Duration::from_secs(10));
    assert_eq!(store.find_calls(), 3, "calls at 0s, 4s and 8s; 12s would pass the deadline");
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let store = ScriptedStore::new();
    let gateway = gateway(&store, 5);

    let err = gateway.get_attendee("page-missing").await.unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(store.get_calls(), 1);
}
