//! Skipped unless `REDIS_URL` points at a scratch Redis.

use std::time::Duration;
use uuid::Uuid;
use yatra_store::RedisClient;

async fn connect() -> Option<RedisClient> {
    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set, skipping Redis test");
        return None;
    };
    Some(RedisClient::new(&url).await.expect("open REDIS_URL"))
}

#[tokio::test]
async fn test_rate_limit_window_is_not_extended_by_later_hits() {
    let Some(redis) = connect().await else { return };
    let key = format!("rate:test:{}", Uuid::new_v4());

    assert!(redis.check_rate_limit(&key, 2, 2).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(redis.check_rate_limit(&key, 2, 2).await.unwrap());

    // Third hit lands after the first window closed, so the count starts over.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(redis.check_rate_limit(&key, 2, 2).await.unwrap());
}

#[tokio::test]
async fn test_rate_limit_blocks_over_limit_within_window() {
    let Some(redis) = connect().await else { return };
    let key = format!("rate:test:{}", Uuid::new_v4());

    assert!(redis.check_rate_limit(&key, 1, 60).await.unwrap());
    assert!(!redis.check_rate_limit(&key, 1, 60).await.unwrap());
}

#[tokio::test]
async fn test_reminder_is_claimed_once() {
    let Some(redis) = connect().await else { return };
    let booking_id = Uuid::new_v4();

    assert!(redis.claim_reminder(booking_id, 60).await.unwrap());
    assert!(!redis.claim_reminder(booking_id, 60).await.unwrap());
}
