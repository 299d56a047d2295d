use redis::RedisResult;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Fixed window counter. The window starts with the first hit and later
    /// hits do not extend it.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX EX only creates the counter (and its TTL) when absent; INCR keeps the TTL
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("NX")
            .arg("EX")
            .arg(window_seconds)
            .ignore()
            .incr(key, 1)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }

    /// Returns true the first time a reminder is claimed for this booking
    /// within `ttl_seconds`, so several scheduler replicas send it once.
    pub async fn claim_reminder(&self, booking_id: Uuid, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("reminder:{}", booking_id);

        // SET NX: only the first claimant gets "OK" back
        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(chrono::Utc::now().timestamp())
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }
}
