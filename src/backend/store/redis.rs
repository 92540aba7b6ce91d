/**
 * Redis Store
 *
 * `KvStore` implementation over a multiplexed async redis connection.
 *
 * # Claims
 *
 * `claim` runs the optimistic-locking sequence on a connection of its own,
 * because WATCH state is per connection and the shared multiplexed connection
 * is used concurrently by every session:
 *
 * 1. `WATCH key`
 * 2. `GET key` - present means the key is taken: `UNWATCH`, report conflict
 * 3. `MULTI; SET key value PX ttl; EXEC` - a nil reply means another client
 *    touched the key after the WATCH, which is also a conflict
 *
 * # Value-checked writes
 *
 * `extend` and `delete_if` compare the stored value and act in one Lua
 * script, so a lease or directory entry rewritten by another process is never
 * extended or removed.
 */

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use super::{ttl_millis, Extension, KvStore, StoreError};

/// 1 extended, 0 missing, -1 held by another value.
const EXTEND_IF_VALUE: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
if current ~= ARGV[1] then
    return -1
end
redis.call('PEXPIRE', KEYS[1], ARGV[2])
return 1
"#;

const DELETE_IF_VALUE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Store backed by a redis server.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to `addr`, accepting either a full `redis://` URL or `host:port`.
    pub async fn connect(addr: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(normalize_addr(addr))?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("[Store] Connected to redis at {}", addr);
        Ok(Self { client, conn })
    }
}

fn normalize_addr(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{}", addr)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn claim(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("WATCH")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;

        let existing: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        if existing.is_some() {
            redis::cmd("UNWATCH").query_async::<_, ()>(&mut conn).await?;
            return Ok(false);
        }

        let committed: Option<()> = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        Ok(committed.is_some())
    }

    async fn extend(&self, key: &str, value: &str, ttl: Duration) -> Result<Extension, StoreError> {
        let mut conn = self.conn.clone();
        let reply: i64 = redis::Script::new(EXTEND_IF_VALUE)
            .key(key)
            .arg(value)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(match reply {
            1 => Extension::Extended,
            0 => Extension::Missing,
            _ => Extension::HeldByOther,
        })
    }

    async fn delete_if(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::Script::new(DELETE_IF_VALUE)
            .key(key)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
