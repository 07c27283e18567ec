use std::env;
use std::fmt;

use log::error;
use redis::{AsyncCommands, FromRedisValue, ToRedisArgs};

use crate::integration::Result;
use crate::room;

const TTL_SECS: i64 = 3600;

#[derive(Clone)]
pub struct Config {
    host: String,
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 6379,
        }
    }
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn env() -> Result<Self> {
        let host = env::var("REDIS_HOST")?;
        let port = env::var("REDIS_PORT")?.parse()?;
        Ok(Self { host, port })
    }
}

pub async fn init(config: &Config) -> Result<Redis> {
    let con = redis::Client::open(format!("redis://{}:{}", config.host, config.port))?
        .get_connection_manager()
        .await?;

    Ok(Redis { con })
}

#[derive(Clone)]
pub enum Key {
    RoomMembers(room::Id),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::RoomMembers(id) => write!(f, "room:{id}:members"),
        }
    }
}

impl ToRedisArgs for Key {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + redis::RedisWrite,
    {
        self.to_string().write_redis_args(out)
    }
}

/// Thin cache facade. A miss and a broken connection look the same to
/// callers; failures are logged and the durable store remains authoritative.
#[derive(Clone)]
pub struct Redis {
    con: redis::aio::ConnectionManager,
}

impl Redis {
    pub async fn smembers<V: FromRedisValue>(&self, key: Key) -> Option<V> {
        let mut con = self.con.clone();
        match con.smembers(key).await {
            Ok(v) => Some(v),
            Err(e) => {
                error!("failed to read set members from cache: {e}");
                None
            }
        }
    }

    pub async fn sadd<V: ToRedisArgs + Send + Sync>(&self, key: Key, v: &V) {
        let mut con = self.con.clone();
        if let Err(e) = con.sadd::<_, _, ()>(key, v).await {
            error!("failed to add set members to cache: {e}");
        }
    }

    pub async fn expire(&self, key: Key) {
        let mut con = self.con.clone();
        if let Err(e) = con.expire::<_, ()>(key, TTL_SECS).await {
            error!("failed to set cache key expiry: {e}");
        }
    }

    pub async fn del(&self, key: Key) {
        let mut con = self.con.clone();
        if let Err(e) = con.del::<_, ()>(key).await {
            error!("failed to drop cache key: {e}");
        }
    }
}
