use async_trait::async_trait;
use super::EmbeddedDataStore;
use std::error::Error;
use log::debug;
use redis::{ Client, AsyncCommands };

/// Stores every key of one session as a field of a single Redis hash,
/// `<prefix><session id>`.
pub struct RedisStore {
    client: Client,
    hash_key: String,
}

impl RedisStore {
    pub fn new(
        url: &str,
        key_prefix: &str,
        session_id: &str
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(url)?,
            hash_key: format!("{}{}", key_prefix, session_id),
        })
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }
}

#[async_trait]
impl EmbeddedDataStore for RedisStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        conn.hset::<_, _, _, ()>(&self.hash_key, key, value).await?;
        debug!("HSET {} {}", self.hash_key, key);
        Ok(())
    }
}
