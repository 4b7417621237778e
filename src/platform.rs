//! Cloudflare Workers bindings: KV namespace and environment variables.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use worker::send::{SendFuture, SendWrapper};
use worker::Env;

use crate::config::GatewayConfig;
use crate::error::StoreError;
use crate::store::KvStore;
use crate::{telemetry, Gateway};

static CONFIG: OnceCell<Arc<GatewayConfig>> = OnceCell::new();

/// Build the gateway for one request. Configuration is read from the
/// environment on the first request of the isolate and reused after that.
pub fn gateway(env: &Env) -> worker::Result<Gateway> {
    let config = CONFIG
        .get_or_try_init(|| {
            let config = GatewayConfig::from_lookup(|name| lookup(env, name))
                .map_err(|e| worker::Error::RustError(e.to_string()))?;
            telemetry::init(&config.logging);
            Ok::<_, worker::Error>(Arc::new(config))
        })?
        .clone();

    let store = Arc::new(WorkersKv {
        env: SendWrapper::new(env.clone()),
        binding: config.kv_binding.clone(),
    });
    Ok(Gateway::new(store, config))
}

/// Secrets first, then plain `[vars]`.
fn lookup(env: &Env, name: &str) -> Option<String> {
    env.secret(name)
        .or_else(|_| env.var(name))
        .ok()
        .map(|v| v.to_string())
}

struct WorkersKv {
    env: SendWrapper<Env>,
    binding: String,
}

#[async_trait]
impl KvStore for WorkersKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let kv = self.env.kv(&self.binding).map_err(StoreError::backend)?;
        SendFuture::new(async move { kv.get(key).text().await })
            .await
            .map_err(StoreError::backend)
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let kv = self.env.kv(&self.binding).map_err(StoreError::backend)?;
        SendFuture::new(async move {
            match kv.put(key, value) {
                Ok(builder) => builder.execute().await,
                Err(err) => Err(err),
            }
        })
        .await
        .map_err(StoreError::backend)
    }
}
