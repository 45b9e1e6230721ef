//! Pool of `reqwest::Client`s, one per base URL.
//!
//! Every agent bound to the same endpoint shares one client so connections, DNS lookups and
//! TLS sessions are reused across discussion rounds.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

lazy_static! {
    static ref HTTP_CLIENT_POOL: Mutex<HashMap<String, reqwest::Client>> =
        Mutex::new(HashMap::new());
}

/// Get or create the shared HTTP client for `base_url`.
///
/// Falls back to a default client (no pooling tweaks) if the tuned builder fails, so callers
/// always get something usable.
pub fn get_http_client(base_url: &str) -> reqwest::Client {
    let mut pool = match HTTP_CLIENT_POOL.lock() {
        Ok(pool) => pool,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(client) = pool.get(base_url) {
        return client.clone();
    }

    let client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|e| {
            log::warn!(
                "aichat::clients::http_pool: falling back to default HTTP client for {}: {}",
                base_url,
                e
            );
            reqwest::Client::new()
        });

    pool.insert(base_url.to_string(), client.clone());
    client
}

/// Number of distinct base URLs with a pooled client.
pub fn pool_size() -> usize {
    HTTP_CLIENT_POOL.lock().map(|pool| pool.len()).unwrap_or(0)
}

/// Whether a client for `base_url` has already been created.
pub fn is_pooled(base_url: &str) -> bool {
    HTTP_CLIENT_POOL
        .lock()
        .map(|pool| pool.contains_key(base_url))
        .unwrap_or(false)
}
