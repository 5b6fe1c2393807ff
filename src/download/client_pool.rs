//! Per-host HTTP client pool.
//!
//! The [`ClientPool`] keeps exactly one [`HostClient`] per site domain for the
//! lifetime of the pool. Clients are built lazily on first use and then shared
//! by every concurrent download to that host.
//!
//! # Single construction
//!
//! Lookups take a lock-free read path. On a miss, construction happens inside
//! `DashMap::entry`, which holds the shard's write lock until the new client
//! is stored, so concurrent first requests for the same host observe one
//! client and only one is ever built. Construction never touches the network,
//! so the lock is held only for the duration of the builder call.
//!
//! # Proxies
//!
//! `reqwest` binds a proxy when a client is built. Proxy-bound clients are
//! therefore kept pool-wide, one per proxy and shared by every host, with
//! the least recently used dropped once [`MAX_PROXIED_CLIENTS`] is reached.
//! Settings that differ between sites (user agent, timeout) travel on each
//! request instead of being baked into these clients.
//!
//! # Backpressure
//!
//! Each [`HostClient`] carries a semaphore sized by the pool-size hint. The
//! downloader holds a slot from the moment it sends a request until the body
//! has been consumed, bounding concurrent connections per host. Changing the
//! hint resizes every pooled host at once.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, instrument};

use super::config::{ConfigError, validate_pool_size};
use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_POOL_SIZE, MAX_PROXIED_CLIENTS, READ_TIMEOUT_SECS,
};
use super::error::DownloadError;
use crate::model::Site;
use crate::proxy::Proxy;
use crate::user_agent;

/// The client and connection slots shared by every download to one host.
#[derive(Debug)]
pub struct HostClient {
    domain: String,
    gzip: bool,
    cookie_store: bool,
    direct: Client,
    limit: Mutex<usize>,
    // Permits still owed after a shrink found too few free slots.
    shrink_debt: AtomicUsize,
    slots: Semaphore,
}

impl HostClient {
    fn build(site: Option<&Site>, pool_size: usize) -> Result<Self, DownloadError> {
        let profile = ClientProfile::for_site(site);
        let direct = profile.build(pool_size, None)?;
        Ok(Self {
            domain: site.map(Site::pool_key).unwrap_or_default(),
            gzip: profile.gzip,
            cookie_store: profile.cookie_store,
            direct,
            limit: Mutex::new(pool_size),
            shrink_debt: AtomicUsize::new(0),
            slots: Semaphore::new(pool_size),
        })
    }

    /// Pool key of the host (lower-cased domain; empty for the default client).
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Maximum concurrent in-flight requests to this host.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        *self.limit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of connection slots currently free.
    #[must_use]
    pub fn available_connections(&self) -> usize {
        self.slots.available_permits()
    }

    /// Waits for a free connection slot on this host.
    pub(crate) async fn acquire_slot(&self, url: &str) -> Result<ConnectionSlot<'_>, DownloadError> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| DownloadError::pool_closed(url))?;
        Ok(ConnectionSlot {
            permit: Some(permit),
            shrink_debt: &self.shrink_debt,
        })
    }

    /// Changes the connection bound, including for requests already waiting.
    ///
    /// Shrinking below the number of slots in use takes effect as those
    /// slots are returned.
    fn resize(&self, pool_size: usize) {
        let mut limit = self.limit.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *limit, pool_size);
        if pool_size > previous {
            let grow = pool_size - previous;
            let owed = self
                .shrink_debt
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| {
                    Some(d.saturating_sub(grow))
                })
                .unwrap_or_default();
            self.slots.add_permits(grow - owed.min(grow));
        } else if pool_size < previous {
            let shrink = previous - pool_size;
            let forgotten = self.slots.forget_permits(shrink);
            self.shrink_debt
                .fetch_add(shrink - forgotten, Ordering::SeqCst);
        }
        debug!(domain = %self.domain, previous, pool_size, "host connection bound resized");
    }

    fn close(&self) {
        self.slots.close();
    }
}

/// A connection slot held for one download attempt.
///
/// Dropping it frees the slot, unless the host was shrunk while the slot was
/// in use, in which case the slot is retired.
#[derive(Debug)]
pub(crate) struct ConnectionSlot<'a> {
    permit: Option<SemaphorePermit<'a>>,
    shrink_debt: &'a AtomicUsize,
}

impl Drop for ConnectionSlot<'_> {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        let owed = self
            .shrink_debt
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1))
            .is_ok();
        if owed {
            permit.forget();
        }
    }
}

/// Identity of a shared proxy-bound client.
///
/// Gzip and the cookie store cannot be switched per request, so hosts that
/// differ in them get separate clients for the same proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProxiedKey {
    proxy: Proxy,
    gzip: bool,
    cookie_store: bool,
}

#[derive(Debug)]
struct ProxiedClient {
    client: Client,
    last_used: AtomicU64,
}

/// Lazily populated map of host → [`HostClient`], plus the shared
/// proxy-bound clients.
///
/// Designed to be shared (directly or inside an `Arc`) by all download tasks
/// of one downloader. Host clients are never evicted; [`ClientPool::close`]
/// tears them all down.
#[derive(Debug)]
pub struct ClientPool {
    pool_size: AtomicUsize,
    clients: DashMap<String, Arc<HostClient>>,
    built: AtomicUsize,
    proxied: DashMap<ProxiedKey, ProxiedClient>,
    proxied_built: AtomicUsize,
    proxied_capacity: usize,
    clock: AtomicU64,
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl ClientPool {
    /// Creates an empty pool whose clients allow `pool_size` connections per host.
    ///
    /// The value is trusted; validate user input with
    /// [`ClientPool::set_pool_size`] or [`DownloaderConfig`](super::DownloaderConfig).
    #[must_use]
    pub fn new(pool_size: usize) -> Self {
        Self::with_proxied_capacity(pool_size, MAX_PROXIED_CLIENTS)
    }

    /// Creates an empty pool that keeps at most `capacity` proxy-bound clients.
    #[must_use]
    pub fn with_proxied_capacity(pool_size: usize, capacity: usize) -> Self {
        Self {
            pool_size: AtomicUsize::new(pool_size.max(1)),
            clients: DashMap::new(),
            built: AtomicUsize::new(0),
            proxied: DashMap::new(),
            proxied_built: AtomicUsize::new(0),
            proxied_capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    /// Current per-host connection bound.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size.load(Ordering::SeqCst)
    }

    /// Changes the per-host connection bound for every host, pooled or not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPoolSize`] outside `1..=1000`.
    pub fn set_pool_size(&self, pool_size: usize) -> Result<(), ConfigError> {
        let pool_size = validate_pool_size(pool_size)?;
        self.pool_size.store(pool_size, Ordering::SeqCst);
        for entry in &self.clients {
            entry.value().resize(pool_size);
        }
        debug!(pool_size, hosts = self.clients.len(), "pool size updated");
        Ok(())
    }

    /// Returns the client for `site`, building and storing it on first use.
    ///
    /// Without a site, a fresh default client is returned that is not pooled.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] when the site's settings cannot
    /// produce a client. Nothing is stored in that case.
    #[instrument(level = "debug", skip_all, fields(domain = site.map_or("", Site::domain)))]
    pub fn get(&self, site: Option<&Site>) -> Result<Arc<HostClient>, DownloadError> {
        let Some(site) = site else {
            debug!("building unshared default client");
            return HostClient::build(None, self.pool_size()).map(Arc::new);
        };

        let key = site.pool_key();
        if let Some(existing) = self.clients.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        let entry = self.clients.entry(key).or_try_insert_with(|| {
            let client = HostClient::build(Some(site), self.pool_size())?;
            self.built.fetch_add(1, Ordering::SeqCst);
            info!(
                domain = %client.domain(),
                pool_size = client.max_connections(),
                "built pooled client"
            );
            Ok::<_, DownloadError>(Arc::new(client))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Returns the client to send `host`'s request through: the host's own
    /// client, or the shared client bound to `proxy`.
    pub(crate) fn client_for(
        &self,
        host: &HostClient,
        proxy: Option<&Proxy>,
    ) -> Result<Client, DownloadError> {
        let Some(proxy) = proxy else {
            return Ok(host.direct.clone());
        };
        let key = ProxiedKey {
            proxy: proxy.clone(),
            gzip: host.gzip,
            cookie_store: host.cookie_store,
        };
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        if let Some(existing) = self.proxied.get(&key) {
            existing.last_used.store(tick, Ordering::Relaxed);
            return Ok(existing.client.clone());
        }

        if self.proxied.len() >= self.proxied_capacity {
            self.evict_least_recently_used();
        }
        let profile = ClientProfile::shared(host.gzip, host.cookie_store);
        let entry = self.proxied.entry(key).or_try_insert_with(|| {
            let client = profile.build(self.pool_size(), Some(proxy))?;
            self.proxied_built.fetch_add(1, Ordering::SeqCst);
            debug!(proxy = %proxy, "built proxied client");
            Ok::<_, DownloadError>(ProxiedClient {
                client,
                last_used: AtomicU64::new(tick),
            })
        })?;
        Ok(entry.client.clone())
    }

    fn evict_least_recently_used(&self) {
        let oldest = self
            .proxied
            .iter()
            .min_by_key(|entry| entry.last_used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.proxied.remove(&key);
            debug!(proxy = %key.proxy, "evicted proxied client");
        }
    }

    /// Number of hosts with a pooled client.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Returns true if a client is pooled for `domain` (case-insensitive).
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.clients.contains_key(&domain.to_ascii_lowercase())
    }

    /// Total pooled clients ever built; stays equal to [`len`](Self::len)
    /// unless the pool has been closed and reused.
    #[must_use]
    pub fn clients_built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    /// Number of proxy-bound clients currently kept.
    #[must_use]
    pub fn proxied_clients(&self) -> usize {
        self.proxied.len()
    }

    /// Total proxy-bound clients ever built, evicted ones included.
    #[must_use]
    pub fn proxied_clients_built(&self) -> usize {
        self.proxied_built.load(Ordering::SeqCst)
    }

    /// Closes every pooled client.
    ///
    /// Requests waiting for a connection slot fail with
    /// [`DownloadError::PoolClosed`]; in-flight requests finish normally and
    /// their connections are dropped with the last reference to the client.
    pub fn close(&self) {
        for entry in &self.clients {
            entry.value().close();
        }
        let closed = self.clients.len();
        self.clients.clear();
        self.proxied.clear();
        info!(closed, "client pool closed");
    }
}

/// Client-level settings; everything a `reqwest::Client` fixes at build time.
#[derive(Debug, Clone)]
struct ClientProfile {
    domain: String,
    user_agent: String,
    connect_timeout: Duration,
    timeout: Duration,
    gzip: bool,
    cookie_store: bool,
}

impl ClientProfile {
    fn for_site(site: Option<&Site>) -> Self {
        let (connect_timeout, timeout) = match site.and_then(Site::timeout) {
            Some(timeout) => (timeout, timeout),
            None => default_timeouts(),
        };
        Self {
            domain: site.map(Site::domain).unwrap_or_default().to_string(),
            user_agent: site
                .and_then(Site::user_agent)
                .map_or_else(user_agent::default_crawl_user_agent, str::to_string),
            connect_timeout,
            timeout,
            gzip: site.is_none_or(Site::use_gzip),
            cookie_store: !site.is_some_and(Site::is_cookie_management_disabled),
        }
    }

    /// Profile of a client shared across hosts; per-site agent and timeout
    /// are set on each request.
    fn shared(gzip: bool, cookie_store: bool) -> Self {
        let (connect_timeout, timeout) = default_timeouts();
        Self {
            domain: String::new(),
            user_agent: user_agent::default_crawl_user_agent(),
            connect_timeout,
            timeout,
            gzip,
            cookie_store,
        }
    }

    fn build(&self, pool_size: usize, proxy: Option<&Proxy>) -> Result<Client, DownloadError> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .pool_max_idle_per_host(pool_size)
            .gzip(self.gzip)
            .cookie_store(self.cookie_store);

        if let Some(proxy) = proxy {
            let mut resolved = reqwest::Proxy::all(proxy.url())
                .map_err(|e| DownloadError::client_build(self.domain.as_str(), e))?;
            if let (Some(username), Some(password)) = (proxy.username(), proxy.password()) {
                resolved = resolved.basic_auth(username, password);
            }
            builder = builder.proxy(resolved);
        } else {
            // Proxies come from the provider only, never from the environment.
            builder = builder.no_proxy();
        }

        builder
            .build()
            .map_err(|e| DownloadError::client_build(self.domain.as_str(), e))
    }
}

fn default_timeouts() -> (Duration, Duration) {
    (
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        Duration::from_secs(READ_TIMEOUT_SECS),
    )
}
