//! Cache-first request interception for a single cache generation.
//!
//! A [`CacheController`] moves through `Installing -> Installed -> Activating
//! -> Active`. The host drives every transition and awaits each phase before
//! starting the next; a failed install leaves the controller `Redundant`.
//!
//! While active, GET requests are answered from the current store when
//! possible and from the network otherwise. Successful same-origin responses
//! are written back on a spawned task so the caller never waits on storage.

use std::fmt;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use url::Url;

use crate::Error;
use crate::cache::key::{resolve, same_origin};
use crate::cache::{RequestKey, StorageBackend};
use crate::config::{AppConfig, CACHE_NAME, ConfigError, DEFAULT_MANIFEST, SHELL_URL, SYNC_TAG};
use crate::fetch::Fetcher;
use crate::types::{Destination, Intercepted, InterceptedRequest, Response, ResponseSource};

/// Lifecycle phase of one controller generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; this generation never serves requests.
    Redundant,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Active => "active",
            Phase::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Settings that define one controller generation.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub cache_name: String,
    pub origin: Url,
    pub manifest: Vec<String>,
    pub shell_url: String,
    pub sync_tag: String,
}

impl ControllerOptions {
    pub fn new(origin: Url) -> Self {
        Self {
            cache_name: CACHE_NAME.into(),
            origin,
            manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
            shell_url: SHELL_URL.into(),
            sync_tag: SYNC_TAG.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cache_name: config.cache_name.clone(),
            origin: config.origin_url()?,
            manifest: config.manifest.clone(),
            shell_url: config.shell_url.clone(),
            sync_tag: config.sync_tag.clone(),
        })
    }
}

pub struct CacheController {
    storage: Arc<dyn StorageBackend>,
    fetcher: Arc<dyn Fetcher>,
    cache_name: String,
    origin: Url,
    manifest: Vec<Url>,
    shell: Url,
    sync_tag: String,
    phase: RwLock<Phase>,
    write_backs: Mutex<JoinSet<()>>,
}

impl CacheController {
    /// Build a controller in the `Installing` phase.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if a manifest entry or the shell URL does not
    /// resolve against the origin.
    pub fn new(
        options: ControllerOptions, storage: Arc<dyn StorageBackend>, fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, Error> {
        let manifest = options
            .manifest
            .iter()
            .map(|entry| resolve(&options.origin, entry))
            .collect::<Result<Vec<_>, _>>()?;
        let shell = resolve(&options.origin, &options.shell_url)?;

        Ok(Self {
            storage,
            fetcher,
            cache_name: options.cache_name,
            origin: options.origin,
            manifest,
            shell,
            sync_tag: options.sync_tag,
            phase: RwLock::new(Phase::Installing),
            write_backs: Mutex::new(JoinSet::new()),
        })
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Names of every store the backend knows about, current or stale.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.storage.list_namespaces().await
    }

    /// Keys held by the current store.
    pub async fn cached_keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.storage.keys(&self.cache_name).await
    }

    /// Look up a GET entry in the current store without touching the network.
    pub async fn lookup(&self, url: &Url) -> Result<Option<Response>, Error> {
        self.storage.get(&self.cache_name, &RequestKey::get(url)).await
    }

    /// Open the current store and fill it with every manifest asset.
    ///
    /// All assets are fetched before anything is written; one failed fetch or
    /// non-2xx status fails the whole install and marks this generation
    /// redundant. Re-running install on an installed controller overwrites the
    /// same keys. Returns the number of stored assets.
    pub async fn install(&self) -> Result<usize, Error> {
        {
            let mut phase = self.phase.write().await;
            if !matches!(*phase, Phase::Installing | Phase::Installed) {
                return Err(Error::Lifecycle(format!("cannot install while {}", *phase)));
            }
            *phase = Phase::Installing;
        }

        match self.fill_manifest().await {
            Ok(count) => {
                *self.phase.write().await = Phase::Installed;
                tracing::info!(cache = %self.cache_name, assets = count, "install complete");
                Ok(count)
            }
            Err(e) => {
                *self.phase.write().await = Phase::Redundant;
                tracing::error!(cache = %self.cache_name, error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn fill_manifest(&self) -> Result<usize, Error> {
        self.storage.open(&self.cache_name).await?;
        tracing::info!(cache = %self.cache_name, "opened cache");

        let fetches = self.manifest.iter().map(|url| async move {
            let request = InterceptedRequest::get(url.clone());
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
            }
            Ok::<_, Error>((RequestKey::get(url), response))
        });
        let entries = try_join_all(fetches).await?;

        self.storage.put_all(&self.cache_name, &entries).await?;
        Ok(entries.len())
    }

    /// Delete every store except the current one and start serving.
    ///
    /// Returns the names of the deleted stores. If the backend fails midway the
    /// controller drops back to `Installed` so the host can retry.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        {
            let mut phase = self.phase.write().await;
            if *phase != Phase::Installed {
                return Err(Error::Lifecycle(format!("cannot activate while {}", *phase)));
            }
            *phase = Phase::Activating;
        }

        match self.delete_stale_stores().await {
            Ok(deleted) => {
                *self.phase.write().await = Phase::Active;
                tracing::info!(cache = %self.cache_name, deleted = deleted.len(), "activated");
                Ok(deleted)
            }
            Err(e) => {
                *self.phase.write().await = Phase::Installed;
                Err(e)
            }
        }
    }

    async fn delete_stale_stores(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.storage.list_namespaces().await? {
            if name == self.cache_name {
                continue;
            }
            if self.storage.delete_namespace(&name).await? {
                tracing::info!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Answer one intercepted request.
    ///
    /// Non-GET requests, and every request while the controller is not active,
    /// go straight to the network and are never cached. GET requests are served
    /// from the current store, then the network. A failed lookup or network
    /// fetch for a document falls back to the cached shell; any other failure,
    /// or a missing shell, is returned as the original error.
    pub async fn handle_fetch(&self, request: &InterceptedRequest) -> Result<Intercepted, Error> {
        if !request.is_get() || self.phase().await != Phase::Active {
            let response = self.fetcher.fetch(request).await?;
            return Ok(Intercepted { response, source: ResponseSource::Passthrough });
        }

        let key = RequestKey::get(&request.url);
        match self.storage.get(&self.cache_name, &key).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, "cache hit");
                return Ok(Intercepted { response, source: ResponseSource::Cache });
            }
            Ok(None) => tracing::debug!(url = %request.url, "cache miss"),
            // A failed lookup takes the same recovery path as a failed fetch.
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                return self.offline_fallback(request, e).await;
            }
        }

        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => return self.offline_fallback(request, e).await,
        };

        if response.is_cacheable() && same_origin(&self.origin, &request.url) {
            self.write_back(key, response.clone()).await;
        }

        Ok(Intercepted { response, source: ResponseSource::Network })
    }

    async fn offline_fallback(&self, request: &InterceptedRequest, err: Error) -> Result<Intercepted, Error> {
        if request.destination != Destination::Document {
            tracing::debug!(url = %request.url, error = %err, "network failed, no fallback");
            return Err(err);
        }

        match self.storage.get(&self.cache_name, &RequestKey::get(&self.shell)).await {
            Ok(Some(response)) => {
                tracing::info!(url = %request.url, shell = %self.shell, "serving offline shell");
                Ok(Intercepted { response, source: ResponseSource::ShellFallback })
            }
            Ok(None) => {
                tracing::warn!(url = %request.url, shell = %self.shell, "offline shell not cached");
                Err(err)
            }
            Err(lookup) => {
                tracing::warn!(url = %request.url, error = %lookup, "offline shell lookup failed");
                Err(err)
            }
        }
    }

    async fn write_back(&self, key: RequestKey, response: Response) {
        let storage = Arc::clone(&self.storage);
        let store = self.cache_name.clone();

        let mut tasks = self.write_backs.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match storage.put(&store, &key, &response).await {
                Ok(()) => tracing::debug!(key = %key, "cached response"),
                Err(e) => tracing::warn!(key = %key, error = %e, "cache write-back failed"),
            }
        });
    }

    /// Wait for every write-back spawned so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.write_backs.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "cache write-back task aborted");
            }
        }
    }

    /// Handle a background sync event. Returns whether the tag was recognised.
    pub async fn sync(&self, tag: &str) -> Result<bool, Error> {
        if tag != self.sync_tag {
            tracing::debug!(tag, "ignoring sync tag");
            return Ok(false);
        }
        self.sync_pending_analysis().await;
        Ok(true)
    }

    /// Extension point for deferred analysis work. Does nothing yet.
    async fn sync_pending_analysis(&self) {
        tracing::info!(tag = %self.sync_tag, "syncing pending analysis");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, MemoryBackend};
    use crate::types::ResponseType;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    const ORIGIN: &str = "https://scanner.test";

    /// Serves canned responses by absolute URL; anything else is a network error.
    #[derive(Default)]
    struct ScriptedFetcher {
        routes: StdMutex<HashMap<String, Response>>,
        calls: StdMutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn route(&self, url: &str, response: Response) {
            self.routes.lock().unwrap().insert(url.to_string(), response);
        }

        fn go_offline(&self) {
            self.routes.lock().unwrap().clear();
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn reset_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, Error> {
            let url = request.url.to_string();
            self.calls.lock().unwrap().push(format!("{} {}", request.method, url));
            self.routes
                .lock()
                .unwrap()
                .get(&url)
                .cloned()
                .ok_or_else(|| Error::Network(format!("failed to fetch {url}")))
        }
    }

    /// Memory store whose `put` can be held back and whose `get` can fail for one key.
    #[derive(Default)]
    struct GatedBackend {
        inner: MemoryBackend,
        put_gate: Option<Arc<Notify>>,
        broken: Option<RequestKey>,
    }

    #[async_trait]
    impl StorageBackend for GatedBackend {
        async fn open(&self, store: &str) -> Result<(), Error> {
            self.inner.open(store).await
        }

        async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
            if self.broken.as_ref() == Some(key) {
                return Err(Error::Storage(format!("unreadable entry {key}")));
            }
            self.inner.get(store, key).await
        }

        async fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
            if let Some(gate) = &self.put_gate {
                gate.notified().await;
            }
            self.inner.put(store, key, response).await
        }

        async fn put_all(&self, store: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
            self.inner.put_all(store, entries).await
        }

        async fn keys(&self, store: &str) -> Result<Vec<RequestKey>, Error> {
            self.inner.keys(store).await
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
            self.inner.list_namespaces().await
        }

        async fn delete_namespace(&self, store: &str) -> Result<bool, Error> {
            self.inner.delete_namespace(store).await
        }
    }

    fn page(url: &str, status: u16, response_type: ResponseType, body: &str) -> Response {
        Response {
            url: url.to_string(),
            status,
            status_text: String::new(),
            response_type,
            headers: vec![("content-type".into(), "text/html".into())],
            body: Bytes::from(body.to_string()),
        }
    }

    fn abs(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    fn get_key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse(&abs(path)).unwrap())
    }

    fn request(method: &str, path: &str, destination: &str) -> InterceptedRequest {
        let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
        InterceptedRequest::new(method, url, Destination::from(destination))
    }

    struct Harness<S = MemoryBackend> {
        controller: CacheController,
        storage: Arc<S>,
        fetcher: Arc<ScriptedFetcher>,
    }

    fn harness_with<S: StorageBackend + 'static>(manifest: &[&str], storage: Arc<S>) -> Harness<S> {
        let fetcher = Arc::new(ScriptedFetcher::default());
        for path in manifest {
            fetcher.route(&abs(path), page(&abs(path), 200, ResponseType::Basic, path));
        }
        let options = ControllerOptions {
            manifest: manifest.iter().map(|s| s.to_string()).collect(),
            ..ControllerOptions::new(Url::parse(ORIGIN).unwrap())
        };
        let controller = CacheController::new(options, storage.clone(), fetcher.clone()).unwrap();
        Harness { controller, storage, fetcher }
    }

    fn harness(manifest: &[&str]) -> Harness {
        harness_with(manifest, Arc::new(MemoryBackend::new()))
    }

    async fn active(manifest: &[&str]) -> Harness {
        activate(harness(manifest)).await
    }

    async fn activate<S>(h: Harness<S>) -> Harness<S> {
        h.controller.install().await.unwrap();
        h.controller.activate().await.unwrap();
        h.fetcher.reset_calls();
        h
    }

    async fn stored_urls<S>(h: &Harness<S>) -> Vec<String> {
        h.controller
            .cached_keys()
            .await
            .unwrap()
            .iter()
            .map(|k| k.url().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_install_caches_manifest() {
        let h = harness(&["/", "/index.html"]);
        assert_eq!(h.controller.phase().await, Phase::Installing);

        assert_eq!(h.controller.install().await.unwrap(), 2);
        assert_eq!(h.controller.phase().await, Phase::Installed);

        let key = RequestKey::get(&Url::parse(&abs("/index.html")).unwrap());
        assert!(h.storage.get(CACHE_NAME, &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let h = harness(&["/", "/index.html", "/share.html"]);
        h.controller.install().await.unwrap();
        h.controller.install().await.unwrap();

        assert_eq!(stored_urls(&h).await, vec![abs("/"), abs("/index.html"), abs("/share.html")]);
    }

    #[tokio::test]
    async fn test_install_fails_as_a_whole() {
        let h = harness(&["/", "/index.html", "/share.html"]);
        h.fetcher.routes.lock().unwrap().remove(&abs("/share.html"));

        let result = h.controller.install().await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(h.controller.phase().await, Phase::Redundant);
        assert!(h.controller.cached_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let h = harness(&["/", "/index.html"]);
        h.fetcher.route(&abs("/index.html"), page(&abs("/index.html"), 404, ResponseType::Basic, "missing"));

        assert!(matches!(h.controller.install().await, Err(Error::InstallFailed(_))));
        assert_eq!(h.controller.phase().await, Phase::Redundant);
        assert!(matches!(h.controller.install().await, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let h = harness(&["/"]);
        assert!(matches!(h.controller.activate().await, Err(Error::Lifecycle(_))));
        assert_eq!(h.controller.phase().await, Phase::Installing);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_stores() {
        let storage = Arc::new(MemoryBackend::new());
        let stale = page(&abs("/"), 200, ResponseType::Basic, "old");
        storage
            .put("price-scanner-v0", &RequestKey::get(&Url::parse(&abs("/")).unwrap()), &stale)
            .await
            .unwrap();
        storage.open("unrelated").await.unwrap();

        let h = harness_with(&["/", "/index.html"], storage);
        h.controller.install().await.unwrap();
        let deleted = h.controller.activate().await.unwrap();

        assert_eq!(deleted, vec!["price-scanner-v0".to_string(), "unrelated".to_string()]);
        assert_eq!(h.controller.store_names().await.unwrap(), vec![CACHE_NAME.to_string()]);
        assert_eq!(h.controller.phase().await, Phase::Active);
        assert!(matches!(h.controller.activate().await, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_cached_get_skips_network() {
        let h = active(&["/", "/index.html"]).await;

        let result = h.controller.handle_fetch(&request("GET", "/index.html", "document")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Cache);
        assert_eq!(result.response.body, Bytes::from_static(b"/index.html"));
        assert!(h.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cache_match_ignores_fragment() {
        let h = active(&["/index.html"]).await;

        let result = h.controller.handle_fetch(&request("GET", "/index.html#results", "")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Cache);
        assert!(h.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let h = active(&["/"]).await;
        h.fetcher.route(&abs("/api/scan"), page(&abs("/api/scan"), 200, ResponseType::Basic, "{}"));

        let result = h.controller.handle_fetch(&request("POST", "/api/scan", "")).await.unwrap();
        h.controller.settle().await;

        assert_eq!(result.source, ResponseSource::Passthrough);
        assert_eq!(h.fetcher.calls(), vec![format!("POST {}", abs("/api/scan"))]);
        assert_eq!(stored_urls(&h).await, vec![abs("/")]);
    }

    #[tokio::test]
    async fn test_inactive_controller_passes_through() {
        let h = harness(&["/"]);
        h.fetcher.route(&abs("/app.js"), page(&abs("/app.js"), 200, ResponseType::Basic, "js"));

        let result = h.controller.handle_fetch(&request("GET", "/app.js", "script")).await.unwrap();
        h.controller.settle().await;

        assert_eq!(result.source, ResponseSource::Passthrough);
        assert!(h.controller.cached_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_origin_miss_is_written_back() {
        let h = active(&["/"]).await;
        h.fetcher.route(&abs("/app.js"), page(&abs("/app.js"), 200, ResponseType::Basic, "js"));

        let first = h.controller.handle_fetch(&request("GET", "/app.js", "script")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.response.body, Bytes::from_static(b"js"));

        h.controller.settle().await;
        assert_eq!(stored_urls(&h).await, vec![abs("/"), abs("/app.js")]);

        h.fetcher.go_offline();
        let second = h.controller.handle_fetch(&request("GET", "/app.js", "script")).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(h.fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_response_returns_before_write_back() {
        let gate = Arc::new(Notify::new());
        let storage = Arc::new(GatedBackend { put_gate: Some(Arc::clone(&gate)), ..Default::default() });
        let h = activate(harness_with(&["/"], storage)).await;
        h.fetcher.route(&abs("/app.js"), page(&abs("/app.js"), 200, ResponseType::Basic, "js"));
        let url = Url::parse(&abs("/app.js")).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            h.controller.handle_fetch(&request("GET", "/app.js", "script")),
        )
        .await
        .expect("interception waited on the cache write")
        .unwrap();
        assert_eq!(result.source, ResponseSource::Network);
        assert!(h.controller.lookup(&url).await.unwrap().is_none());

        gate.notify_one();
        h.controller.settle().await;
        let stored = h.controller.lookup(&url).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"js"));
    }

    #[tokio::test]
    async fn test_cross_origin_not_cached() {
        let h = active(&["/"]).await;
        let cdn = "https://cdn.test/lib.js";
        h.fetcher.route(cdn, page(cdn, 200, ResponseType::Cors, "lib"));
        let req = InterceptedRequest::new("GET", Url::parse(cdn).unwrap(), Destination::Script);

        let result = h.controller.handle_fetch(&req).await.unwrap();
        h.controller.settle().await;

        assert_eq!(result.source, ResponseSource::Network);
        assert_eq!(result.response.response_type, ResponseType::Cors);
        assert_eq!(stored_urls(&h).await, vec![abs("/")]);
    }

    #[tokio::test]
    async fn test_basic_response_for_foreign_url_not_cached() {
        let h = active(&["/"]).await;
        let other = "https://other.test/page";
        h.fetcher.route(other, page(other, 200, ResponseType::Basic, "x"));
        let req = InterceptedRequest::new("GET", Url::parse(other).unwrap(), Destination::Empty);

        h.controller.handle_fetch(&req).await.unwrap();
        h.controller.settle().await;

        assert_eq!(stored_urls(&h).await, vec![abs("/")]);
    }

    #[tokio::test]
    async fn test_error_status_returned_not_cached() {
        let h = active(&["/"]).await;
        h.fetcher.route(&abs("/missing"), page(&abs("/missing"), 404, ResponseType::Basic, "nope"));

        let result = h.controller.handle_fetch(&request("GET", "/missing", "document")).await.unwrap();
        h.controller.settle().await;

        assert_eq!(result.response.status, 404);
        assert_eq!(result.source, ResponseSource::Network);
        assert_eq!(stored_urls(&h).await, vec![abs("/")]);
    }

    #[tokio::test]
    async fn test_offline_image_yields_no_response() {
        let h = active(&["/", "/index.html"]).await;
        h.fetcher.go_offline();

        // No fallback for non-document destinations: the caller sees the network error.
        let result = h.controller.handle_fetch(&request("GET", "/photo.png", "image")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_offline_document_gets_shell() {
        let h = active(&["/index.html"]).await;
        h.fetcher.go_offline();

        let result = h.controller.handle_fetch(&request("GET", "/", "document")).await.unwrap();
        assert_eq!(result.source, ResponseSource::ShellFallback);
        assert_eq!(result.response.body, Bytes::from_static(b"/index.html"));
    }

    #[tokio::test]
    async fn test_offline_document_without_shell_propagates_error() {
        let h = active(&["/share.html"]).await;
        h.fetcher.go_offline();

        let result = h.controller.handle_fetch(&request("GET", "/", "document")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_failed_lookup_for_document_gets_shell() {
        let storage = Arc::new(GatedBackend { broken: Some(get_key("/")), ..Default::default() });
        let h = activate(harness_with(&["/", "/index.html"], storage)).await;

        let result = h.controller.handle_fetch(&request("GET", "/", "document")).await.unwrap();
        assert_eq!(result.source, ResponseSource::ShellFallback);
        assert_eq!(result.response.body, Bytes::from_static(b"/index.html"));
        assert!(h.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_for_script_propagates() {
        let storage = Arc::new(GatedBackend { broken: Some(get_key("/")), ..Default::default() });
        let h = activate(harness_with(&["/", "/index.html"], storage)).await;

        let result = h.controller.handle_fetch(&request("GET", "/", "script")).await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_sqlite_lifecycle_purges_stale_store() {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        db.put("price-scanner-v0", &get_key("/"), &page(&abs("/"), 200, ResponseType::Basic, "old"))
            .await
            .unwrap();

        let h = harness_with(&["/", "/index.html"], db);
        h.controller.install().await.unwrap();
        assert_eq!(
            h.controller.store_names().await.unwrap(),
            vec!["price-scanner-v0".to_string(), CACHE_NAME.to_string()]
        );

        let deleted = h.controller.activate().await.unwrap();
        assert_eq!(deleted, vec!["price-scanner-v0".to_string()]);
        assert_eq!(h.controller.store_names().await.unwrap(), vec![CACHE_NAME.to_string()]);

        let orphans: i64 = h
            .storage
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE store = 'price-scanner-v0'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);

        h.fetcher.go_offline();
        let result = h.controller.handle_fetch(&request("GET", "/", "document")).await.unwrap();
        assert_eq!(result.source, ResponseSource::Cache);
        assert_eq!(result.response.body, Bytes::from_static(b"/"));
    }

    #[tokio::test]
    async fn test_sync_tag_filter() {
        let h = harness(&["/"]);
        assert!(h.controller.sync("sync-analysis").await.unwrap());
        assert!(!h.controller.sync("sync-uploads").await.unwrap());
    }

    #[test]
    fn test_new_rejects_bad_manifest_entry() {
        let options = ControllerOptions {
            manifest: vec!["ftp://files.test/a".into()],
            ..ControllerOptions::new(Url::parse(ORIGIN).unwrap())
        };
        let result = CacheController::new(options, Arc::new(MemoryBackend::new()), Arc::new(ScriptedFetcher::default()));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_options_from_config() {
        let config = AppConfig { origin: ORIGIN.into(), cache_name: "price-scanner-v2".into(), ..Default::default() };
        let options = ControllerOptions::from_config(&config).unwrap();
        assert_eq!(options.cache_name, "price-scanner-v2");
        assert_eq!(options.origin.as_str(), "https://scanner.test/");
        assert_eq!(options.manifest.len(), 3);
    }
}
