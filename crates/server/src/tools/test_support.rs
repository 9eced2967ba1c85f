//! Controller fixtures shared by the tool tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use shellcache_core::{
    CacheController, ControllerOptions, Error, Fetcher, InterceptedRequest, MemoryBackend, Response, ResponseType,
};
use url::Url;

pub const ORIGIN: &str = "https://scanner.test";

/// Returns `200 basic` with the path as body for known URLs, a network error otherwise.
pub struct StaticFetcher {
    routes: HashMap<String, Response>,
}

impl StaticFetcher {
    pub fn new(paths: &[&str]) -> Self {
        let origin = Url::parse(ORIGIN).unwrap();
        let routes = paths
            .iter()
            .map(|path| {
                let url = origin.join(path).unwrap().to_string();
                let response = Response {
                    url: url.clone(),
                    status: 200,
                    status_text: "OK".into(),
                    response_type: ResponseType::Basic,
                    headers: vec![("content-type".into(), "text/html".into())],
                    body: Bytes::from(path.to_string()),
                };
                (url, response)
            })
            .collect();
        Self { routes }
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, Error> {
        self.routes
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("failed to fetch {}", request.url)))
    }
}

/// A controller over an in-memory backend whose network serves `online` paths.
pub fn controller(manifest: &[&str], online: &[&str]) -> Arc<CacheController> {
    let options = ControllerOptions {
        manifest: manifest.iter().map(|s| s.to_string()).collect(),
        ..ControllerOptions::new(Url::parse(ORIGIN).unwrap())
    };
    let controller =
        CacheController::new(options, Arc::new(MemoryBackend::new()), Arc::new(StaticFetcher::new(online))).unwrap();
    Arc::new(controller)
}

/// Installed and activated controller with the manifest reachable online.
pub async fn active_controller(manifest: &[&str], extra_online: &[&str]) -> Arc<CacheController> {
    let online: Vec<&str> = manifest.iter().chain(extra_online).copied().collect();
    let controller = controller(manifest, &online);
    controller.install().await.unwrap();
    controller.activate().await.unwrap();
    controller
}
