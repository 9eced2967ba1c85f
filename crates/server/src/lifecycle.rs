//! Host side of the controller lifecycle.
//!
//! The host installs the controller, waits for install to finish, then
//! activates it. Only an active controller answers requests from its cache.

use shellcache_core::{CacheController, Error};

/// Install then activate `controller`.
pub async fn start(controller: &CacheController) -> Result<(), Error> {
    let assets = controller.install().await?;
    let deleted = controller.activate().await?;

    tracing::info!(
        cache = controller.cache_name(),
        assets,
        stale_deleted = deleted.len(),
        "controller active"
    );

    Ok(())
}
