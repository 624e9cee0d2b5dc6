use tracing::info;

use crate::WatchConfig;
use crate::error::{BadgeError, Result};
use crate::storage::{BadgeStorage, ObjectMeta, ObjectRef};

/// Cache is disabled on the published badge so consumers never see a
/// stale status.
pub const TARGET_CACHE_CONTROL: &str = "no-cache, max-age=0";

/// Copies the status-specific badge over the fixed target object and makes
/// the target publicly readable.
///
/// Only called for approved events. A failed public-read grant after a
/// successful copy leaves the target with correct content but default
/// visibility; the next matching build repeats the grant.
pub async fn publish_badge<S: BadgeStorage>(
    storage: &S,
    config: &WatchConfig,
    status: &str,
    project_id: &str,
) -> Result<()> {
    info!("Building badge ...");

    let source = ObjectRef::new(&config.bucket_name, config.source_object_name(status));
    let target = ObjectRef::new(&config.bucket_name, config.target_object_name());

    let source_meta =
        storage
            .get(&source, project_id)
            .await?
            .ok_or_else(|| BadgeError::SourceNotFound {
                bucket: source.bucket.clone(),
                object: source.name.clone(),
            })?;

    let target_meta = ObjectMeta {
        content_type: source_meta.content_type,
        cache_control: Some(TARGET_CACHE_CONTROL.to_string()),
    };

    storage.copy(&source, &target, &target_meta, project_id).await?;
    info!(
        "Storage object '{}' copied as '{}' in bucket '{}'",
        source.name, target.name, config.bucket_name
    );

    storage.grant_public_read(&target, project_id).await?;
    info!(
        "Storage object '{}' made public in bucket '{}'",
        target.name, config.bucket_name
    );

    info!("Badge built.");
    Ok(())
}
