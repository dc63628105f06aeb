use std::sync::Arc;

use tracing::debug;

use tessera_types::{ProviderKind, StateConfig};

use crate::error::{StoreError, StoreResult};
use crate::file::FileContentProvider;
use crate::traits::StateContentProvider;

/// Build the content provider selected by a workspace's state configuration.
///
/// Configuration problems (missing option block, empty bucket, provider not
/// compiled in) are raised here, synchronously, before any I/O happens.
pub fn provider_from_config(
    workspace_id: &str,
    config: &StateConfig,
) -> StoreResult<Arc<dyn StateContentProvider>> {
    match config.provider {
        ProviderKind::File => {
            let options = config.options.file.as_ref().ok_or_else(|| {
                StoreError::Configuration(
                    "file state provider requires options.file.local_storage_dir".to_string(),
                )
            })?;
            if options.local_storage_dir.as_os_str().is_empty() {
                return Err(StoreError::Configuration(
                    "file state provider requires a non-empty local_storage_dir".to_string(),
                ));
            }
            debug!(
                workspace = workspace_id,
                provider = "file",
                dir = %options.local_storage_dir.display(),
                "building state content provider"
            );
            Ok(Arc::new(FileContentProvider::new(&options.local_storage_dir)))
        }
        ProviderKind::S3 => {
            let options = config.options.s3.as_ref().ok_or_else(|| {
                StoreError::Configuration(
                    "s3 state provider requires options.s3.bucket".to_string(),
                )
            })?;
            if options.bucket.trim().is_empty() {
                return Err(StoreError::Configuration(
                    "s3 state provider requires a non-empty bucket name".to_string(),
                ));
            }
            #[cfg(feature = "s3")]
            {
                debug!(
                    workspace = workspace_id,
                    provider = "s3",
                    bucket = %options.bucket,
                    "building state content provider"
                );
                Ok(Arc::new(crate::s3::S3ContentProvider::connect(&options.bucket)?))
            }
            #[cfg(not(feature = "s3"))]
            {
                Err(StoreError::Configuration(format!(
                    "state provider `s3` (bucket {}) requires building with the `s3` feature",
                    options.bucket
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{ProviderOptions, S3StateOptions};

    #[test]
    fn file_provider_is_built_from_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StateConfig::file(dir.path());
        assert!(provider_from_config("acme", &config).is_ok());
    }

    #[test]
    fn file_provider_without_options_fails_fast() {
        let config = StateConfig {
            provider: ProviderKind::File,
            options: ProviderOptions::default(),
        };
        let err = provider_from_config("acme", &config).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
        assert!(err.to_string().contains("local_storage_dir"));
    }

    #[test]
    fn file_provider_with_empty_dir_fails_fast() {
        let config = StateConfig::file("");
        assert!(matches!(
            provider_from_config("acme", &config).unwrap_err(),
            StoreError::Configuration(_)
        ));
    }

    #[test]
    fn s3_provider_without_options_fails_fast() {
        let config = StateConfig {
            provider: ProviderKind::S3,
            options: ProviderOptions::default(),
        };
        let err = provider_from_config("acme", &config).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn s3_provider_with_empty_bucket_fails_fast() {
        let config = StateConfig {
            provider: ProviderKind::S3,
            options: ProviderOptions {
                file: None,
                s3: Some(S3StateOptions {
                    bucket: "  ".to_string(),
                    prefix: None,
                }),
            },
        };
        assert!(matches!(
            provider_from_config("acme", &config).unwrap_err(),
            StoreError::Configuration(_)
        ));
    }
}
