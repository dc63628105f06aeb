//! Remote object storage backend (feature `s3`).
//!
//! The provider surface is synchronous; an owned current-thread tokio
//! runtime drives the async AWS SDK from inside each call. Key scheme:
//! state blobs keep the `<prefix>.<account>.jsonl.gz` naming inside the
//! bucket, static files live under `static/<namespace>/<name>`.

use std::io::Cursor;
use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    account_from_file_name, state_file_name, ContentAndHash, NamedContent, StateContentProvider,
    StaticFilesSource,
};

fn backend_err(context: &str, e: impl std::fmt::Debug) -> StoreError {
    StoreError::Backend(format!("{context}: {e:?}"))
}

/// Shared SDK state: one client and the runtime that drives it.
struct S3Core {
    runtime: tokio::runtime::Runtime,
    client: Client,
    bucket: String,
}

impl S3Core {
    fn list_keys(&self, key_prefix: &str) -> StoreResult<Vec<String>> {
        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut continuation: Option<String> = None;
            loop {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(key_prefix);
                if let Some(token) = &continuation {
                    request = request.continuation_token(token);
                }
                let response = request
                    .send()
                    .await
                    .map_err(|e| backend_err("listing state objects", e))?;
                for object in response.contents() {
                    if let Some(key) = object.key() {
                        keys.push(key.to_string());
                    }
                }
                if response.is_truncated() == Some(true) {
                    continuation = response.next_continuation_token().map(str::to_string);
                } else {
                    break;
                }
            }
            keys.sort();
            Ok(keys)
        })
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.runtime.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await;
            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    let service = e.into_service_error();
                    if service.is_no_such_key() {
                        return Ok(None);
                    }
                    return Err(backend_err("reading state object", service));
                }
            };
            let data = response
                .body
                .collect()
                .await
                .map_err(|e| backend_err("collecting state object body", e))?;
            Ok(Some(data.into_bytes().to_vec()))
        })
    }

    fn put(&self, key: &str, data: Vec<u8>) -> StoreResult<()> {
        self.runtime.block_on(async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| backend_err("writing state object", e))?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.runtime.block_on(async {
            // DeleteObject on a missing key succeeds, which gives clear()
            // its idempotence for free.
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| backend_err("deleting state object", e))?;
            Ok(())
        })
    }

    fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        self.runtime.block_on(async {
            self.client
                .copy_object()
                .bucket(&self.bucket)
                .copy_source(format!("{}/{from}", self.bucket))
                .key(to)
                .send()
                .await
                .map_err(|e| backend_err("copying state object", e))?;
            Ok(())
        })
    }

    /// Copy-then-delete move. Copy first so the old key stays readable
    /// until the new one exists.
    fn rename_key(&self, from: &str, to: &str) -> StoreResult<()> {
        self.copy(from, to)?;
        self.delete(from)
    }
}

/// S3-backed content provider.
pub struct S3ContentProvider {
    core: Arc<S3Core>,
    static_files: Arc<S3StaticFiles>,
}

impl std::fmt::Debug for S3ContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ContentProvider")
            .field("bucket", &self.core.bucket)
            .finish_non_exhaustive()
    }
}

impl S3ContentProvider {
    /// Connect to a bucket using ambient AWS credentials and region.
    ///
    /// An empty bucket name is a configuration error, raised before the
    /// SDK is touched.
    pub fn connect(bucket: &str) -> StoreResult<Self> {
        if bucket.trim().is_empty() {
            return Err(StoreError::Configuration(
                "s3 state provider requires a non-empty bucket name".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = runtime.block_on(async {
            let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .load()
                .await;
            Client::new(&config)
        });
        let core = Arc::new(S3Core {
            runtime,
            client,
            bucket: bucket.to_string(),
        });
        let static_files = Arc::new(S3StaticFiles {
            core: Arc::clone(&core),
        });
        Ok(Self { core, static_files })
    }
}

impl StateContentProvider for S3ContentProvider {
    fn find_state_files(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let keys = self.core.list_keys(&format!("{prefix}."))?;
        Ok(keys
            .into_iter()
            .filter(|key| account_from_file_name(prefix, key).is_some())
            .collect())
    }

    fn read_contents(&self, paths: &[String]) -> StoreResult<Vec<NamedContent>> {
        // One blob is materialized at a time; readers hand out the already
        // fetched bytes.
        paths
            .iter()
            .map(|path| {
                let content = self
                    .core
                    .get(path)?
                    .ok_or_else(|| StoreError::NotFound(format!("state object {path}")))?;
                Ok(NamedContent {
                    name: path.clone(),
                    reader: Box::new(Cursor::new(content)) as Box<dyn std::io::Read + Send>,
                })
            })
            .collect()
    }

    fn write_contents(&self, prefix: &str, contents: &[ContentAndHash]) -> StoreResult<()> {
        for unit in contents {
            let key = state_file_name(prefix, &unit.account);
            self.core.put(&key, unit.content.clone())?;
            debug!(key = %key, bytes = unit.content.len(), "wrote state object");
        }
        Ok(())
    }

    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        for key in self.find_state_files(old_prefix)? {
            let Some(account) = account_from_file_name(old_prefix, &key) else {
                continue;
            };
            let new_key = state_file_name(new_prefix, account);
            self.core.rename_key(&key, &new_key)?;
        }
        Ok(())
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        for key in self.find_state_files(prefix)? {
            self.core.delete(&key)?;
        }
        Ok(())
    }

    fn static_files(&self) -> Arc<dyn StaticFilesSource> {
        Arc::clone(&self.static_files) as Arc<dyn StaticFilesSource>
    }
}

/// Static files stored in the same bucket under `static/<namespace>/`.
struct S3StaticFiles {
    core: Arc<S3Core>,
}

fn static_key(prefix: &str, name: &str) -> String {
    format!("static/{prefix}/{name}")
}

impl StaticFilesSource for S3StaticFiles {
    fn read(&self, prefix: &str, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.core.get(&static_key(prefix, name))
    }

    fn write(&self, prefix: &str, name: &str, data: &[u8]) -> StoreResult<()> {
        self.core.put(&static_key(prefix, name), data.to_vec())
    }

    fn rename(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<()> {
        let old_root = format!("static/{old_prefix}/");
        for key in self.core.list_keys(&old_root)? {
            let Some(rest) = key.strip_prefix(&old_root) else {
                continue;
            };
            self.core.rename_key(&key, &static_key(new_prefix, rest))?;
        }
        Ok(())
    }

    fn clear(&self, prefix: &str) -> StoreResult<()> {
        for key in self.core.list_keys(&format!("static/{prefix}/"))? {
            self.core.delete(&key)?;
        }
        Ok(())
    }
}
