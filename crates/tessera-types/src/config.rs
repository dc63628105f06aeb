use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage backend selection for durable workspace state.
///
/// Unknown provider names fail deserialization with a descriptive error
/// listing the supported values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local filesystem under a workspace-local directory.
    File,
    /// Remote object storage (S3-compatible bucket).
    S3,
}

impl ProviderKind {
    /// The configuration name of this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::File => "file",
            ProviderKind::S3 => "s3",
        }
    }
}

/// Options for the local filesystem backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStateOptions {
    /// Directory holding the workspace's durable state files.
    pub local_storage_dir: PathBuf,
}

/// Options for the S3 backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3StateOptions {
    /// Bucket holding the workspace's durable state objects.
    pub bucket: String,
    /// Key prefix inside the bucket. Defaults to the workspace id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Per-backend option blocks. Only the block matching the selected provider
/// is consulted; a missing block for the selected provider is a
/// configuration error raised before any I/O.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileStateOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3StateOptions>,
}

/// Storage backend configuration for one workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub options: ProviderOptions,
}

impl StateConfig {
    /// A file-backend configuration rooted at the given directory.
    pub fn file(local_storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider: ProviderKind::File,
            options: ProviderOptions {
                file: Some(FileStateOptions {
                    local_storage_dir: local_storage_dir.into(),
                }),
                s3: None,
            },
        }
    }

    /// An S3-backend configuration for the given bucket.
    pub fn s3(bucket: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            provider: ProviderKind::S3,
            options: ProviderOptions {
                file: None,
                s3: Some(S3StateOptions {
                    bucket: bucket.into(),
                    prefix,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_roundtrip() {
        let config = StateConfig::file("/workspaces/acme/state");
        let json = serde_json::to_string(&config).unwrap();
        let back: StateConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.provider, ProviderKind::File);
    }

    #[test]
    fn s3_config_roundtrip() {
        let config = StateConfig::s3("acme-state", Some("envs/prod".to_string()));
        let json = serde_json::to_string(&config).unwrap();
        let back: StateConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn provider_names_are_lowercase() {
        let json = serde_json::to_string(&ProviderKind::S3).unwrap();
        assert_eq!(json, "\"s3\"");
        let json = serde_json::to_string(&ProviderKind::File).unwrap();
        assert_eq!(json, "\"file\"");
    }

    #[test]
    fn unknown_provider_fails_descriptively() {
        let err = serde_json::from_str::<StateConfig>(r#"{"provider": "gcs"}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("gcs"));
        assert!(message.contains("file") && message.contains("s3"));
    }

    #[test]
    fn options_default_to_empty() {
        let config: StateConfig = serde_json::from_str(r#"{"provider": "file"}"#).unwrap();
        assert!(config.options.file.is_none());
        assert!(config.options.s3.is_none());
    }
}
