/// Connection settings for the evidence bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    pub endpoint: Option<String>,
    /// Static credentials; the default AWS provider chain is used when absent.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

const DEFAULT_REGION: &str = "us-east-1";

impl StorageConfig {
    /// Load storage settings from environment variables.
    ///
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `S3_BUCKET`            | (required)  |
    /// | `S3_REGION`            | `us-east-1` |
    /// | `S3_ENDPOINT`          | none        |
    /// | `S3_ACCESS_KEY_ID`     | none        |
    /// | `S3_SECRET_ACCESS_KEY` | none        |
    /// | `S3_FORCE_PATH_STYLE`  | `true` when `S3_ENDPOINT` is set |
    ///
    /// Returns `None` when no bucket is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bucket = get("S3_BUCKET")?;
        let endpoint = get("S3_ENDPOINT");
        let force_path_style = match get("S3_FORCE_PATH_STYLE").as_deref() {
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => {
                tracing::warn!(value = other, "Invalid S3_FORCE_PATH_STYLE, using default");
                endpoint.is_some()
            }
            None => endpoint.is_some(),
        };

        Some(Self {
            bucket,
            region: get("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint,
            access_key_id: get("S3_ACCESS_KEY_ID"),
            secret_access_key: get("S3_SECRET_ACCESS_KEY"),
            force_path_style,
        })
    }
}
