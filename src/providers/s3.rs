use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use std::collections::HashMap;
use std::sync::Arc;

use aws_credential_types::provider::ProvideCredentials;

use crate::error::{Error, Result};

const BACKEND: &str = "s3";

/// Configuration for creating an S3 object store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
    /// Optional custom endpoint URL (S3-compatible services)
    pub endpoint_url: Option<String>,
    /// Skip request signing (public buckets)
    pub anonymous: bool,
}

impl S3Config {
    /// Read the S3 keys of a dataset's credentials mapping.
    ///
    /// Recognized keys: `key`, `secret`, `token`, `region`, `endpoint_url`,
    /// `anonymous`.
    pub fn from_credentials(credentials: &HashMap<String, String>) -> Result<Self> {
        let anonymous = match credentials.get("anonymous").map(String::as_str) {
            None => false,
            Some(value) => value.parse::<bool>().map_err(|_| {
                Error::Config(format!("credential 'anonymous' must be true or false, got '{value}'"))
            })?,
        };

        let config = S3Config {
            access_key_id: credentials.get("key").cloned(),
            secret_access_key: credentials.get("secret").cloned(),
            session_token: credentials.get("token").cloned(),
            region: credentials.get("region").cloned(),
            endpoint_url: credentials.get("endpoint_url").cloned(),
            anonymous,
        };

        if config.access_key_id.is_some() != config.secret_access_key.is_some() {
            return Err(Error::Config(
                "credentials 'key' and 'secret' must be given together".to_string(),
            ));
        }
        Ok(config)
    }

    fn has_static_keys(&self) -> bool {
        self.access_key_id.is_some()
    }
}

/// Build an object store for `bucket`.
///
/// Without static keys (and not anonymous) the AWS default provider chain is
/// consulted: environment, `~/.aws` profiles, instance roles.
pub async fn create_object_store(bucket: &str, config: S3Config) -> Result<Arc<dyn ObjectStore>> {
    let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);
    let mut region = config.region.clone();

    if config.anonymous {
        builder = builder.with_skip_signature(true);
    } else if config.has_static_keys() {
        if let Some(key) = &config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(token) = &config.session_token {
            builder = builder.with_token(token);
        }
    } else {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        region = region.or_else(|| sdk_config.region().map(|r| r.as_ref().to_string()));

        let credentials = sdk_config
            .credentials_provider()
            .ok_or_else(|| Error::Config("no AWS credentials provider configured".to_string()))?
            .provide_credentials()
            .await
            .map_err(|e| Error::transport(BACKEND, e))?;

        builder = builder
            .with_access_key_id(credentials.access_key_id())
            .with_secret_access_key(credentials.secret_access_key());
        if let Some(token) = credentials.session_token() {
            builder = builder.with_token(token);
        }
    }

    let region = region.unwrap_or_else(|| {
        tracing::warn!("no AWS region configured, falling back to us-west-2");
        "us-west-2".to_string()
    });
    builder = builder.with_region(region);

    if let Some(endpoint) = &config.endpoint_url {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(endpoint.starts_with("http://"));
    }

    let store = builder.build().map_err(|e| Error::transport(BACKEND, e))?;
    Ok(Arc::new(store))
}
