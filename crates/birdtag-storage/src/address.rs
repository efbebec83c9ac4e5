//! Conversion between internal storage URIs and external addresses.
//!
//! Internal form is always `s3://bucket/key`. External forms are either a
//! deterministic public address (display only, no access guarantee) or a freshly
//! signed, time-limited GET URL.

use std::sync::Arc;
use std::time::Duration;

use birdtag_core::{AppError, StorageUri};

use crate::traits::Storage;

const AWS_HOST_SUFFIX: &str = ".amazonaws.com";

/// Base of the public (non-expiring) address space of a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicEndpoint {
    /// Virtual-hosted AWS addresses: `https://{bucket}.s3.{region}.amazonaws.com/{key}`
    Aws { region: String },
    /// Path-style addresses under a custom endpoint: `{base_url}/{bucket}/{key}`
    PathStyle { base_url: String },
}

impl PublicEndpoint {
    pub fn format(&self, uri: &StorageUri) -> String {
        let key = encode_key(&uri.key);
        match self {
            PublicEndpoint::Aws { region } => {
                format!("https://{}.s3.{}.amazonaws.com/{}", uri.bucket, region, key)
            }
            PublicEndpoint::PathStyle { base_url } => {
                format!("{}/{}/{}", base_url.trim_end_matches('/'), uri.bucket, key)
            }
        }
    }
}

/// How an internal URI should be rendered for a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Public,
    Signed,
}

/// Bidirectional mapping between `s3://bucket/key` and external addresses.
#[derive(Clone)]
pub struct AddressNormalizer {
    storage: Arc<dyn Storage>,
    signed_ttl: Duration,
}

impl AddressNormalizer {
    pub fn new(storage: Arc<dyn Storage>, signed_ttl: Duration) -> Self {
        Self {
            storage,
            signed_ttl,
        }
    }

    pub fn signed_ttl(&self) -> Duration {
        self.signed_ttl
    }

    pub async fn to_external(&self, uri: &StorageUri, mode: AddressMode) -> Result<String, AppError> {
        match mode {
            AddressMode::Public => Ok(self.public_address(uri)),
            AddressMode::Signed => self.signed_address(uri).await,
        }
    }

    pub fn public_address(&self, uri: &StorageUri) -> String {
        self.storage.public_endpoint().format(uri)
    }

    /// Generates a new signed GET URL. Never cached.
    pub async fn signed_address(&self, uri: &StorageUri) -> Result<String, AppError> {
        self.storage
            .presigned_get_url(uri, self.signed_ttl)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, uri = %uri, "Failed to sign address");
                AppError::SigningError(e.to_string())
            })
    }

    /// Parses any accepted external address back to its internal URI.
    ///
    /// Accepts `s3://` URIs, AWS virtual-hosted and path-style HTTPS addresses and
    /// path-style addresses under the backend's custom endpoint. Query strings are
    /// ignored so signed URLs resolve to the object they grant access to.
    pub fn from_external(&self, address: &str) -> Result<StorageUri, AppError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AppError::MalformedAddress("Address is empty".to_string()));
        }

        if trimmed.starts_with("s3://") {
            return trimmed.parse();
        }

        let without_query = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or(trimmed);

        if let PublicEndpoint::PathStyle { base_url } = self.storage.public_endpoint() {
            let base = base_url.trim_end_matches('/');
            if let Some(rest) = without_query.strip_prefix(base) {
                if let Some(path) = rest.strip_prefix('/') {
                    return split_bucket_and_key(path, address);
                }
            }
        }

        let rest = without_query
            .strip_prefix("https://")
            .or_else(|| without_query.strip_prefix("http://"))
            .ok_or_else(|| {
                AppError::MalformedAddress(format!("Unrecognized address scheme: {}", address))
            })?;

        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = host.to_lowercase();
        let aws_host = host.strip_suffix(AWS_HOST_SUFFIX).ok_or_else(|| {
            AppError::MalformedAddress(format!("Unrecognized storage host: {}", host))
        })?;

        // Virtual-hosted: {bucket}.s3[.-{region}].amazonaws.com. Bucket names may
        // themselves start with "s3.", so the bucket label is looked for first.
        if let Some(bucket) = virtual_hosted_bucket(aws_host) {
            let key = decode_key(path, address)?;
            return Ok(StorageUri::new(bucket, key));
        }

        // Path-style: s3.amazonaws.com, s3.{region}.amazonaws.com, s3-{region}.amazonaws.com
        if aws_host == "s3" || aws_host.starts_with("s3.") || aws_host.starts_with("s3-") {
            return split_bucket_and_key(path, address);
        }

        Err(AppError::MalformedAddress(format!(
            "Unrecognized storage host: {}",
            host
        )))
    }
}

fn virtual_hosted_bucket(aws_host: &str) -> Option<&str> {
    let idx = aws_host.rfind(".s3")?;
    let after = &aws_host[idx + 3..];
    if !(after.is_empty() || after.starts_with('.') || after.starts_with('-')) {
        return None;
    }
    let bucket = &aws_host[..idx];
    (!bucket.is_empty()).then_some(bucket)
}

fn split_bucket_and_key(path: &str, original: &str) -> Result<StorageUri, AppError> {
    let (bucket, key) = path
        .split_once('/')
        .ok_or_else(|| AppError::MalformedAddress(format!("Missing object key: {}", original)))?;
    if bucket.is_empty() {
        return Err(AppError::MalformedAddress(format!("Missing bucket: {}", original)));
    }
    let key = decode_key(key, original)?;
    Ok(StorageUri::new(bucket, key))
}

fn decode_key(raw: &str, original: &str) -> Result<String, AppError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| AppError::MalformedAddress(format!("Invalid percent-encoding: {}", original)))?;
    if decoded.is_empty() {
        return Err(AppError::MalformedAddress(format!("Missing object key: {}", original)));
    }
    Ok(decoded.into_owned())
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{StorageError, StorageResult};
    use crate::StorageBackend;
    use async_trait::async_trait;

    struct FakeStorage {
        endpoint: PublicEndpoint,
        fail_signing: bool,
    }

    #[async_trait]
    impl Storage for FakeStorage {
        async fn delete(&self, _location: &StorageUri) -> StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, _location: &StorageUri) -> StorageResult<bool> {
            Ok(true)
        }

        async fn presigned_get_url(
            &self,
            location: &StorageUri,
            expires_in: Duration,
        ) -> StorageResult<String> {
            if self.fail_signing {
                return Err(StorageError::SigningFailed("no credentials".to_string()));
            }
            Ok(format!(
                "{}?X-Amz-Expires={}",
                self.endpoint.format(location),
                expires_in.as_secs()
            ))
        }

        fn public_endpoint(&self) -> &PublicEndpoint {
            &self.endpoint
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    fn aws_normalizer() -> AddressNormalizer {
        AddressNormalizer::new(
            Arc::new(FakeStorage {
                endpoint: PublicEndpoint::Aws {
                    region: "us-east-1".to_string(),
                },
                fail_signing: false,
            }),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_public_round_trip() {
        let normalizer = aws_normalizer();
        for key in ["crow.jpg", "thumbnails/crow-thumb.jpg", "uploads/my bird (1).png"] {
            let uri = StorageUri::new("birdtag-media", key);
            let external = normalizer.to_external(&uri, AddressMode::Public).await.unwrap();
            assert_eq!(normalizer.from_external(&external).unwrap(), uri);
        }
    }

    #[tokio::test]
    async fn test_path_style_round_trip() {
        let normalizer = AddressNormalizer::new(
            Arc::new(FakeStorage {
                endpoint: PublicEndpoint::PathStyle {
                    base_url: "http://localhost:9000/".to_string(),
                },
                fail_signing: false,
            }),
            Duration::from_secs(60),
        );
        let uri = StorageUri::new("media", "a/b/crow.mp4");
        let external = normalizer.public_address(&uri);
        assert_eq!(external, "http://localhost:9000/media/a/b/crow.mp4");
        assert_eq!(normalizer.from_external(&external).unwrap(), uri);
    }

    #[test]
    fn test_from_external_accepted_forms() {
        let normalizer = aws_normalizer();
        let expected = StorageUri::new("bucket", "dir/crow.jpg");
        for address in [
            "s3://bucket/dir/crow.jpg",
            "https://bucket.s3.amazonaws.com/dir/crow.jpg",
            "https://bucket.s3.ap-southeast-2.amazonaws.com/dir/crow.jpg",
            "https://bucket.s3-us-west-2.amazonaws.com/dir/crow.jpg",
            "https://s3.us-east-1.amazonaws.com/bucket/dir/crow.jpg",
            "https://bucket.s3.amazonaws.com/dir/crow.jpg?X-Amz-Signature=abc",
        ] {
            assert_eq!(normalizer.from_external(address).unwrap(), expected, "{}", address);
        }
    }

    #[test]
    fn test_bucket_named_like_path_style_host() {
        let normalizer = aws_normalizer();
        let uri = StorageUri::new("s3.photos", "crow.jpg");
        assert_eq!(
            normalizer
                .from_external("https://s3.photos.s3.us-east-1.amazonaws.com/crow.jpg")
                .unwrap(),
            uri
        );
        assert_eq!(
            normalizer.from_external(&normalizer.public_address(&uri)).unwrap(),
            uri
        );
    }

    #[test]
    fn test_from_external_rejects_malformed() {
        let normalizer = aws_normalizer();
        for address in [
            "",
            "ftp://bucket/key",
            "https://example.com/bucket/key",
            "https://bucket.s3.amazonaws.com/",
            "s3://bucket",
        ] {
            let err = normalizer.from_external(address).unwrap_err();
            assert!(matches!(err, AppError::MalformedAddress(_)), "{}", address);
        }
    }

    #[tokio::test]
    async fn test_signed_address_is_fresh_and_bounded() {
        let normalizer = aws_normalizer();
        let uri = StorageUri::new("bucket", "crow.jpg");
        let signed = normalizer.to_external(&uri, AddressMode::Signed).await.unwrap();
        assert!(signed.contains("X-Amz-Expires=3600"));
        assert_eq!(normalizer.from_external(&signed).unwrap(), uri);
    }

    #[tokio::test]
    async fn test_signing_failure_propagates() {
        let normalizer = AddressNormalizer::new(
            Arc::new(FakeStorage {
                endpoint: PublicEndpoint::Aws {
                    region: "us-east-1".to_string(),
                },
                fail_signing: true,
            }),
            Duration::from_secs(3600),
        );
        let err = normalizer
            .to_external(&StorageUri::new("b", "k"), AddressMode::Signed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SigningError(_)));
    }
}
