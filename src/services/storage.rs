use crate::config::CloudinaryConfig;
use crate::error::{Error, Result, ValidationErrors};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Where and how an upload is stored.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Folder under the configured root, e.g. `profiles`
    pub folder: String,
    /// Fixed public id; uploads to an existing id overwrite it
    pub public_id: Option<String>,
    pub content_type: String,
    pub file_name: String,
    /// Incoming transformation, e.g. `c_limit,w_800,h_800`
    pub transformation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, options: UploadOptions) -> Result<StoredFile>;

    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Signed uploads through the Cloudinary REST API.
pub struct CloudinaryStorage {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    root_folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryStorage {
    pub fn new(config: &CloudinaryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            root_folder: config.folder.clone(),
        })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/{}",
            self.cloud_name, resource_type, action
        )
    }

    fn folder_path(&self, folder: &str) -> String {
        if folder.is_empty() {
            self.root_folder.clone()
        } else {
            format!("{}/{}", self.root_folder, folder)
        }
    }
}

/// Cloudinary request signature: SHA-256 over the params sorted by key and
/// joined as `k=v&k=v`, followed by the API secret.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn resource_type_for(content_type: &str) -> &'static str {
    if content_type.starts_with("image/") {
        "image"
    } else {
        "raw"
    }
}

#[async_trait]
impl ImageStorage for CloudinaryStorage {
    async fn upload(&self, bytes: Vec<u8>, options: UploadOptions) -> Result<StoredFile> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        params.insert("folder", self.folder_path(&options.folder));
        params.insert("timestamp", timestamp);
        if let Some(public_id) = &options.public_id {
            params.insert("public_id", public_id.clone());
            params.insert("overwrite", "true".to_string());
            params.insert("invalidate", "true".to_string());
        }
        if let Some(transformation) = &options.transformation {
            params.insert("transformation", transformation.clone());
        }

        let signature = sign_params(&params, self.api_secret.expose_secret());

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(options.file_name.clone())
            .mime_str(&options.content_type)
            .map_err(|e| Error::BadRequest(format!("Invalid content type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.endpoint(resource_type_for(&options.content_type), "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!(
                "Cloudinary upload returned {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("Invalid upload response: {}", e)))?;

        tracing::info!(public_id = %uploaded.public_id, "File uploaded to Cloudinary");

        Ok(StoredFile {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", timestamp);
        let signature = sign_params(&params, self.api_secret.expose_secret());

        let mut form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.endpoint("image", "destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "Cloudinary delete returned {}",
                response.status()
            )));
        }

        tracing::info!(public_id = %public_id, "File deleted from Cloudinary");
        Ok(())
    }
}

/// Storage used when Cloudinary is not configured. Every call fails.
#[derive(Debug, Default)]
pub struct DisabledStorage;

#[async_trait]
impl ImageStorage for DisabledStorage {
    async fn upload(&self, _bytes: Vec<u8>, _options: UploadOptions) -> Result<StoredFile> {
        Err(Error::ExternalService("File storage is not configured".to_string()))
    }

    async fn delete(&self, _public_id: &str) -> Result<()> {
        Err(Error::ExternalService("File storage is not configured".to_string()))
    }
}

pub fn build_storage(config: &CloudinaryConfig) -> Result<Arc<dyn ImageStorage>> {
    if config.is_configured() {
        Ok(Arc::new(CloudinaryStorage::new(config)?))
    } else {
        tracing::warn!("Cloudinary is not configured, uploads are disabled");
        Ok(Arc::new(DisabledStorage))
    }
}

/// Recovers the public id from a delivery URL: the path after `/upload/`,
/// without the `v<digits>/` version segment and the file extension.
pub fn extract_public_id(delivery_url: &str) -> Option<String> {
    let parsed = url::Url::parse(delivery_url).ok()?;
    let (_, rest) = parsed.path().split_once("/upload/")?;

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(first) = segments.first() {
        let is_version = first.len() > 1
            && first.starts_with('v')
            && first[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            segments.remove(0);
        }
    }

    let last = segments.pop()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => last,
    };
    segments.push(stem);

    Some(segments.join("/"))
}

/// Content types accepted for identification documents.
pub const DOCUMENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "application/pdf"];

/// Upload size limit for documents and profile images.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file read from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    fn check_size(&self, field: &str) -> Result<()> {
        if self.bytes.is_empty() {
            return Err(Error::Validation(ValidationErrors::field(field, "Uploaded file is empty")));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(Error::PayloadTooLarge(format!(
                "File exceeds the {} MB limit",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }
        Ok(())
    }

    /// Identification documents: JPEG, PNG, GIF or PDF.
    pub fn validate_document(&self, field: &str) -> Result<()> {
        if !DOCUMENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(Error::Validation(ValidationErrors::field(
                field,
                "Only JPEG, PNG, GIF and PDF files are allowed",
            )));
        }
        self.check_size(field)
    }

    pub fn validate_image(&self, field: &str) -> Result<()> {
        if !self.content_type.starts_with("image/") {
            return Err(Error::Validation(ValidationErrors::field(
                field,
                "Only image files are allowed",
            )));
        }
        self.check_size(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_public_id_with_version() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1712345678/nannys-lm/profiles/profile_abc.jpg";
        assert_eq!(
            extract_public_id(url).as_deref(),
            Some("nannys-lm/profiles/profile_abc")
        );
    }

    #[test]
    fn test_extract_public_id_ignores_query_string() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1/nannys-lm/profiles/p.png?_a=BAMAK";
        assert_eq!(extract_public_id(url).as_deref(), Some("nannys-lm/profiles/p"));
    }

    #[test]
    fn test_extract_public_id_without_version() {
        let url = "https://res.cloudinary.com/demo/image/upload/nannys-lm/identifications/doc.pdf";
        assert_eq!(
            extract_public_id(url).as_deref(),
            Some("nannys-lm/identifications/doc")
        );
    }

    #[test]
    fn test_extract_public_id_rejects_foreign_urls() {
        assert_eq!(extract_public_id("https://example.com/avatar.png"), None);
        assert_eq!(extract_public_id("not a url/upload/x.png"), None);
        assert_eq!(extract_public_id("https://res.cloudinary.com/demo/image/upload/"), None);
    }

    #[test]
    fn test_sign_params_sorts_keys() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());

        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(
                b"eager=w_400,h_300,c_pad|w_260,h_200,c_crop&public_id=sample_image&timestamp=1315060510abcd",
            );
            hex::encode(hasher.finalize())
        };

        assert_eq!(sign_params(&params, "abcd"), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_resource_type_for_documents() {
        assert_eq!(resource_type_for("image/png"), "image");
        assert_eq!(resource_type_for("application/pdf"), "raw");
    }

    fn upload(content_type: &str, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: "file".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn test_document_validation() {
        assert!(upload("application/pdf", 10).validate_document("doc").is_ok());
        assert!(upload("image/gif", 10).validate_document("doc").is_ok());
        assert!(matches!(
            upload("text/plain", 10).validate_document("doc"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            upload("image/png", MAX_UPLOAD_BYTES + 1).validate_document("doc"),
            Err(Error::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_image_validation_rejects_pdf() {
        assert!(upload("image/webp", 10).validate_image("profile_image").is_ok());
        assert!(upload("application/pdf", 10).validate_image("profile_image").is_err());
        assert!(upload("image/png", 0).validate_image("profile_image").is_err());
    }

    #[tokio::test]
    async fn test_disabled_storage_fails_with_external_service() {
        let storage = DisabledStorage;
        let result = storage.upload(vec![1, 2, 3], UploadOptions::default()).await;
        assert!(matches!(result, Err(Error::ExternalService(_))));
    }
}
