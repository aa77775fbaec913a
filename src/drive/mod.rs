//! Optional upload of the digest to Google Drive as a Google Doc
//!
//! The document lands in `{folder_name}/{YYYY-MM-DD}`; both folders are
//! created on first use. Only the Drive v3 and Docs v1 endpoints the upload
//! needs are implemented.

pub mod auth;

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DriveConfig;
use crate::utils::error::UploadError;

use self::auth::{ClientSecrets, StoredToken};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Whether an upload can be attempted this run
#[derive(Debug, Clone, PartialEq)]
pub enum DriveAvailability {
    /// `--no-drive` was given
    DisabledByFlag,
    /// `drive.enabled` is false
    DisabledInConfig,
    /// Enabled but the client secrets file is absent
    MissingClientSecrets(PathBuf),
    Ready(DriveCredentials),
}

/// What authorization has to work with
#[derive(Debug, Clone, PartialEq)]
pub struct DriveCredentials {
    pub secrets: Option<ClientSecrets>,
    pub stored: Option<StoredToken>,
    pub token_path: PathBuf,
}

impl DriveAvailability {
    /// Decide from configuration, the command-line flag and the files on disk
    ///
    /// A stored token is enough on its own; the secrets file is only needed
    /// when there is none. Unreadable files are logged and treated as absent.
    pub fn check(config: &DriveConfig, drive_flag: bool, token_path: &Path) -> Self {
        if !drive_flag {
            return Self::DisabledByFlag;
        }
        if !config.enabled {
            return Self::DisabledInConfig;
        }

        let secrets = match ClientSecrets::from_file(&config.credentials_file) {
            Ok(secrets) => Some(secrets),
            Err(UploadError::MissingClientSecrets(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable client secrets");
                None
            }
        };

        let stored = StoredToken::load(token_path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unreadable token file");
            None
        });

        if secrets.is_none() && stored.is_none() {
            return Self::MissingClientSecrets(config.credentials_file.clone());
        }

        Self::Ready(DriveCredentials {
            secrets,
            stored,
            token_path: token_path.to_path_buf(),
        })
    }

    /// Log why the upload is skipped, if it is
    pub fn log_skip_reason(&self) {
        match self {
            Self::DisabledByFlag => tracing::info!("Drive upload disabled by --no-drive"),
            Self::DisabledInConfig => tracing::info!("Drive upload disabled in config"),
            Self::MissingClientSecrets(path) => tracing::warn!(
                path = %path.display(),
                "Drive upload enabled but client secrets are missing, skipping"
            ),
            Self::Ready(_) => {}
        }
    }
}

/// Created document and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub document_id: String,
    pub folder_id: String,
}

impl UploadedDocument {
    pub fn url(&self) -> String {
        document_url(&self.document_id)
    }
}

/// Browser URL for a Google Doc
pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{document_id}/edit")
}

/// Quote a value for a Drive `q` expression
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRef {
    document_id: String,
}

/// Authorized Drive and Docs client
pub struct DriveClient {
    client: Client,
    access_token: String,
    drive_base: String,
    docs_base: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig, access_token: String, timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            access_token,
            drive_base: config.drive_base_url.trim_end_matches('/').to_string(),
            docs_base: config.docs_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        api: &'static str,
        request: RequestBuilder,
    ) -> Result<T, UploadError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Api {
                api,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Id of the folder `name` under `parent` (or anywhere), created if missing
    pub async fn ensure_folder(&self, name: &str, parent: Option<&str>) -> Result<String, UploadError> {
        let mut q = format!(
            "mimeType='{FOLDER_MIME}' and name='{}' and trashed=false",
            escape_query(name)
        );
        if let Some(parent) = parent {
            q.push_str(&format!(" and '{}' in parents", escape_query(parent)));
        }

        let url = format!("{}/drive/v3/files", self.drive_base);
        let list: FileList = Self::send_json(
            "Drive",
            self.request(Method::GET, &url)
                .query(&[("q", q.as_str()), ("fields", "files(id,name)")]),
        )
        .await?;

        if let Some(existing) = list.files.into_iter().next() {
            tracing::debug!(folder = %name, id = %existing.id, "Found Drive folder");
            return Ok(existing.id);
        }

        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let created: FileRef = Self::send_json(
            "Drive",
            self.request(Method::POST, &url)
                .query(&[("fields", "id")])
                .json(&metadata),
        )
        .await?;

        tracing::info!(folder = %name, id = %created.id, "Created Drive folder");
        Ok(created.id)
    }

    /// New Google Doc titled `title` holding `text`
    pub async fn create_document(&self, title: &str, text: &str) -> Result<String, UploadError> {
        let url = format!("{}/v1/documents", self.docs_base);
        let doc: DocumentRef = Self::send_json(
            "Docs",
            self.request(Method::POST, &url).json(&json!({ "title": title })),
        )
        .await?;

        let update_url = format!("{}/v1/documents/{}:batchUpdate", self.docs_base, doc.document_id);
        let body = json!({
            "requests": [
                { "insertText": { "location": { "index": 1 }, "text": text } }
            ]
        });
        let _: Value = Self::send_json("Docs", self.request(Method::POST, &update_url).json(&body)).await?;

        Ok(doc.document_id)
    }

    /// Add `folder_id` to the parents of `file_id`
    pub async fn move_into(&self, file_id: &str, folder_id: &str) -> Result<(), UploadError> {
        let url = format!("{}/drive/v3/files/{}", self.drive_base, file_id);
        let _: Value = Self::send_json(
            "Drive",
            self.request(Method::PATCH, &url)
                .query(&[("addParents", folder_id), ("fields", "id,parents")])
                .json(&json!({})),
        )
        .await?;
        Ok(())
    }

    /// Upload a saved digest into `{root_folder}/{date}`
    ///
    /// The document title is the file stem of `path`.
    pub async fn upload_digest(
        &self,
        path: &Path,
        text: &str,
        root_folder: &str,
        date: &str,
    ) -> Result<UploadedDocument, UploadError> {
        let root_id = self.ensure_folder(root_folder, None).await?;
        let folder_id = self.ensure_folder(date, Some(&root_id)).await?;

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("reddit_digest"));

        let document_id = self.create_document(&title, text).await?;
        self.move_into(&document_id, &folder_id).await?;

        tracing::info!(document = %document_id, folder = %folder_id, "Uploaded digest");
        Ok(UploadedDocument {
            document_id,
            folder_id,
        })
    }
}
