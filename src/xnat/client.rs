//! XNAT REST backend.
//!
//! Opens a JSESSION with basic auth and sends the session id as a cookie on
//! every subsequent request.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{
    RemoteExperiment, RemoteProject, RemoteScan, RemoteSubject, Resource, ResourceContainer, SessionKind,
    XnatApi,
};
use crate::config::XnatConfig;
use crate::error::{XnatError, XnatResult};

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Listing envelope: `{"ResultSet": {"Result": [...]}}`.
#[derive(Debug, Deserialize)]
struct ResultSetEnvelope<T> {
    #[serde(rename = "ResultSet")]
    result_set: ResultSet<T>,
}

#[derive(Debug, Deserialize)]
struct ResultSet<T> {
    #[serde(rename = "Result", default = "Vec::new")]
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SubjectRow {
    #[serde(rename = "ID")]
    id: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct ExperimentRow {
    #[serde(rename = "ID")]
    id: String,
    label: String,
    #[serde(rename = "xsiType", default)]
    xsi_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScanRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "type", default)]
    scan_type: Option<String>,
    #[serde(rename = "xsiType", alias = "xsi_type", default)]
    xsi_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceRow {
    #[serde(default)]
    label: Option<String>,
}

pub struct XnatClient {
    http: reqwest::Client,
    base: Url,
    session_id: String,
}

impl XnatClient {
    /// Authenticates against `cfg.url` and keeps the returned session.
    pub async fn connect(cfg: &XnatConfig, credentials: &Credentials) -> XnatResult<Self> {
        let base = Url::parse(cfg.url.trim()).map_err(|e| XnatError::Url(format!("{}: {}", cfg.url, e)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(concat!("bids-uploader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let connection_error = |message: String| XnatError::Connection {
            url: cfg.url.clone(),
            message,
        };

        let url = join_uri(&base, "/data/JSESSION", &[])?;
        let resp = http
            .post(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(connection_error(format!("authentication failed with status {}", resp.status())));
        }
        let session_id = resp
            .text()
            .await
            .map_err(|e| connection_error(e.to_string()))?
            .trim()
            .to_string();
        if session_id.is_empty() {
            return Err(connection_error("server returned an empty session id".into()));
        }

        info!(url = %cfg.url, user = %credentials.username, "Connected to XNAT instance");
        Ok(Self { http, base, session_id })
    }

    /// Invalidates the server-side session.
    pub async fn disconnect(&self) -> XnatResult<()> {
        self.send(Method::DELETE, "/data/JSESSION", &[]).await?;
        debug!("XNAT session closed");
        Ok(())
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(COOKIE, format!("JSESSIONID={}", self.session_id))
    }

    async fn send(&self, method: Method, uri: &str, query: &[(&str, &str)]) -> XnatResult<Response> {
        let url = join_uri(&self.base, uri, query)?;
        let resp = self.request(method.clone(), url).send().await?;
        check_status(resp, method, uri).await
    }

    async fn list<T: DeserializeOwned>(&self, uri: &str) -> XnatResult<Vec<T>> {
        let resp = self.send(Method::GET, uri, &[("format", "json")]).await?;
        let envelope: ResultSetEnvelope<T> = resp.json().await?;
        Ok(envelope.result_set.result)
    }

    /// PUTs `uri` and returns the response body, which XNAT fills with the
    /// id of a newly created object.
    async fn put(&self, uri: &str, query: &[(&str, &str)]) -> XnatResult<String> {
        let resp = self.send(Method::PUT, uri, query).await?;
        Ok(resp.text().await?.trim().to_string())
    }
}

/// Appends the `/`-separated `uri` to `base` segment by segment so labels
/// are percent-encoded.
fn join_uri(base: &Url, uri: &str, query: &[(&str, &str)]) -> XnatResult<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| XnatError::Url(format!("{} cannot be a base url", base)))?;
        segments.pop_if_empty();
        for seg in uri.split('/').filter(|s| !s.is_empty()) {
            segments.push(seg);
        }
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

async fn check_status(resp: Response, method: Method, uri: &str) -> XnatResult<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(XnatError::Status {
        method: method.to_string(),
        uri: uri.to_string(),
        status,
        body,
    })
}

/// Uses the id from a creation response, or `fallback` when the server sent
/// none.
fn created_id(body: String, fallback: &str) -> String {
    if body.is_empty() || body.contains('<') {
        fallback.to_string()
    } else {
        body
    }
}

#[async_trait]
impl XnatApi for XnatClient {
    async fn find_project(&self, id: &str) -> XnatResult<RemoteProject> {
        let project = RemoteProject::new(id);
        match self.send(Method::GET, &project.uri, &[("format", "json")]).await {
            Ok(_) => Ok(project),
            Err(XnatError::Status { status: 403 | 404, .. }) => Err(XnatError::ProjectNotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn list_subjects(&self, project: &RemoteProject) -> XnatResult<Vec<RemoteSubject>> {
        let rows: Vec<SubjectRow> = self.list(&format!("{}/subjects", project.uri)).await?;
        Ok(rows
            .into_iter()
            .map(|r| RemoteSubject::new(project, r.id, r.label))
            .collect())
    }

    async fn list_experiments(&self, subject: &RemoteSubject) -> XnatResult<Vec<RemoteExperiment>> {
        let rows: Vec<ExperimentRow> = self.list(&format!("{}/experiments", subject.uri)).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let kind = r.xsi_type.as_deref().and_then(SessionKind::from_xsi_type);
                RemoteExperiment::new(subject, r.id, r.label, kind)
            })
            .collect())
    }

    async fn list_scans(&self, experiment: &RemoteExperiment) -> XnatResult<Vec<RemoteScan>> {
        let rows: Vec<ScanRow> = self.list(&format!("{}/scans", experiment.uri)).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let kind = r.xsi_type.as_deref().and_then(SessionKind::from_xsi_type);
                RemoteScan::new(experiment, r.id, r.scan_type.unwrap_or_default(), kind)
            })
            .collect())
    }

    async fn list_resources(&self, container: &dyn ResourceContainer) -> XnatResult<Vec<Resource>> {
        let rows: Vec<ResourceRow> = self.list(&format!("{}/resources", container.uri())).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.label)
            .map(|label| Resource::new(container, label))
            .collect())
    }

    async fn create_subject(&self, project: &RemoteProject, label: &str) -> XnatResult<RemoteSubject> {
        let subject = RemoteSubject::new(project, label, label);
        let body = self.put(&subject.uri, &[]).await?;
        info!(project = %project.id, subject = %label, "Created subject");
        Ok(RemoteSubject { id: created_id(body, label), ..subject })
    }

    async fn create_experiment(
        &self,
        subject: &RemoteSubject,
        label: &str,
        kind: SessionKind,
    ) -> XnatResult<RemoteExperiment> {
        let experiment = RemoteExperiment::new(subject, label, label, Some(kind));
        let body = self.put(&experiment.uri, &[("xsiType", kind.session_xsi_type())]).await?;
        info!(subject = %subject.label, experiment = %label, xsi_type = kind.session_xsi_type(), "Created experiment");
        Ok(RemoteExperiment { id: created_id(body, label), ..experiment })
    }

    async fn create_scan(
        &self,
        experiment: &RemoteExperiment,
        sequence_id: u32,
        scan_type: &str,
        kind: SessionKind,
    ) -> XnatResult<RemoteScan> {
        let scan = RemoteScan::new(experiment, sequence_id.to_string(), scan_type, Some(kind));
        let type_key = format!("{}/type", kind.scan_xsi_type());
        self.put(
            &scan.uri,
            &[("xsiType", kind.scan_xsi_type()), (type_key.as_str(), scan_type)],
        )
        .await?;
        info!(experiment = %experiment.label, scan = %scan.id, scan_type, "Created scan");
        Ok(scan)
    }

    async fn create_resource(&self, container: &dyn ResourceContainer, label: &str) -> XnatResult<Resource> {
        let resource = Resource::new(container, label);
        self.put(&resource.uri, &[]).await?;
        debug!(container = %container.describe(), resource = %label, "Created resource");
        Ok(resource)
    }

    async fn upload_file(&self, resource: &Resource, local_path: &Path, remote_name: &str) -> XnatResult<()> {
        let upload_error = |message: String| XnatError::Upload {
            path: local_path.to_path_buf(),
            message,
        };
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        let len = file.metadata().await.map_err(|e| upload_error(e.to_string()))?.len();

        let uri = resource.file_uri(remote_name);
        let url = join_uri(&self.base, &uri, &[("overwrite", "true"), ("inbody", "true")])?;
        let resp = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, len)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;
        check_status(resp, Method::PUT, &uri).await?;
        debug!(target_uri = %uri, bytes = len, "Uploaded file");
        Ok(())
    }
}
