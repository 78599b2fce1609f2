//! Decoding through a remote conversion service.

use super::{BoxFuture, DecodeBackend};
use crate::cancel::CancelToken;
use crate::error::{NdocError, Result, Stage};
use crate::result::{SerializedEnvelope, SerializedResult};
use crate::source::ByteSource;
use reqwest::multipart::{Form, Part};
use tracing::{Instrument, debug, info_span};

/// Multipart field carrying the container.
pub const UPLOAD_FIELD: &str = "file";

/// Posts the container to a conversion service and returns the
/// `serializedData` it answers with, unchanged.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteBackend {
    /// Create a backend posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create a backend with a preconfigured client.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Service URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, source: ByteSource, cancel: &CancelToken) -> Result<SerializedResult> {
        cancel.check(Stage::Source)?;
        let file_name = source
            .path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.ndoc".to_string());
        let bytes = source.read().await?;
        debug!(len = bytes.len(), %file_name, "uploading container");

        cancel.check(Stage::Remote)?;
        let form = Form::new().part(UPLOAD_FIELD, Part::bytes(bytes).file_name(file_name));
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NdocError::remote(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NdocError::remote(format!("service answered {}: {}", status, body)));
        }

        let envelope: SerializedEnvelope = response
            .json()
            .await
            .map_err(|e| NdocError::remote(format!("invalid response body: {}", e)))?;
        debug!(len = envelope.serialized_data.len(), "remote decode complete");
        Ok(envelope.into())
    }
}

impl DecodeBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn decode<'a>(
        &'a self,
        source: ByteSource,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<SerializedResult>> {
        let span = info_span!("remote_decode", endpoint = %self.endpoint);
        Box::pin(self.post(source, cancel).instrument(span))
    }
}
