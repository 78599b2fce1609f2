//! Decode backends.
//!
//! A backend turns a container into a [`SerializedResult`]. The in-process
//! [`LocalBackend`] runs the pipeline directly; with the `remote` feature,
//! `RemoteBackend` delegates to a conversion service over HTTP.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::options::DecodeOptions;
use crate::pipeline::Pipeline;
use crate::result::SerializedResult;
use crate::source::ByteSource;
use std::future::Future;
use std::pin::Pin;

#[cfg(feature = "remote")]
mod remote;

#[cfg(feature = "remote")]
pub use remote::RemoteBackend;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can decode a container.
pub trait DecodeBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decode `source`, stopping early if `cancel` fires.
    fn decode<'a>(
        &'a self,
        source: ByteSource,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<SerializedResult>>;
}

/// Runs the pipeline in this process.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    pipeline: Pipeline,
}

impl LocalBackend {
    /// Create a backend with the given options.
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            pipeline: Pipeline::new(options),
        }
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl DecodeBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn decode<'a>(
        &'a self,
        source: ByteSource,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<SerializedResult>> {
        Box::pin(self.pipeline.decode_source(source, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{DEFAULT_ENTRY_NAME, seal};
    use crate::error::ErrorKind;
    use ndoc_archive::zip::{ZipMethod, build_zip};
    use ndoc_deflate::deflate_stored;

    #[tokio::test]
    async fn test_local_backend_as_trait_object() {
        let mut entry = vec![0u8; 16];
        entry.extend_from_slice(&deflate_stored(b"via trait"));
        let archive = build_zip([(DEFAULT_ENTRY_NAME, entry.as_slice())], ZipMethod::Deflate).unwrap();
        let container = seal(&archive, 0x33).unwrap();

        let backend: Box<dyn DecodeBackend> = Box::new(LocalBackend::default());
        assert_eq!(backend.name(), "local");

        let cancel = CancelToken::new();
        let result = backend.decode(container.into(), &cancel).await.unwrap();
        assert_eq!(result.as_bytes(), b"via trait");

        let err = backend.decode(vec![1u8].into(), &cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInput);
    }
}
