//! Decode orchestration.
//!
//! A [`DecodeRequest`] owns the container buffer for its whole life and
//! walks an explicit state machine:
//!
//! ```text
//! Init -> KeyLocated -> HeaderNormalized -> Deobfuscated -> Extracted -> Decoded
//!   \________\_______________\__________________\______________\---> Failed
//! ```
//!
//! Each stage borrows the buffer, finishes, and hands it back before the
//! next stage starts. The first error moves the request to `Failed` and
//! drops the buffer, so no partial output survives. [`Pipeline`] drives
//! requests either synchronously or asynchronously with per-request
//! scratch space and cancellation.

use crate::cancel::CancelToken;
use crate::container::{ObfuscationKey, deobfuscate, locate_key, normalize_header};
use crate::decoder::decode_entry_with;
use crate::error::{ErrorKind, NdocError, Result, Stage};
use crate::extract::extract_with;
use crate::options::DecodeOptions;
use crate::result::SerializedResult;
use crate::scratch::Scratch;
use crate::source::ByteSource;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, Span, debug, info, info_span, warn};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Position of a request in the decode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing done yet.
    Init,
    /// Key pointer and key read.
    KeyLocated,
    /// Archive signature restored.
    HeaderNormalized,
    /// Obfuscated region XOR-ed back.
    Deobfuscated,
    /// Entry bytes extracted from the archive.
    Extracted,
    /// Payload inflated. Terminal.
    Decoded,
    /// A stage failed. Terminal.
    Failed {
        /// Error category.
        kind: ErrorKind,
        /// Stage that failed.
        stage: Stage,
    },
}

impl PipelineState {
    /// Stage that runs next, or `None` in a terminal state.
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            Self::Init => Some(Stage::LocateKey),
            Self::KeyLocated => Some(Stage::NormalizeHeader),
            Self::HeaderNormalized => Some(Stage::Deobfuscate),
            Self::Deobfuscated => Some(Stage::Extract),
            Self::Extracted => Some(Stage::Decode),
            Self::Decoded | Self::Failed { .. } => None,
        }
    }

    /// Whether no further stage can run.
    pub fn is_terminal(&self) -> bool {
        self.next_stage().is_none()
    }

    fn completed(stage: Stage) -> Self {
        match stage {
            Stage::LocateKey => Self::KeyLocated,
            Stage::NormalizeHeader => Self::HeaderNormalized,
            Stage::Deobfuscate => Self::Deobfuscated,
            Stage::Extract => Self::Extracted,
            Stage::Decode => Self::Decoded,
            Stage::Source | Stage::Seal | Stage::Remote => Self::Init,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::KeyLocated => write!(f, "key_located"),
            Self::HeaderNormalized => write!(f, "header_normalized"),
            Self::Deobfuscated => write!(f, "deobfuscated"),
            Self::Extracted => write!(f, "extracted"),
            Self::Decoded => write!(f, "decoded"),
            Self::Failed { kind, stage } => write!(f, "failed({:?} at {})", kind, stage),
        }
    }
}

/// One decode, from container bytes to payload.
#[derive(Debug)]
pub struct DecodeRequest {
    options: DecodeOptions,
    state: PipelineState,
    history: Vec<PipelineState>,
    buffer: Vec<u8>,
    key: Option<ObfuscationKey>,
    failure: Option<NdocError>,
}

impl DecodeRequest {
    /// Take ownership of `container`.
    pub fn new(container: Vec<u8>, options: DecodeOptions) -> Self {
        Self {
            options,
            state: PipelineState::Init,
            history: vec![PipelineState::Init],
            buffer: container,
            key: None,
            failure: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state visited, starting with `Init`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Key found by the first stage.
    pub fn key(&self) -> Option<ObfuscationKey> {
        self.key
    }

    /// Stage that runs on the next [`step`](Self::step).
    pub fn next_stage(&self) -> Option<Stage> {
        self.state.next_stage()
    }

    /// Bytes produced by the last completed stage: the container up to
    /// `Deobfuscated`, the entry after `Extracted`, the payload after
    /// `Decoded`. Empty after a failure.
    pub fn artifact(&self) -> &[u8] {
        &self.buffer
    }

    /// Replace the current artifact with a committed copy.
    pub fn replace_artifact(&mut self, bytes: Vec<u8>) {
        self.buffer = bytes;
    }

    /// Run the next stage. A terminal request is left unchanged.
    pub fn step(&mut self) -> Result<PipelineState> {
        let Some(stage) = self.state.next_stage() else {
            return Ok(self.state);
        };

        match self.run_stage(stage) {
            Ok(()) => {
                self.transition(PipelineState::completed(stage));
                debug!(%stage, state = %self.state, len = self.buffer.len(), "stage complete");
                Ok(self.state)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Move to `Failed`, dropping the buffer, and hand `error` back. The
    /// error is kept so a later [`run`](Self::run) reports it again.
    pub fn fail(&mut self, error: NdocError) -> NdocError {
        self.buffer = Vec::new();
        self.failure = Some(error.clone());
        self.transition(PipelineState::Failed {
            kind: error.kind(),
            stage: error.stage(),
        });
        debug!(state = %self.state, %error, "request failed");
        error
    }

    /// Run every remaining stage. On a failed request this returns the
    /// error that failed it.
    pub fn run(mut self) -> Result<SerializedResult> {
        loop {
            match self.state {
                PipelineState::Decoded => return Ok(SerializedResult::new(self.buffer)),
                PipelineState::Failed { stage, .. } => {
                    return Err(self.failure.take().unwrap_or_else(|| {
                        NdocError::archive_msg(stage, "request already failed")
                    }));
                }
                _ => {
                    self.step()?;
                }
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        self.state = next;
        self.history.push(next);
    }

    fn run_stage(&mut self, stage: Stage) -> Result<()> {
        match stage {
            // Must run before the header is overwritten: the pointer lives
            // at offset 2.
            Stage::LocateKey => self.key = Some(locate_key(&self.buffer)?),
            Stage::NormalizeHeader => {
                normalize_header(&mut self.buffer)?;
            }
            Stage::Deobfuscate => {
                let key = self.key.ok_or_else(|| {
                    NdocError::archive_msg(Stage::Deobfuscate, "key has not been located")
                })?;
                deobfuscate(&mut self.buffer, key.key)?;
            }
            Stage::Extract => self.buffer = extract_with(&self.buffer, &self.options)?,
            Stage::Decode => {
                self.buffer = decode_entry_with(
                    &self.buffer,
                    self.options.stream_format,
                    self.options.max_output_size,
                )?;
            }
            Stage::Source | Stage::Seal | Stage::Remote => {}
        }
        Ok(())
    }
}

/// Runs decode requests with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: DecodeOptions,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Options applied to every request.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode in memory on the current thread.
    pub fn decode_bytes(&self, container: Vec<u8>) -> Result<SerializedResult> {
        let span = info_span!("decode", request = next_request_id(), len = container.len());
        let _enter = span.enter();

        let input_len = container.len();
        let result = DecodeRequest::new(container, self.options.clone()).run()?;
        info!(input_len, output_len = result.len(), "decoded");
        Ok(result)
    }

    /// Decode the file at `path`.
    pub async fn decode_path(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<SerializedResult> {
        self.decode_source(ByteSource::from(path.as_ref()), cancel)
            .await
    }

    /// Decode `source` asynchronously.
    ///
    /// Each stage runs on the blocking pool and its output is committed to
    /// this request's scratch directory and read back before the next
    /// stage starts. `cancel` is checked before every stage. The scratch
    /// directory is removed when this future completes or is dropped.
    pub async fn decode_source(
        &self,
        source: ByteSource,
        cancel: &CancelToken,
    ) -> Result<SerializedResult> {
        let span = info_span!("decode", request = next_request_id(), %source);
        self.run_async(source, cancel).instrument(span).await
    }

    async fn run_async(&self, source: ByteSource, cancel: &CancelToken) -> Result<SerializedResult> {
        self.run_stages(source, cancel, |_, _| {}).await
    }

    /// Async driver. `after_stage` sees each completed stage together with
    /// the scratch directory its output was committed to.
    pub(crate) async fn run_stages<F>(
        &self,
        source: ByteSource,
        cancel: &CancelToken,
        mut after_stage: F,
    ) -> Result<SerializedResult>
    where
        F: FnMut(Stage, &Path),
    {
        cancel.check(Stage::Source)?;
        let container = source.read().await?;
        let input_len = container.len();

        let scratch = Scratch::create(self.options.scratch_dir.as_deref())?;
        debug!(scratch = %scratch.path().display(), input_len, "request started");

        let mut request = DecodeRequest::new(container, self.options.clone());
        while let Some(stage) = request.next_stage() {
            if let Err(e) = cancel.check(stage) {
                return Err(request.fail(e));
            }
            request = step_blocking(request, stage).await?;

            // The key stage only reads.
            if stage != Stage::LocateKey {
                let committed = scratch.commit(stage, request.artifact()).await;
                if let Err(e) = committed {
                    return Err(request.fail(e));
                }
                match scratch.load(stage).await {
                    Ok(bytes) => request.replace_artifact(bytes),
                    Err(e) => return Err(request.fail(e)),
                }
            }
            after_stage(stage, scratch.path());
        }

        let result = request.run()?;
        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to remove scratch directory");
        }
        info!(input_len, output_len = result.len(), "decoded");
        Ok(result)
    }
}

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

async fn step_blocking(mut request: DecodeRequest, stage: Stage) -> Result<DecodeRequest> {
    let span = Span::current();
    let (request, outcome) = tokio::task::spawn_blocking(move || {
        let _enter = span.enter();
        let outcome = request.step();
        (request, outcome)
    })
    .await
    .map_err(|e| NdocError::io(stage, io::Error::other(e.to_string())))?;

    outcome.map(|_| request)
}
