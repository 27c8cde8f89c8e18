// API client module: posts a multipart upload to Catbox or Litterbox and
// hands back the URL they answer with. The transfer runs on reqwest's async
// client, driven to completion on a single-threaded tokio runtime so callers
// stay synchronous.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, Stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::UploadError;
use crate::multipart::FormReader;
use crate::progress::{ProgressHandle, ProgressTracker};
use crate::request::UploadRequest;

const CHUNK_SIZE: usize = 64 * 1024;

/// Anything that can perform an upload. The controller only talks to this
/// trait, so it can be exercised without a network.
pub trait Uploader {
    fn upload(
        &self,
        request: &UploadRequest,
        tracker: &ProgressTracker,
    ) -> Result<String, UploadError>;
}

/// Upload client holding a reqwest client, the runtime that drives it and
/// the endpoints of both services.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    runtime: Arc<Runtime>,
    config: Config,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(UploadError::Runtime)?;

        let mut builder = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(ApiClient {
            client: builder.build()?,
            runtime: Arc::new(runtime),
            config: config.clone(),
        })
    }
}

/// Body chunks read off `reader` on the blocking pool. A chunk is counted
/// when the connection pulls it, so nothing is recorded for a request that
/// never got a socket.
fn body_stream(
    reader: FormReader,
    progress: ProgressHandle,
) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + Sync + 'static {
    stream::unfold(Some(reader), |reader| async move {
        let Some(mut reader) = reader else {
            return None;
        };
        let read = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = reader.read(&mut buf)?;
            buf.truncate(n);
            Ok::<_, io::Error>((reader, buf))
        })
        .await;

        match read {
            Ok(Ok((_, buf))) if buf.is_empty() => None,
            Ok(Ok((reader, buf))) => Some((Ok(buf), Some(reader))),
            Ok(Err(err)) => Some((Err(err), None)),
            Err(err) => Some((Err(io::Error::other(err)), None)),
        }
    })
    .map(move |chunk| {
        if let Ok(buf) = &chunk {
            progress.on_bytes(buf.len());
        }
        chunk
    })
}

impl Uploader for ApiClient {
    /// Stream `request` as multipart/form-data. The tracker sees each chunk
    /// as the connection takes it, and its sampler runs exactly as long as
    /// the request does.
    fn upload(
        &self,
        request: &UploadRequest,
        tracker: &ProgressTracker,
    ) -> Result<String, UploadError> {
        let limit = request.target.size_limit();
        if request.file_size > limit {
            return Err(UploadError::TooLarge {
                size: request.file_size,
                limit,
                service: request.target.service_name(),
            });
        }

        let form = request.form();
        let content_length = form.content_length();
        let content_type = form.content_type();
        let url = request.target.endpoint(&self.config);
        info!(
            url,
            file = %request.file_name,
            content_length,
            "starting upload"
        );

        let started = Instant::now();
        let sampling = tracker.start(content_length);
        let body = Body::wrap_stream(body_stream(form.into_reader(), tracker.handle()));
        let result = self.runtime.block_on(async {
            let res = self
                .client
                .post(url)
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_LENGTH, content_length)
                .body(body)
                .send()
                .await?;
            let status = res.status();
            let text = res.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        });
        drop(sampling);
        let (status, text) = result?;

        debug!(
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload answered"
        );
        if !status.is_success() {
            return Err(UploadError::Status { status, body: text });
        }
        Ok(text)
    }
}
