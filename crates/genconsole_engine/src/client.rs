use std::time::Duration;

use console_logging::{console_debug, console_info, console_warn};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::parse::{parse_or_skip, ParsedMessage};
use crate::sse::SseDecoder;
use crate::{FailureKind, StreamError, StreamOutcome, StreamSignal};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base: String,
    pub connect_timeout: Duration,
    /// Fixed wait before re-opening a dropped stream.
    pub reconnect_delay: Duration,
    pub max_reconnects: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            max_reconnects: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// Structured input posted before the stream is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalInfo {
    pub json: serde_json::Value,
    pub files: Vec<FilePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub resource: String,
    pub project_id: String,
    pub query: Vec<(String, String)>,
    pub additional_info: Option<AdditionalInfo>,
}

impl GenerationRequest {
    pub fn new(resource: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            project_id: project_id.into(),
            query: Vec::new(),
            additional_info: None,
        }
    }
}

pub trait StreamSink: Send + Sync {
    fn emit(&self, signal: StreamSignal);
}

#[async_trait::async_trait]
pub trait GenerationStream: Send + Sync {
    /// Runs one generation stream until it finishes, fails or `cancel` fires.
    async fn run(
        &self,
        request: &GenerationRequest,
        sink: &dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, StreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGenerationClient {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ReqwestGenerationClient {
    pub fn new(settings: ClientSettings) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| StreamError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// `{api_base}/{resource}/{action}/{project_id}[?query]`
    pub fn endpoint(
        &self,
        resource: &str,
        action: &str,
        project_id: &str,
        query: &[(String, String)],
    ) -> Result<Url, StreamError> {
        let mut url = Url::parse(&self.settings.api_base)
            .map_err(|err| StreamError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StreamError::new(FailureKind::InvalidUrl, "api base cannot be a base"))?
            .pop_if_empty()
            .extend([resource, action, project_id]);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// First phase of a two-phase generation: post the form, then the caller opens the stream.
    pub async fn submit_additional_info(
        &self,
        request: &GenerationRequest,
        info: &AdditionalInfo,
    ) -> Result<(), StreamError> {
        let url = self.endpoint(
            &request.resource,
            "set-additional-info",
            &request.project_id,
            &[],
        )?;

        let mut form = Form::new().text("data", info.json.to_string());
        for file in &info.files {
            let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            if let Some(mime) = &file.mime {
                part = part
                    .mime_str(mime)
                    .map_err(|err| StreamError::new(FailureKind::Network, err.to_string()))?;
            }
            form = form.part(file.field.clone(), part);
        }

        console_info!(
            "Submitting additional info for {}/{} ({} file part(s))",
            request.resource,
            request.project_id,
            info.files.len()
        );
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(
                FailureKind::Submit(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(())
    }

    async fn open_stream(&self, url: &Url) -> Result<reqwest::Response, StreamError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }

    async fn consume(
        &self,
        response: reqwest::Response,
        sink: &dyn StreamSink,
        cancel: &CancellationToken,
        delivered: &mut bool,
    ) -> Result<StreamOutcome, StreamError> {
        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                return Err(StreamError::new(
                    FailureKind::StreamEnded,
                    "connection closed before a terminal message",
                ));
            };
            let chunk = chunk.map_err(map_reqwest_error)?;

            for frame in decoder.push(&chunk) {
                if cancel.is_cancelled() {
                    return Ok(StreamOutcome::Cancelled);
                }
                match parse_or_skip(&frame.data) {
                    Some(ParsedMessage::Step(step)) => {
                        *delivered = true;
                        sink.emit(StreamSignal::Step(step));
                    }
                    Some(ParsedMessage::Done) => return Ok(StreamOutcome::Finished),
                    Some(ParsedMessage::Error(message)) => {
                        return Err(StreamError::new(FailureKind::Server, message));
                    }
                    Some(ParsedMessage::Malformed(_)) | None => {}
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl GenerationStream for ReqwestGenerationClient {
    async fn run(
        &self,
        request: &GenerationRequest,
        sink: &dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, StreamError> {
        if let Some(info) = &request.additional_info {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                submitted = self.submit_additional_info(request, info) => submitted?,
            }
        }

        let url = self.endpoint(
            &request.resource,
            "generate",
            &request.project_id,
            &request.query,
        )?;

        let mut retry = 0;
        loop {
            console_debug!("Opening generation stream {}", url);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                opened = self.open_stream(&url) => opened,
            };
            let mut delivered = false;
            let result = match result {
                Ok(response) => self.consume(response, sink, cancel, &mut delivered).await,
                Err(err) => Err(err),
            };
            // A stream that made progress starts a fresh reconnect budget.
            if delivered {
                retry = 0;
            }

            match result {
                Err(err) if err.is_retryable() && retry < self.settings.max_reconnects => {
                    retry += 1;
                    let delay = self.settings.reconnect_delay;
                    console_warn!(
                        "Generation stream {} dropped ({}); reconnect {}/{} in {:?}",
                        url,
                        err,
                        retry,
                        self.settings.max_reconnects,
                        delay
                    );
                    sink.emit(StreamSignal::Reconnecting { retry, delay });
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                other => return other,
            }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return StreamError::new(FailureKind::InvalidUrl, err.to_string());
    }
    StreamError::new(FailureKind::Network, err.to_string())
}
