//! Model client boundary and the OpenAI-compatible HTTP client.
//!
//! `ModelClient` is the seam between the chat session and the network: it
//! accepts an assembled request and returns a finite lazy stream of text
//! fragments. `OpenAi` implements it over the `/chat/completions` SSE
//! protocol, which SiliconFlow and other OpenAI-compatible providers speak.

use std::env;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_ERRORS, STREAM_EVENTS,
};
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, ChatRequest};

const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1/";
const API_KEY_ENV: &str = "ATORI_API_KEY";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A finite lazy stream of response text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The model-invocation boundary.
///
/// Implementations may fail before yielding anything (authentication,
/// transport) or mid-stream; the chat session owns accumulation and commit.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends `request` and returns the response as a fragment stream.
    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream>;
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl OpenAi {
    /// Create a new client against the default endpoint.
    ///
    /// The API key can be provided directly or read from the ATORI_API_KEY
    /// environment variable. Without a key this fails with an authentication
    /// error before any session or network call exists.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom endpoint and timeout.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(api_key, env::var(API_KEY_ENV).ok())?;
        let base_url = normalize_base_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the endpoint this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| Error::authentication("API key contains invalid header characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed_error = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let error_type = parsed_error
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .and_then(|e| e.error_type.clone());
        let error_message = parsed_error
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());

        match status_code {
            401 | 403 => Error::authentication(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAi {
    async fn stream_chat(&self, request: ChatRequest) -> Result<FragmentStream> {
        CLIENT_REQUESTS.click();

        let body = ChatCompletionRequest::streaming(&request);
        let url = format!("{}chat/completions", self.base_url);

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

pub(crate) fn resolve_api_key(
    explicit: Option<String>,
    from_env: Option<String>,
) -> Result<String> {
    explicit
        .filter(|key| !key.is_empty())
        .or(from_env.filter(|key| !key.is_empty()))
        .ok_or_else(|| {
            Error::authentication(format!(
                "API key not provided and {API_KEY_ENV} environment variable not set"
            ))
        })
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    Url::parse(base_url)?;
    if base_url.ends_with('/') {
        Ok(base_url.to_string())
    } else {
        Ok(format!("{base_url}/"))
    }
}

/// A parsed SSE data payload.
#[derive(Debug)]
enum SseData {
    /// A content delta; `None` for role-only and final chunks.
    Delta(Option<String>),
    /// The `[DONE]` end-of-stream marker.
    Done,
}

/// Moves the longest valid UTF-8 prefix of `pending` into `decoded`,
/// leaving an incomplete trailing sequence in place for the next read.
/// Transport chunk boundaries can land mid-character, so split sequences
/// are not errors; genuinely invalid bytes are.
fn drain_utf8(pending: &mut Vec<u8>, decoded: &mut String) -> Result<()> {
    let valid = match std::str::from_utf8(pending) {
        Ok(text) => {
            decoded.push_str(text);
            pending.clear();
            return Ok(());
        }
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(err) => {
            pending.clear();
            return Err(Error::encoding(
                format!("invalid UTF-8 in stream: {err}"),
                Some(Box::new(err)),
            ));
        }
    };
    let tail = pending.split_off(valid);
    if let Ok(prefix) = std::str::from_utf8(pending) {
        decoded.push_str(prefix);
    }
    *pending = tail;
    Ok(())
}

/// Process a stream of bytes into a stream of response text fragments.
///
/// Events are delimited by blank lines; each carries one
/// `chat.completion.chunk` JSON object or the `[DONE]` marker. Empty deltas
/// are skipped so the output stream yields only displayable fragments.
fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let stream = byte_stream
        .map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        })
        .fuse();

    stream::unfold(
        (stream, String::new(), Vec::new(), false),
        move |(mut stream, mut buffer, mut pending, mut eof)| async move {
            loop {
                // First drain any complete event already in the buffer.
                if let Some((data, remaining)) = extract_data(&buffer) {
                    buffer = remaining;
                    match data {
                        Ok(SseData::Done) => return None,
                        Ok(SseData::Delta(Some(text))) if !text.is_empty() => {
                            STREAM_EVENTS.click();
                            return Some((Ok(text), (stream, buffer, pending, eof)));
                        }
                        Ok(SseData::Delta(_)) => continue,
                        Err(err) => {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, buffer, pending, eof)));
                        }
                    }
                }

                if eof {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        pending.extend_from_slice(&bytes);
                        if let Err(err) = drain_utf8(&mut pending, &mut buffer) {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, buffer, pending, eof)));
                        }
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, pending, eof)));
                    }
                    None => {
                        eof = true;
                        // Flush a trailing event that lacks its terminator.
                        if !buffer.trim().is_empty() {
                            buffer.push_str("\n\n");
                        }
                        if !pending.is_empty() {
                            pending.clear();
                            STREAM_ERRORS.click();
                            return Some((
                                Err(Error::encoding(
                                    "stream ended mid UTF-8 sequence",
                                    None,
                                )),
                                (stream, buffer, pending, eof),
                            ));
                        }
                    }
                }
            }
        },
    )
}

/// Extract a complete SSE data payload from a buffer string.
fn extract_data(buffer: &str) -> Option<(Result<SseData>, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    let mut data = None;
    for line in event_text.lines() {
        if let Some(payload) = line.strip_prefix("data:") {
            data = Some(payload.trim_start());
        }
    }

    match data {
        Some("[DONE]") => Some((Ok(SseData::Done), rest)),
        Some(json_str) => match serde_json::from_str::<ChatCompletionChunk>(json_str) {
            Ok(chunk) => Some((Ok(SseData::Delta(chunk.fragment())), rest)),
            Err(e) => Some((
                Err(Error::serialization(
                    format!("failed to parse chunk JSON: {e}"),
                    Some(Box::new(e)),
                )),
                rest,
            )),
        },
        // Comment/keepalive events carry no data field.
        None => Some((Ok(SseData::Delta(None)), rest)),
    }
}
