//! Request body cache.
//!
//! The payload is drained from the transport on first use; every later read
//! returns the cached bytes, or the cached read failure.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::RequestContext;
use crate::error::{ContextError, ErrorKind};

/// A request payload that can be drained once.
#[async_trait]
pub trait BodySource: Send {
    /// Reads the whole payload.
    async fn read_all(&mut self) -> anyhow::Result<Bytes>;
}

/// An axum body read up to a byte limit.
pub struct LimitedBody {
    body: axum::body::Body,
    limit: usize,
}

impl LimitedBody {
    #[must_use]
    pub fn new(body: axum::body::Body, limit: usize) -> Self {
        Self { body, limit }
    }
}

#[async_trait]
impl BodySource for LimitedBody {
    async fn read_all(&mut self) -> anyhow::Result<Bytes> {
        let body = std::mem::take(&mut self.body);
        Ok(axum::body::to_bytes(body, self.limit).await?)
    }
}

#[async_trait]
impl BodySource for Bytes {
    async fn read_all(&mut self) -> anyhow::Result<Bytes> {
        Ok(std::mem::take(self))
    }
}

/// Read state of the request body.
pub(super) enum BodyState {
    Unread(Box<dyn BodySource>),
    Read(Bytes),
    /// The transport read failed; holds the rendered cause.
    Failed(String),
}

impl RequestContext {
    /// Returns the raw request body, reading it from the transport on the
    /// first call only.
    ///
    /// # Errors
    ///
    /// Returns `ReadBody` if the transport read failed, on this call or an
    /// earlier one.
    pub async fn read_body_bytes(&mut self) -> Result<Bytes, ContextError> {
        let cause = match &mut self.body {
            BodyState::Read(buf) => return Ok(buf.clone()),
            BodyState::Failed(cause) => cause.clone(),
            BodyState::Unread(source) => match source.read_all().await {
                Ok(buf) => {
                    self.body = BodyState::Read(buf.clone());
                    return Ok(buf);
                }
                Err(err) => {
                    let cause = format!("{err:#}");
                    self.body = BodyState::Failed(cause.clone());
                    cause
                }
            },
        };
        Err(ContextError::wrap(
            ErrorKind::ReadBody,
            "Failed reading request body",
            anyhow::anyhow!(cause),
        ))
    }

    /// Deserializes the JSON body. Returns `None` when the body is empty.
    ///
    /// # Errors
    ///
    /// Returns `ReadBody` if the body cannot be read and `BadRequestBody` if
    /// it is not valid JSON for `T`.
    pub async fn try_read_body<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ContextError> {
        let buf = self.read_body_bytes().await?;
        if buf.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&buf).map(Some).map_err(|err| {
            ContextError::new(
                ErrorKind::BadRequestBody,
                format!(
                    "Invalid request body: {err}; body={}",
                    String::from_utf8_lossy(&buf)
                ),
            )
        })
    }

    /// Deserializes a JSON body the handler requires.
    ///
    /// # Errors
    ///
    /// As [`try_read_body`](Self::try_read_body), plus `EmptyBody` when the
    /// body is empty.
    pub async fn read_body<T: DeserializeOwned>(&mut self) -> Result<T, ContextError> {
        self.try_read_body()
            .await?
            .ok_or_else(|| ContextError::new(ErrorKind::EmptyBody, "Empty request body"))
    }
}
