use std::time::Duration;

use serde::Serialize;

pub use ::reqwest::{IntoUrl, Request, Response};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Client {
    inner: ::reqwest::Client,
}

pub struct RequestBuilder {
    inner: ::reqwest::RequestBuilder,
    client: Client,
    timeout: Option<Duration>,
}

macro_rules! emit_request_fn {
    ($method:ident) => {
        pub fn $method(&self, u: impl IntoUrl) -> RequestBuilder {
            RequestBuilder::new(self.inner.$method(u), self.clone())
        }
    };
}

impl Client {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let inner = ::reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { inner })
    }

    emit_request_fn!(post);

    pub(super) async fn execute_request(
        &self,
        req: Request,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let requested_url = req.url().to_string();
        log::debug!("{} {}", req.method(), requested_url);

        self.inner
            .execute(req)
            .await
            .map_err(|e| classify(e, requested_url, timeout))
    }
}

impl RequestBuilder {
    fn new(b: ::reqwest::RequestBuilder, client: Client) -> Self {
        Self {
            inner: b,
            client,
            timeout: None,
        }
    }

    pub async fn send(self) -> Result<Response> {
        let req = self.inner.build()?;
        self.client.execute_request(req, self.timeout).await
    }

    /// Deadline for the whole exchange, response body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self.timeout = Some(timeout);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Self {
        self.inner = self.inner.json(json);
        self
    }
}

/// Timeouts are checked first: a connect attempt that timed out is still a
/// timeout, not a refused connection.
pub(super) fn classify(
    e: ::reqwest::Error,
    requested_url: String,
    timeout: Option<Duration>,
) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            requested_url,
            timeout: timeout.unwrap_or_default(),
            source: e,
        }
    } else if e.is_connect() {
        Error::Connection {
            requested_url,
            source: e,
        }
    } else {
        Error::Http(e)
    }
}
