use std::time::Duration;

use reqwest::StatusCode;

use crate::{
    error::*,
    http,
    model::{ExecutionRequest, ExecutionResult, Url},
};

/// Client of the remote execution microservice.
///
/// The service accepts an [`ExecutionRequest`] as a JSON body and answers
/// `200 OK` with an [`ExecutionResult`].
#[derive(Debug, Clone)]
pub struct ExecutionServiceClient {
    http: http::Client,
    url: Url,
}

impl ExecutionServiceClient {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

    pub fn new(url: Url, connect_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http::Client::new(connect_timeout)?,
            url,
        })
    }

    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|source| Error::InvalidSyntaxUrl {
            url: url.to_owned(),
            source,
        })?;
        Self::new(parsed, Self::DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn execute(
        &self,
        req: &ExecutionRequest,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let requested_url = self.url.to_string();
        let resp = self
            .http
            .post(self.url.clone())
            .json(req)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| http::classify(e, requested_url.clone(), Some(timeout)))?;

        if status != StatusCode::OK {
            log::info!("Execution service answered {} ({})", status, requested_url);
            return Err(Error::UnexpectedResponseCode {
                got: status,
                requested_url,
                body,
            });
        }

        let result = serde_json::from_str::<ExecutionResult>(&body)?;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Language;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Answers every connection with `status` and `body`, once.
    async fn respond_once(status: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        Url::parse(&format!("http://{}/execute", addr)).unwrap()
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest::new("def solution(d): return d", Language::Python, json!({"x": 5}), 2)
    }

    #[tokio::test]
    async fn decodes_ok_response() {
        let url = respond_once(
            "200 OK",
            r#"{"output": 5, "stdout": "hi\n", "stderr": "", "error": null, "time_ms": 7}"#,
        )
        .await;
        let cli = ExecutionServiceClient::new(url, Duration::from_secs(1)).unwrap();
        let res = cli.execute(&request(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(res.output, Some(json!(5)));
        assert_eq!(res.stdout, "hi\n");
        assert_eq!(res.time_ms, 7);
    }

    #[tokio::test]
    async fn non_ok_response_keeps_body() {
        let url = respond_once("500 Internal Server Error", "sandbox exploded").await;
        let cli = ExecutionServiceClient::new(url, Duration::from_secs(1)).unwrap();
        let err = cli.execute(&request(), Duration::from_secs(5)).await.unwrap_err();
        match err {
            Error::UnexpectedResponseCode { got, body, .. } => {
                assert_eq!(got, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "sandbox exploded");
            }
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let url = Url::parse(&format!("http://{}/execute", addr)).unwrap();
        let cli = ExecutionServiceClient::new(url, Duration::from_secs(1)).unwrap();
        let err = cli.execute(&request(), Duration::from_secs(5)).await.unwrap_err();
        assert!(err.is_connection(), "{:?}", err);
    }

    #[tokio::test]
    async fn silent_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        let url = Url::parse(&format!("http://{}/execute", addr)).unwrap();
        let cli = ExecutionServiceClient::new(url, Duration::from_secs(1)).unwrap();
        let err = cli
            .execute(&request(), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);
    }

    #[test]
    fn rejects_malformed_url() {
        let err = ExecutionServiceClient::parse("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidSyntaxUrl { .. }));
    }
}
