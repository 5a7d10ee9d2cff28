//! RPC clients for the compute and stats services.
//!
//! # Responsibilities
//! - Encode requests, decode responses and error bodies
//! - Classify transport failures (connect → UNAVAILABLE, timeout →
//!   DEADLINE_EXCEEDED) so callers can decide about retries
//! - Act as the remote [`ObservationSink`] for the telemetry reporter

use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

use crate::rpc::server::{COMPUTE_FIB_PATH, GET_STATS_SNAPSHOT_PATH, HEALTH_PATH, RECORD_OBSERVATION_PATH};
use crate::rpc::status::{Code, ErrorBody, RpcError};
use crate::rpc::types::{
    ComputeFibRequest, ComputeFibResponse, GetStatsSnapshotRequest, GetStatsSnapshotResponse,
    HealthResponse, RecordObservationRequest, RecordObservationResponse,
};
use crate::telemetry::{Observation, ObservationSink};

/// Shared transport: base URL plus a pooled HTTP client.
#[derive(Debug, Clone)]
struct Channel {
    http: Client,
    base: Url,
}

impl Channel {
    fn new(base_url: &str) -> Result<Self, RpcError> {
        let base: Url = base_url
            .parse()
            .map_err(|e| RpcError::invalid_argument(format!("Invalid URL '{}': {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RpcError::invalid_argument(format!(
                "Unsupported URL scheme '{}'",
                base.scheme()
            )));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| RpcError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base })
    }

    fn url(&self, path: &str) -> Result<Url, RpcError> {
        self.base
            .join(path)
            .map_err(|e| RpcError::invalid_argument(format!("Invalid RPC path '{}': {}", path, e)))
    }

    async fn call<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, RpcError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path)?)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn get<Resp>(&self, path: &str) -> Result<Resp, RpcError>
    where
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::deadline_exceeded(e.to_string())
    } else if e.is_connect() || e.is_request() {
        RpcError::unavailable(e.to_string())
    } else {
        RpcError::internal(e.to_string())
    }
}

async fn decode<Resp: DeserializeOwned>(response: reqwest::Response) -> Result<Resp, RpcError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<Resp>()
            .await
            .map_err(|e| RpcError::internal(format!("Malformed response body: {}", e)));
    }

    let text = response.text().await.unwrap_or_default();
    Err(error_from_body(status, &text))
}

fn error_from_body(status: StatusCode, text: &str) -> RpcError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => body.into(),
        Err(_) => {
            let message = if text.is_empty() {
                status.to_string()
            } else {
                format!("{}: {}", status, text)
            };
            RpcError::new(Code::from_http_status(status), message)
        }
    }
}

/// Client for the compute service.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    channel: Channel,
}

impl ComputeClient {
    pub fn new(base_url: &str) -> Result<Self, RpcError> {
        Ok(Self {
            channel: Channel::new(base_url)?,
        })
    }

    /// `ComputeFib(n) → value`.
    pub async fn compute_fib(&self, n: i32) -> Result<i64, RpcError> {
        let response: ComputeFibResponse = self
            .channel
            .call(COMPUTE_FIB_PATH, &ComputeFibRequest { n })
            .await?;
        Ok(response.value)
    }

    pub async fn health(&self) -> Result<HealthResponse, RpcError> {
        self.channel.get(HEALTH_PATH).await
    }
}

/// Client for the stats service.
#[derive(Debug, Clone)]
pub struct StatsClient {
    channel: Channel,
}

impl StatsClient {
    pub fn new(base_url: &str) -> Result<Self, RpcError> {
        Ok(Self {
            channel: Channel::new(base_url)?,
        })
    }

    /// `RecordObservation(n, duration_nanos) → accepted`.
    pub async fn record_observation(&self, n: i32, duration: Duration) -> Result<bool, RpcError> {
        let duration_nanos = i64::try_from(duration.as_nanos())
            .map_err(|_| RpcError::invalid_argument("duration does not fit in int64 nanoseconds"))?;
        let response: RecordObservationResponse = self
            .channel
            .call(
                RECORD_OBSERVATION_PATH,
                &RecordObservationRequest { n, duration_nanos },
            )
            .await?;
        Ok(response.accepted)
    }

    /// `GetStatsSnapshot() → snapshot`.
    pub async fn get_stats_snapshot(&self) -> Result<GetStatsSnapshotResponse, RpcError> {
        self.channel
            .call(GET_STATS_SNAPSHOT_PATH, &GetStatsSnapshotRequest::default())
            .await
    }

    pub async fn health(&self) -> Result<HealthResponse, RpcError> {
        self.channel.get(HEALTH_PATH).await
    }
}

impl ObservationSink for StatsClient {
    fn deliver(&self, observation: Observation) -> BoxFuture<'_, Result<(), RpcError>> {
        Box::pin(async move {
            let n = i32::try_from(observation.n)
                .map_err(|_| RpcError::invalid_argument(format!("n={} exceeds int32", observation.n)))?;
            if self.record_observation(n, observation.duration).await? {
                Ok(())
            } else {
                Err(RpcError::new(Code::FailedPrecondition, "observation not accepted"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_urls() {
        assert_eq!(StatsClient::new("not a url").unwrap_err().code, Code::InvalidArgument);
        assert_eq!(StatsClient::new("ftp://host:21").unwrap_err().code, Code::InvalidArgument);
        assert!(ComputeClient::new("http://127.0.0.1:5001").is_ok());
    }

    #[test]
    fn test_error_body_is_preferred() {
        let err = error_from_body(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"code":"PERMISSION_DENIED","message":"nope"}"#,
        );
        assert_eq!(err.code, Code::PermissionDenied);
        assert_eq!(err.message, "nope");
    }

    #[test]
    fn test_plain_error_falls_back_to_status() {
        let err = error_from_body(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable");
        assert_eq!(err.code, Code::Unavailable);
        assert!(err.is_transient());

        let err = error_from_body(StatusCode::UNPROCESSABLE_ENTITY, "");
        assert_eq!(err.code, Code::InvalidArgument);
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = StatsClient::new(&format!("http://{}", addr)).unwrap();
        let err = client.get_stats_snapshot().await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {}", err);
    }
}
