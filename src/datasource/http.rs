//! Retrying JSON transport shared by the venue adapters.

use super::DataSourceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::RequestBuilder;
use std::time::Duration;

const MAX_ELAPSED: Duration = Duration::from_secs(30);

/// Send a request built by `build` and decode the JSON body.
///
/// Network errors, 429 and 5xx are retried with exponential backoff; other
/// statuses and undecodable bodies fail immediately. `build` is called once
/// per attempt so signed requests get a fresh signature.
pub async fn send_json<F>(build: F) -> Result<serde_json::Value, DataSourceError>
where
    F: Fn() -> Result<RequestBuilder, DataSourceError>,
{
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(MAX_ELAPSED),
        ..Default::default()
    };

    retry(backoff, || async {
        let request = build().map_err(backoff::Error::permanent)?;
        let response = request.send().await.map_err(|e| {
            backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
        })?;

        let status = response.status();
        if status == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if status == 401 || status == 403 {
            return Err(backoff::Error::permanent(DataSourceError::Unauthenticated));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            }));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
    })
    .await
}
