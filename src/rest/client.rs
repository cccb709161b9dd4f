//! HTTP client for the REST data service
//!
//! Wraps `reqwest` with the service's conventions: filter queries on every
//! verb, `Prefer: return=representation` on writes, item-range pagination
//! on reads, and JSON error bodies mapped onto `AppError`.

use std::time::{Duration, Instant};

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::query::Query;
use super::range::{ContentRange, PageRange};
use crate::config::ApiConfig;
use crate::error::AppError;

/// Postgres unique_violation, reported by the service with HTTP 409
const UNIQUE_VIOLATION: &str = "23505";

/// One page of rows plus the service's exact row count
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
}

/// Error body returned by the data service
#[derive(Debug, Default, serde::Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Data service client
///
/// Cheap to share behind an `Arc`; every call is independent and dropping
/// the returned future aborts the request.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl RestClient {
    /// Create a client for the configured data service
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| AppError::Config(format!("api.base_url: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Read every row matching `query`
    pub async fn select<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &Query,
    ) -> Result<Vec<T>, AppError> {
        let url = self.resource_url(resource, query)?;
        let request = self.request(Method::GET, url);
        let response = self.send(Method::GET, resource, request).await?;
        Ok(response.json().await?)
    }

    /// Read one page of rows and the exact total count
    pub async fn select_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &Query,
        range: PageRange,
    ) -> Result<Page<T>, AppError> {
        let url = self.resource_url(resource, query)?;
        let request = self
            .request(Method::GET, url)
            .header("Range", range.header_value())
            .header("Range-Unit", "items")
            .header("Prefer", "count=exact");

        let response = self.execute(Method::GET, resource, request).await?;
        let content_range = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(ContentRange::parse);
        let total = content_range.and_then(|range| range.total);

        // Asking past the last row is not an error for the caller: the page is empty.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            tracing::debug!(resource, page = range.page, ?total, "Requested page is past the end");
            return Ok(Page {
                items: Vec::new(),
                total,
            });
        }

        let response = check_status(response).await?;
        let items: Vec<T> = response.json().await?;
        Ok(Page { items, total })
    }

    /// Create one row and return it as stored (with generated ids)
    pub async fn insert<B, T>(&self, resource: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resource_url(resource, &Query::new())?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(body);

        let response = self.send(Method::POST, resource, request).await?;
        let mut rows: Vec<T> = response.json().await?;
        if rows.is_empty() {
            return Err(AppError::Api {
                status: StatusCode::CREATED.as_u16(),
                message: format!("insert into {resource} returned no row"),
            });
        }
        Ok(rows.swap_remove(0))
    }

    /// Patch matching rows and return them as stored
    pub async fn update<B, T>(
        &self,
        resource: &str,
        query: &Query,
        body: &B,
    ) -> Result<Vec<T>, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .targeted(Method::PATCH, resource, query)?
            .header("Prefer", "return=representation")
            .json(body);

        let response = self.send(Method::PATCH, resource, request).await?;
        Ok(response.json().await?)
    }

    /// Patch matching rows without reading them back
    pub async fn patch<B>(&self, resource: &str, query: &Query, body: &B) -> Result<(), AppError>
    where
        B: Serialize + ?Sized,
    {
        let request = self
            .targeted(Method::PATCH, resource, query)?
            .header("Prefer", "return=minimal")
            .json(body);

        self.send(Method::PATCH, resource, request).await?;
        Ok(())
    }

    /// Delete matching rows
    pub async fn delete(&self, resource: &str, query: &Query) -> Result<(), AppError> {
        let request = self.targeted(Method::DELETE, resource, query)?;
        self.send(Method::DELETE, resource, request).await?;
        Ok(())
    }

    fn resource_url(&self, resource: &str, query: &Query) -> Result<Url, AppError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{resource}"))
            .map_err(|e| AppError::Config(format!("invalid resource url for {resource}: {e}")))?;

        let query_string = query.to_query_string();
        if !query_string.is_empty() {
            url.set_query(Some(&query_string));
        }
        Ok(url)
    }

    /// Writes without a predicate would touch the whole table
    fn targeted(
        &self,
        method: Method,
        resource: &str,
        query: &Query,
    ) -> Result<RequestBuilder, AppError> {
        if query.predicates().is_empty() {
            return Err(AppError::Validation(format!(
                "refusing {method} on {resource} without a filter"
            )));
        }
        let url = self.resource_url(resource, query)?;
        Ok(self.request(method, url))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key).bearer_auth(api_key);
        }
        request
    }

    async fn send(
        &self,
        method: Method,
        resource: &str,
        request: RequestBuilder,
    ) -> Result<Response, AppError> {
        let response = self.execute(method, resource, request).await?;
        check_status(response).await
    }

    /// Issue the request and record metrics, without judging the status
    async fn execute(
        &self,
        method: Method,
        resource: &str,
        request: RequestBuilder,
    ) -> Result<Response, AppError> {
        use crate::metrics::{API_REQUEST_DURATION_SECONDS, API_REQUESTS_TOTAL};

        let started = Instant::now();
        let result = request.send().await;
        let elapsed = started.elapsed().as_secs_f64();

        API_REQUEST_DURATION_SECONDS
            .with_label_values(&[method.as_str(), resource])
            .observe(elapsed);

        match result {
            Ok(response) => {
                let status = response.status();
                API_REQUESTS_TOTAL
                    .with_label_values(&[method.as_str(), resource, status.as_str()])
                    .inc();
                tracing::debug!(
                    method = %method,
                    resource,
                    status = status.as_u16(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Data API request completed"
                );
                Ok(response)
            }
            Err(error) => {
                API_REQUESTS_TOTAL
                    .with_label_values(&[method.as_str(), resource, "error"])
                    .inc();
                tracing::warn!(method = %method, resource, %error, "Data API request failed");
                Err(AppError::HttpClient(error))
            }
        }
    }
}

/// Map non-success responses onto the error taxonomy
async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&raw).unwrap_or_default();
    let message = body
        .message
        .clone()
        .or(body.details.clone())
        .unwrap_or_else(|| {
            if raw.is_empty() {
                status.to_string()
            } else {
                raw.clone()
            }
        });

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
        StatusCode::NOT_FOUND => AppError::NotFound,
        StatusCode::CONFLICT if body.code.as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::Conflict(message)
        }
        _ => AppError::Api {
            status: status.as_u16(),
            message,
        },
    })
}
