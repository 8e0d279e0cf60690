use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// The inner payload of a successful fetch: the (possibly redirected)
/// final URL and the raw body bytes.
pub struct RawResponse {
    pub url: String,
    pub content: Vec<u8>,
}

/// Result of one fetch attempt: status, resolved url, optional body,
/// and the `FetchError` describing why `raw_response` is `None` when
/// that's the case. The content pipeline treats any populated `error`
/// the same as a non-200 status: the page is skipped.
pub struct Response {
    pub status: u16,
    pub url: String,
    pub raw_response: Option<RawResponse>,
    pub error: Option<FetchError>,
}

/// The crawler core treats fetching as an external, thread-safe
/// collaborator — this trait is the seam tests substitute a canned
/// fetcher through.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Response;
}

/// A `reqwest`-backed fetcher, generalized from a synchronous polite
/// HTTP client into the async `Fetcher` seam.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; academic-crawler/0.1)")
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Response {
        let request = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Response {
                    status: 0,
                    url: url.to_string(),
                    raw_response: None,
                    error: Some(FetchError::from(e)),
                }
            }
        };

        let status = request.status();
        let final_url = request.url().to_string();

        if !status.is_success() {
            return Response {
                status: status.as_u16(),
                url: final_url,
                raw_response: None,
                error: Some(FetchError::HttpError(status.as_u16())),
            };
        }

        if let Some(content_type) = request.headers().get("content-type") {
            let content_type_str = content_type.to_str().unwrap_or("");
            if !content_type_str.contains("text/html") {
                return Response {
                    status: status.as_u16(),
                    url: final_url,
                    raw_response: None,
                    error: Some(FetchError::InvalidContentType(content_type_str.to_string())),
                };
            }
        }

        if let Some(len) = request.content_length() {
            if len as usize > MAX_RESPONSE_SIZE {
                return Response {
                    status: status.as_u16(),
                    url: final_url,
                    raw_response: None,
                    error: Some(FetchError::TooLarge(len)),
                };
            }
        }

        match request.bytes().await {
            Ok(body) if body.len() <= MAX_RESPONSE_SIZE => Response {
                status: status.as_u16(),
                url: final_url.clone(),
                raw_response: Some(RawResponse {
                    url: final_url,
                    content: body.to_vec(),
                }),
                error: None,
            },
            Ok(body) => Response {
                status: status.as_u16(),
                url: final_url,
                raw_response: None,
                error: Some(FetchError::TooLarge(body.len() as u64)),
            },
            Err(e) => Response {
                status: status.as_u16(),
                url: final_url,
                raw_response: None,
                error: Some(FetchError::from(e)),
            },
        }
    }
}
