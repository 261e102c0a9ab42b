//! An HTTP client that fetches settings from the server.
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Duration,
};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH},
    StatusCode, Url,
};

use crate::{
    response::try_parse_response, settings::SettingsSnapshot, Error, FetcherConfig, Result,
};

/// A single settings request: URL, query parameters and headers.
///
/// ```
/// # use onesettings::SettingsRequest;
/// let request = SettingsRequest::new("https://settings.example.com/settings")
///     .query("namespace", "python")
///     .if_none_match(Some("\"etag-from-last-snapshot\""));
/// ```
#[derive(Debug, Clone)]
pub struct SettingsRequest {
    url: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
}

impl SettingsRequest {
    /// Create a request for `url` with no query parameters or headers.
    pub fn new(url: impl Into<String>) -> SettingsRequest {
        SettingsRequest {
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> SettingsRequest {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a request header. Headers with an invalid name or value are skipped.
    pub fn header(mut self, name: &str, value: &str) -> SettingsRequest {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                log::warn!(target: "onesettings", header = name; "skipping invalid request header");
            }
        }
        self
    }

    /// Ask the server to answer `304 Not Modified` if settings still match `etag`.
    ///
    /// Pass the [`etag`](SettingsSnapshot::etag) of the last successful snapshot. `None` leaves
    /// the request unconditional.
    pub fn if_none_match(self, etag: Option<&str>) -> SettingsRequest {
        match etag {
            Some(etag) => self.header(IF_NONE_MATCH.as_str(), etag),
            None => self,
        }
    }

    /// Full request URL, including query parameters.
    pub fn url(&self) -> Result<Url> {
        Url::parse_with_params(&self.url, &self.query).map_err(Error::InvalidUrl)
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// A response as returned by a [`Transport`].
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Performs a single GET request.
///
/// Implemented by [`HttpTransport`] and by any `Fn(&SettingsRequest, Duration) ->
/// Result<RawResponse>` closure.
pub trait Transport {
    /// Send `request`, giving up after `timeout`.
    fn send(&self, request: &SettingsRequest, timeout: Duration) -> Result<RawResponse>;
}

impl<F> Transport for F
where
    F: Fn(&SettingsRequest, Duration) -> Result<RawResponse>,
{
    fn send(&self, request: &SettingsRequest, timeout: Duration) -> Result<RawResponse> {
        self(request, timeout)
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
///
/// Like any blocking `reqwest` client, it must not be created or used from within an async
/// runtime.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a new transport with a fresh connection pool.
    pub fn new() -> Result<HttpTransport> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(HttpTransport { client })
    }
}

impl From<reqwest::blocking::Client> for HttpTransport {
    fn from(client: reqwest::blocking::Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &SettingsRequest, timeout: Duration) -> Result<RawResponse> {
        let response = self
            .client
            .get(request.url()?)
            .headers(request.headers().clone())
            .timeout(timeout)
            .send()?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// A client that fetches settings snapshots from the server.
///
/// Every fetch is a single attempt bounded by [`FetcherConfig::timeout`]; retrying is up to the
/// caller, usually after [`SettingsSnapshot::refresh_interval`].
pub struct SettingsFetcher<T = HttpTransport> {
    transport: T,
    config: FetcherConfig,
}

impl SettingsFetcher<HttpTransport> {
    /// Create a fetcher that talks HTTP through `reqwest`.
    pub fn new(config: FetcherConfig) -> Result<SettingsFetcher<HttpTransport>> {
        Ok(SettingsFetcher::with_transport(HttpTransport::new()?, config))
    }
}

impl<T: Transport> SettingsFetcher<T> {
    /// Create a fetcher that sends requests through `transport`.
    pub fn with_transport(transport: T, config: FetcherConfig) -> SettingsFetcher<T> {
        SettingsFetcher { transport, config }
    }

    /// Fetch settings, collapsing every failure into [`SettingsSnapshot::failed`].
    ///
    /// This never panics and never returns an error. When the returned snapshot has
    /// [`has_error`](SettingsSnapshot::has_error) set, all other fields are defaults and
    /// `status_code` is `200` regardless of what the server answered.
    pub fn fetch(&self, request: &SettingsRequest) -> SettingsSnapshot {
        self.try_fetch(request).unwrap_or_else(|err| {
            log::warn!(target: "onesettings", "failed to fetch settings: {}", err);
            SettingsSnapshot::failed()
        })
    }

    /// Fetch settings, reporting the exact failure.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`], [`Error::Connection`] or [`Error::Network`] if the request failed.
    /// - [`Error::HttpStatus`] if the server answered with a 4xx or 5xx status.
    /// - [`Error::MalformedBody`] or [`Error::MalformedHeader`] if the response can't be parsed.
    /// - [`Error::InvalidUrl`] if the request URL is invalid.
    /// - [`Error::Unexpected`] if the transport panicked.
    pub fn try_fetch(&self, request: &SettingsRequest) -> Result<SettingsSnapshot> {
        log::debug!(target: "onesettings", url = request.url.as_str(); "fetching settings");

        let response = panic::catch_unwind(AssertUnwindSafe(|| {
            self.transport.send(request, self.config.timeout)
        }))
        .map_err(|payload| Error::Unexpected(panic_message(&*payload)))??;

        if response.status.is_client_error() || response.status.is_server_error() {
            return Err(Error::HttpStatus(response.status));
        }

        let snapshot = try_parse_response(response.status, &response.headers, &response.body)?;

        log::debug!(target: "onesettings",
                    status = snapshot.status_code,
                    etag:serde = snapshot.etag,
                    change_version:serde = snapshot.change_version;
                    "successfully fetched settings");

        Ok(snapshot)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "transport panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use reqwest::{
        header::{HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH},
        StatusCode,
    };

    use crate::{
        settings::{SettingsSnapshot, CHANGE_VERSION_KEY, DEFAULT_REFRESH_INTERVAL_SECS},
        Error, FetcherConfig, Result,
    };

    use super::{RawResponse, SettingsFetcher, SettingsRequest};

    fn response(
        status: u16,
        headers: &[(&'static str, &'static str)],
        body: &[u8],
    ) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.parse::<HeaderName>().unwrap(),
                        HeaderValue::from_static(*value),
                    )
                })
                .collect::<HeaderMap>(),
            body: body.to_vec(),
        }
    }

    fn assert_failed(result: &SettingsSnapshot) {
        assert!(result.has_error);
        assert_eq!(result.etag, None);
        assert_eq!(result.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert!(result.settings.is_empty());
        assert_eq!(result.change_version, None);
        assert_eq!(result.status_code, 200);
    }

    #[test]
    fn successful_request() {
        let seen = Mutex::new(None);
        let fetcher = SettingsFetcher::with_transport(
            |request: &SettingsRequest, timeout: Duration| -> Result<RawResponse> {
                *seen.lock().unwrap() = Some((
                    request.url()?.to_string(),
                    request.headers().clone(),
                    timeout,
                ));
                let body = serde_json::json!({
                    "settings": { "key": "value", CHANGE_VERSION_KEY: "5" }
                });
                Ok(response(
                    200,
                    &[("ETag", "test-etag"), ("x-ms-onesetinterval", "30")],
                    body.to_string().as_bytes(),
                ))
            },
            FetcherConfig::new(),
        );

        let request = SettingsRequest::new("http://test.com")
            .query("param", "value")
            .header("header", "value");
        let result = fetcher.fetch(&request);

        let (url, headers, timeout) = seen.lock().unwrap().take().unwrap();
        assert_eq!(url, "http://test.com/?param=value");
        assert_eq!(headers.get("header").unwrap(), "value");
        assert_eq!(timeout, Duration::from_secs(10));

        assert_eq!(result.etag.as_deref(), Some("test-etag"));
        assert_eq!(result.refresh_interval_secs, 1800);
        assert_eq!(result.settings.len(), 2);
        assert_eq!(result.settings.get("key").unwrap(), "value");
        assert_eq!(result.change_version, Some(5));
        assert_eq!(result.status_code, 200);
        assert!(!result.has_error);
    }

    #[test]
    fn sends_if_none_match() {
        let seen = Mutex::new(HeaderMap::new());
        let fetcher = SettingsFetcher::with_transport(
            |request: &SettingsRequest, _: Duration| -> Result<RawResponse> {
                *seen.lock().unwrap() = request.headers().clone();
                Ok(response(304, &[("ETag", "cached-etag")], b""))
            },
            FetcherConfig::new(),
        );

        let result =
            fetcher.fetch(&SettingsRequest::new("http://test.com").if_none_match(Some("cached-etag")));

        assert_eq!(seen.lock().unwrap().get(IF_NONE_MATCH).unwrap(), "cached-etag");
        assert!(!result.has_error);
        assert!(result.is_not_modified());
        assert_eq!(result.etag.as_deref(), Some("cached-etag"));
        assert!(result.settings.is_empty());
    }

    #[test]
    fn custom_timeout_is_passed_to_transport() {
        let fetcher = SettingsFetcher::with_transport(
            |_: &SettingsRequest, timeout: Duration| -> Result<RawResponse> {
                assert_eq!(timeout, Duration::from_secs(3));
                Err(Error::Timeout)
            },
            FetcherConfig::new().with_timeout(Duration::from_secs(3)),
        );

        assert_failed(&fetcher.fetch(&SettingsRequest::new("http://test.com")));
    }

    #[test]
    fn request_timeout() {
        let fetcher = SettingsFetcher::with_transport(
            |_: &SettingsRequest, _: Duration| -> Result<RawResponse> { Err(Error::Timeout) },
            FetcherConfig::new(),
        );
        let request = SettingsRequest::new("http://test.com");

        assert_failed(&fetcher.fetch(&request));
        assert!(matches!(fetcher.try_fetch(&request), Err(Error::Timeout)));
    }

    #[test]
    fn connection_failure() {
        let fetcher = SettingsFetcher::with_transport(
            |_: &SettingsRequest, _: Duration| -> Result<RawResponse> {
                Err(Error::Connection("Connection failed".to_owned()))
            },
            FetcherConfig::new(),
        );

        assert_failed(&fetcher.fetch(&SettingsRequest::new("http://test.com")));
    }

    #[test]
    fn http_error_statuses_reset_to_200() {
        for status in [400, 401, 403, 404, 429, 500, 502, 503, 504] {
            let fetcher = SettingsFetcher::with_transport(
                move |_: &SettingsRequest, _: Duration| -> Result<RawResponse> {
                    Ok(response(status, &[("ETag", "error-etag")], b"{}"))
                },
                FetcherConfig::new(),
            );
            let request = SettingsRequest::new("http://test.com");

            let result = fetcher.fetch(&request);
            assert_failed(&result);
            assert_eq!(result, SettingsSnapshot::failed());

            assert!(matches!(
                fetcher.try_fetch(&request),
                Err(Error::HttpStatus(code)) if code.as_u16() == status
            ));
        }
    }

    #[test]
    fn transport_panic() {
        let fetcher = SettingsFetcher::with_transport(
            |_: &SettingsRequest, _: Duration| -> Result<RawResponse> {
                panic!("Unexpected error")
            },
            FetcherConfig::new(),
        );
        let request = SettingsRequest::new("http://test.com");

        assert_failed(&fetcher.fetch(&request));
        assert!(matches!(
            fetcher.try_fetch(&request),
            Err(Error::Unexpected(message)) if message == "Unexpected error"
        ));
    }

    #[test]
    fn malformed_body() {
        let fetcher = SettingsFetcher::with_transport(
            |_: &SettingsRequest, _: Duration| -> Result<RawResponse> {
                Ok(response(200, &[("ETag", "test-etag")], b"invalid json content"))
            },
            FetcherConfig::new(),
        );
        let request = SettingsRequest::new("http://test.com");

        assert_failed(&fetcher.fetch(&request));
        assert!(matches!(
            fetcher.try_fetch(&request),
            Err(Error::MalformedBody(_))
        ));
    }

    #[test]
    fn malformed_interval_header() {
        let fetcher = SettingsFetcher::with_transport(
            |_: &SettingsRequest, _: Duration| -> Result<RawResponse> {
                Ok(response(200, &[("x-ms-onesetinterval", "-5")], br#"{"settings": {}}"#))
            },
            FetcherConfig::new(),
        );

        assert_failed(&fetcher.fetch(&SettingsRequest::new("http://test.com")));
    }

    #[test]
    fn invalid_header_is_skipped() {
        let request = SettingsRequest::new("http://test.com")
            .header("bad header", "value")
            .header("good", "line\nbreak")
            .header("x-ok", "1");

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.headers().get("x-ok").unwrap(), "1");
    }

    #[test]
    fn invalid_url() {
        let fetcher = SettingsFetcher::new(FetcherConfig::new()).unwrap();
        let request = SettingsRequest::new("not a url");

        assert_failed(&fetcher.fetch(&request));
        assert!(matches!(fetcher.try_fetch(&request), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn unreachable_server() {
        let fetcher =
            SettingsFetcher::new(FetcherConfig::new().with_timeout(Duration::from_secs(1)))
                .unwrap();

        assert_failed(&fetcher.fetch(&SettingsRequest::new("http://127.0.0.1:1/settings")));
    }
}
