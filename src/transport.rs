// HTTP transport seam. The API client builds a fully-formed `HttpRequest`
// and hands it to a `Transport`; the blocking reqwest implementation is
// what the binary uses, tests plug in a recording fake.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use crate::error::{FizzyError, FizzyResult};

/// A request ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body text. The body is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    fn execute(&self, request: HttpRequest) -> FizzyResult<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> FizzyResult<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking reqwest transport with the library's default timeouts.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> FizzyResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("fizzy-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn header_map(headers: &[(String, String)]) -> FizzyResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FizzyError::validation(format!("invalid header name {}: {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                FizzyError::validation(format!("invalid value for header {}: {}", name, e))
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> FizzyResult<HttpResponse> {
        let headers = Self::header_map(&request.headers)?;
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send()?;
        let status = res.status().as_u16();
        let body = res.text()?;
        Ok(HttpResponse { status, body })
    }
}
