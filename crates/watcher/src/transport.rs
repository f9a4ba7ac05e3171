//! HTTP transport for the L1 endpoint.
//!
//! Some hosted providers only accept requests whose fingerprint looks like a known web
//! application. [`ProviderHeadersLayer`] decorates the hyper client backing the alloy HTTP
//! transport so that every outbound request carries a fixed `Origin`, `Referer` and `User-Agent`.

use crate::{
    constants::{DEFAULT_ORIGIN, DEFAULT_REFERER, DEFAULT_USER_AGENT},
    ConnectionError,
};
use std::{
    sync::Arc,
    task::{Context, Poll},
};

use alloy_network::Ethereum;
use alloy_primitives::bytes::Bytes;
use alloy_provider::RootProvider;
use alloy_rpc_client::RpcClient;
use alloy_transport_http::{
    hyper_util::{
        client::legacy::{connect::HttpConnector, Client},
        rt::TokioExecutor,
    },
    Http, HyperClient,
};
use http::{
    header::{ORIGIN, REFERER, USER_AGENT},
    HeaderMap, HeaderValue, Request,
};
use http_body_util::Full;
use hyper_tls::HttpsConnector;
use tower::{Layer, Service, ServiceBuilder};
use url::Url;

/// The hyper client dialing the L1 endpoint over http or https.
pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// The alloy HTTP transport with provider headers injected into every request.
pub type L1Transport = Http<HyperClient<Full<Bytes>, ProviderHeadersService<HttpsClient>>>;

/// The fixed set of headers some providers require before serving traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHeaders {
    origin: HeaderValue,
    referer: HeaderValue,
    user_agent: HeaderValue,
}

impl Default for ProviderHeaders {
    fn default() -> Self {
        Self {
            origin: HeaderValue::from_static(DEFAULT_ORIGIN),
            referer: HeaderValue::from_static(DEFAULT_REFERER),
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }
}

impl ProviderHeaders {
    /// Returns a new [`ProviderHeaders`], validating each value.
    pub fn new(origin: &str, referer: &str, user_agent: &str) -> Result<Self, ConnectionError> {
        let parse = |name: &'static str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|source| ConnectionError::InvalidHeader { name, source })
        };
        Ok(Self {
            origin: parse("origin", origin)?,
            referer: parse("referer", referer)?,
            user_agent: parse("user-agent", user_agent)?,
        })
    }

    /// Returns the headers as a [`HeaderMap`].
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(ORIGIN, self.origin.clone());
        headers.insert(REFERER, self.referer.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers
    }
}

/// A [`Layer`] that sets the [`ProviderHeaders`] on each request before handing it to the inner
/// service.
#[derive(Debug, Clone)]
pub struct ProviderHeadersLayer {
    headers: Arc<HeaderMap>,
}

impl ProviderHeadersLayer {
    /// Returns a new [`ProviderHeadersLayer`] injecting the provided headers.
    pub fn new(headers: &ProviderHeaders) -> Self {
        Self { headers: Arc::new(headers.to_header_map()) }
    }
}

impl<S> Layer<S> for ProviderHeadersLayer {
    type Service = ProviderHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProviderHeadersService { inner, headers: self.headers.clone() }
    }
}

/// The [`Service`] produced by [`ProviderHeadersLayer`]. Responses and errors of the inner
/// service are returned untouched.
#[derive(Debug, Clone)]
pub struct ProviderHeadersService<S> {
    inner: S,
    headers: Arc<HeaderMap>,
}

impl<S, B> Service<Request<B>> for ProviderHeadersService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let headers = request.headers_mut();
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        self.inner.call(request)
    }
}

/// Returns the [`RpcClient`] for the endpoint, dispatching through the header injecting
/// transport.
pub fn http_rpc_client(url: Url, headers: &ProviderHeaders) -> Result<RpcClient, ConnectionError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(ConnectionError::UnsupportedScheme(scheme.to_string())),
    }

    let hyper_client: HttpsClient =
        Client::builder(TokioExecutor::new()).build(HttpsConnector::new());
    let service =
        ServiceBuilder::new().layer(ProviderHeadersLayer::new(headers)).service(hyper_client);
    let transport: L1Transport = Http::with_client(HyperClient::with_service(service), url);

    Ok(RpcClient::new(transport, false))
}

/// Returns a [`RootProvider`] over [`http_rpc_client`].
pub fn http_provider(url: Url, headers: &ProviderHeaders) -> Result<RootProvider, ConnectionError> {
    Ok(RootProvider::<Ethereum>::new(http_rpc_client(url, headers)?))
}
