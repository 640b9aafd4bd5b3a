//! Graph API client implementation
//!
//! This module provides the client used to talk to Meta's Graph API and the
//! scoped managers for each kind of node: apps, the current user, businesses,
//! WABAs and Pages.
//!
//! The client is **stateless with respect to credentials**: every operation takes
//! the access token it should use, because the tool juggles several at once (the
//! app token, the user token, and one token per Page).
//!
//! # Example – Creating a Client
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use meta_graph_doctor::client::Client;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder()
//!     .timeout(Duration::from_secs(15))
//!     .api_version("v21.0")
//!     .build()?;
//! # Ok(()) }
//! ```

use std::{fmt, sync::Arc, time::Duration};

use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, ClientBuilder as HttpClientBuilder, RequestBuilder, Url};
use sha2::Sha256;
use tracing::debug;

use crate::{
    app::AppManager, business::BusinessManager, error::Error, me::MeManager, page::PageManager,
    waba::WabaManager,
};

/// Default Graph API version
pub const DEFAULT_API_VERSION: &str = "21.0";
/// Default Graph API host
pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
/// Default user agent for the client
const USER_AGENT: &str = concat!("meta-graph-doctor/", env!("CARGO_PKG_VERSION"), " (Rust)");

type HmacSha256 = Hmac<Sha256>;

/// The entry point for calling the **Graph API**.
///
/// Cloning is cheap; clones share the same connection pool.
///
/// # Key Capabilities (Sub-Managers)
///
/// - `.app(app_id)`: token debugging and app webhook subscriptions.
/// - `.me()`: businesses, Pages and the profile of the token's owner.
/// - `.business(business_id)`: WABAs owned by a business.
/// - `.waba(waba_id)`: WABA details, phone numbers, subscribed apps.
/// - `.page(page_id)`: Page subscribed apps and linked Instagram account.
///
/// # Example
/// ```rust,no_run
/// use meta_graph_doctor::Client;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new()?;
/// let businesses = client.me().businesses("USER_TOKEN").await?;
/// # Ok(()) }
/// ```
///
/// # Important Authentication Note ⚠️
///
/// The client does not check that a token suits an operation, nor that it is
/// non-empty. Meta's API rejects bad tokens and the rejection comes back as an
/// [`Error::Graph`].
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<InnerClient>,
}

#[derive(Debug)]
struct InnerClient {
    http_client: HttpClient,
    base: Url,
    app_secret: Option<AppSecret>,
}

/// The Meta App Secret, used for `appsecret_proof`.
///
/// Its `Debug` output is redacted.
#[derive(PartialEq, Eq, Clone)]
pub struct AppSecret(pub String);

impl fmt::Debug for AppSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppSecret(REDACTED)")
    }
}

impl<T: Into<String>> From<T> for AppSecret {
    #[inline]
    fn from(value: T) -> Self {
        AppSecret(value.into())
    }
}

impl Client {
    /// Creates a client with the default configuration.
    ///
    /// # Example
    /// ```rust,no_run
    /// use meta_graph_doctor::Client;
    ///
    /// let client = Client::new().unwrap();
    /// ```
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Starts building a client with custom settings.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns an App manager for token debugging and app-level webhook subscriptions.
    pub fn app(&self, app_id: impl Into<String>) -> AppManager {
        AppManager::new(app_id.into(), self)
    }

    /// Returns a manager for the node owning the access token (`/me`).
    pub fn me(&self) -> MeManager {
        MeManager::new(self)
    }

    /// Returns a manager for a Business Manager account.
    pub fn business(&self, business_id: impl Into<String>) -> BusinessManager {
        BusinessManager::new(business_id.into(), self)
    }

    /// Returns a WABA manager.
    pub fn waba(&self, waba_id: impl Into<String>) -> WabaManager {
        WabaManager::new(waba_id.into(), self)
    }

    /// Returns a Page manager. Page operations expect the Page's own token.
    pub fn page(&self, page_id: impl Into<String>) -> PageManager {
        PageManager::new(page_id.into(), self)
    }

    /// The versioned base URL, e.g. `https://graph.facebook.com/v21.0`.
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }
}

/// Builds a [`Client`].
///
/// # Example
/// ```rust,no_run
/// use meta_graph_doctor::client::ClientBuilder;
///
/// let client = ClientBuilder::new().api_version("20.0").build().unwrap();
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    http: HttpClientBuilder,
    api_version: String,
    base_url: String,
    user_agent: String,
    app_secret: Option<AppSecret>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            http: HttpClientBuilder::new(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: USER_AGENT.to_owned(),
            app_secret: None,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout for all Graph API calls.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.http = self.http.timeout(duration);
        self
    }

    /// Sets the Graph API version to use (e.g. `"21.0"`).
    ///
    /// If you add the `"v"` prefix, it will be removed.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the API host. Mostly useful to point the client at a mock server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Signs every call with `appsecret_proof`, required by apps that enable
    /// "Require App Secret" in their advanced settings.
    pub fn app_secret(mut self, app_secret: impl Into<AppSecret>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Finishes building the client.
    pub fn build(self) -> Result<Client, Error> {
        let version = self.api_version.trim_start_matches('v');
        let raw = format!("{}/v{version}", self.base_url.trim_end_matches('/'));
        let base = Url::parse(&raw)
            .map_err(|err| Error::internal(format!("Invalid base URL {raw:?}: {err}").into()))?;

        if base.cannot_be_a_base() {
            return Err(Error::internal(
                format!("Base URL {raw:?} cannot carry a path").into(),
            ));
        }

        let http_client = self.http.user_agent(self.user_agent).build()?;
        Ok(Client {
            inner: Arc::new(InnerClient {
                http_client,
                base,
                app_secret: self.app_secret,
            }),
        })
    }
}

/// A Graph URL under construction. Segments are percent-encoded as they are joined.
#[derive(Clone, Debug)]
pub(crate) struct Endpoint {
    url: Url,
}

impl Endpoint {
    #[inline]
    pub(crate) fn join(mut self, segment: &str) -> Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        self
    }

    pub(crate) fn as_url(&self) -> &Url {
        &self.url
    }
}

impl Client {
    #[inline(always)]
    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint {
            url: self.inner.base.clone(),
        }
    }

    #[inline(always)]
    pub(crate) fn a_node(&self, node: &str) -> Endpoint {
        self.endpoint().join(node)
    }

    #[inline]
    pub(crate) fn get(&self, endpoint: Endpoint, access_token: &str) -> RequestBuilder {
        debug!(method = "GET", path = endpoint.as_url().path(), "graph request");
        let request = self.inner.http_client.get(endpoint.url);
        self.authorize(request, access_token)
    }

    #[inline]
    pub(crate) fn post(&self, endpoint: Endpoint, access_token: &str) -> RequestBuilder {
        debug!(method = "POST", path = endpoint.as_url().path(), "graph request");
        let request = self.inner.http_client.post(endpoint.url);
        self.authorize(request, access_token)
    }

    // The token travels as a query parameter, which reqwest URL-encodes.
    fn authorize(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        let request = request.query(&[("access_token", access_token)]);
        match self
            .inner
            .app_secret
            .as_ref()
            .and_then(|secret| appsecret_proof(&secret.0, access_token))
        {
            Some(proof) => request.query(&[("appsecret_proof", proof)]),
            None => request,
        }
    }
}

/// `hex(HMAC-SHA256(key = app_secret, message = access_token))`
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(access_token.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn endpoint() {
        macro_rules! test {
            ($endpoint:expr, $want:literal) => {
                assert_eq!($endpoint.as_url().as_str(), $want);
            };
        }

        let client = Client::builder().api_version("20.0").build().unwrap();
        test!(client.endpoint(), "https://graph.facebook.com/v20.0");
        test!(
            client.a_node("debug_token"),
            "https://graph.facebook.com/v20.0/debug_token"
        );
        test!(
            client.a_node("me").join("accounts"),
            "https://graph.facebook.com/v20.0/me/accounts"
        );

        let client = Client::builder().api_version("v20.0").build().unwrap();
        test!(client.endpoint(), "https://graph.facebook.com/v20.0");
    }

    #[test]
    fn endpoint_encodes_segments() {
        let client = Client::builder()
            .base_url("http://127.0.0.1:9999/")
            .build()
            .unwrap();

        let url = client.a_node("a/b c");
        assert_eq!(url.as_url().as_str(), "http://127.0.0.1:9999/v21.0/a%2Fb%20c");
    }

    #[test]
    fn token_is_a_query_parameter() {
        let client = Client::new().unwrap();
        let request = client
            .get(client.a_node("me"), "EAA+/=&x")
            .build()
            .unwrap();

        let token = request
            .url()
            .query_pairs()
            .find(|(key, _)| key == "access_token")
            .map(|(_, value)| value.into_owned());
        assert_eq!(token.as_deref(), Some("EAA+/=&x"));
        assert!(!request.url().query().unwrap_or_default().contains("appsecret_proof"));
    }

    #[test]
    fn proof_is_added_with_app_secret() {
        let client = Client::builder().app_secret("s3cr3t").build().unwrap();
        let request = client.get(client.a_node("me"), "TOKEN").build().unwrap();

        let proof = request
            .url()
            .query_pairs()
            .find(|(key, _)| key == "appsecret_proof")
            .map(|(_, value)| value.into_owned());
        assert_eq!(proof, appsecret_proof("s3cr3t", "TOKEN"));
    }

    #[test]
    fn proof_is_hex_sha256() {
        let proof = appsecret_proof("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            proof,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn secret_debug_is_redacted() {
        assert_eq!(format!("{:?}", AppSecret::from("abc")), "AppSecret(REDACTED)");
    }
}
