//! Client for the Vaasan Sähkö online customer portal.
//!
//! The portal has no public API: logging in means fetching the login page,
//! echoing back its anti-forgery token together with the credentials, and
//! carrying the resulting session cookies into the reporting endpoints.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

pub mod api;
mod error;

pub use error::Error;

pub const PRODUCTION_BASE_URL: &str = "https://online.vaasansahko.fi";

/// Default request timeout for [`CookieSession::new`].
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Account and metering-point identifiers for one portal customer.
///
/// The fields are taken as-is; the portal rejects wrong values itself.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub customer_code: String,
    pub metering_point_code: String,
    pub source_company_code: String,
}

impl Credentials {
    pub fn new(
        email: String,
        password: String,
        customer_code: String,
        metering_point_code: String,
        source_company_code: String,
    ) -> Self {
        Credentials {
            email,
            password,
            customer_code,
            metering_point_code,
            source_company_code,
        }
    }

    pub fn from_env_values() -> Self {
        let email = std::env::var("VAASANSAHKO_EMAIL").expect("VAASANSAHKO_EMAIL must be set");
        let password =
            std::env::var("VAASANSAHKO_PASSWORD").expect("VAASANSAHKO_PASSWORD must be set");
        let customer_code = std::env::var("VAASANSAHKO_CUSTOMER_CODE")
            .expect("VAASANSAHKO_CUSTOMER_CODE must be set");
        let metering_point_code = std::env::var("VAASANSAHKO_METERING_POINT_CODE")
            .expect("VAASANSAHKO_METERING_POINT_CODE must be set");
        let source_company_code = std::env::var("VAASANSAHKO_SOURCE_COMPANY_CODE")
            .expect("VAASANSAHKO_SOURCE_COMPANY_CODE must be set");

        Credentials::new(
            email,
            password,
            customer_code,
            metering_point_code,
            source_company_code,
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("customer_code", &self.customer_code)
            .field("metering_point_code", &self.metering_point_code)
            .field("source_company_code", &self.source_company_code)
            .finish()
    }
}

/// Cookie-persisting HTTP session shared by the login handshake and the
/// reporting calls.
///
/// The session is caller-supplied and caller-owned: implementations must keep
/// cookies set by one response across subsequent requests, since the portal's
/// authentication lives entirely in them. Response status codes are not
/// interpreted at this seam; only transport failures are errors.
#[async_trait]
pub trait HttpSession: Send + Sync {
    /// Performs a GET request and returns the response body.
    async fn get_text(&self, url: &str) -> Result<String, Error>;

    /// Performs a POST request with an URL-encoded form body and returns the
    /// response body.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, Error>;
}

/// [`HttpSession`] backed by a [`reqwest::Client`] with a cookie store.
#[derive(Debug, Clone)]
pub struct CookieSession {
    inner: reqwest::Client,
}

impl CookieSession {
    pub fn new() -> Result<Self, Error> {
        let inner = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("vaasansahko/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(CookieSession { inner })
    }

    /// Wraps a caller-configured client. The client must have a cookie store
    /// enabled, otherwise the login handshake cannot stick.
    pub fn from_client(inner: reqwest::Client) -> Self {
        CookieSession { inner }
    }
}

#[async_trait]
impl HttpSession for CookieSession {
    async fn get_text(&self, url: &str) -> Result<String, Error> {
        debug!(url, "GET");
        let response = self.inner.get(url).send().await?;
        debug!(status = %response.status(), "response received");
        Ok(response.text().await?)
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, Error> {
        debug!(url, "POST form");
        let response = self.inner.post(url).form(form).send().await?;
        debug!(status = %response.status(), "response received");
        Ok(response.text().await?)
    }
}
