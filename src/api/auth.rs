use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument};

use crate::{Credentials, Error, HttpSession, PRODUCTION_BASE_URL};

static TOKEN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="__RequestVerificationToken"]"#).expect("Invalid selector")
});

/// Login handshake against the portal.
///
/// The portal guards its login form with a per-session anti-forgery token
/// embedded in the unauthenticated index page; submitting the form with that
/// token sets the session cookies on the shared [`HttpSession`].
pub struct AuthSession<'a> {
    session: &'a dyn HttpSession,
    credentials: &'a Credentials,
    base_url: String,
}

impl<'a> AuthSession<'a> {
    const INDEX_PATH: &'static str = "/eServices/Online/IndexNoAuth";
    const LOGIN_PATH: &'static str = "/eServices/Online/Login";

    pub fn new(session: &'a dyn HttpSession, credentials: &'a Credentials) -> Self {
        AuthSession {
            session,
            credentials,
            base_url: PRODUCTION_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Performs the full login handshake from scratch: fetches the index
    /// page, extracts the token, submits the login form.
    ///
    /// The login response itself is not inspected — the portal answers with
    /// a redirect page either way, and success is only observable through
    /// the session cookies. A wrong password therefore surfaces later, when
    /// the first authenticated call fails.
    #[instrument(skip_all)]
    pub async fn login(&self) -> Result<(), Error> {
        let index_url = format!("{}{}", self.base_url, Self::INDEX_PATH);
        let html = self.session.get_text(&index_url).await?;

        let token = extract_verification_token(&html).ok_or(Error::Authentication)?;
        debug!(token_len = token.len(), "extracted verification token");

        let login_url = format!("{}{}", self.base_url, Self::LOGIN_PATH);
        let form = [
            ("__RequestVerificationToken", token.as_str()),
            ("UserName", self.credentials.email.as_str()),
            ("Password", self.credentials.password.as_str()),
        ];
        self.session.post_form(&login_url, &form).await?;

        Ok(())
    }
}

/// Pulls the anti-forgery token out of the portal's login page.
///
/// The page carries it as
/// `<input name="__RequestVerificationToken" type="hidden" value="..." />`.
/// Lookup goes through an HTML parser rather than a literal text match, so
/// attribute order, quoting and whitespace in the portal's markup do not
/// matter; a page without the input yields `None`.
pub fn extract_verification_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TOKEN_SELECTOR)
        .next()?
        .value()
        .attr("value")
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSession;

    const LOGIN_PAGE: &str = r#"<html><body>
        <form action="/eServices/Online/Login" method="post">
        <input name="__RequestVerificationToken" type="hidden" value="ABC123" />
        </form></body></html>"#;

    fn credentials() -> Credentials {
        Credentials::new(
            "user@example.com".to_string(),
            "p&ss wörd=".to_string(),
            "12345".to_string(),
            "678".to_string(),
            "90".to_string(),
        )
    }

    #[test]
    fn extracts_token_from_login_page() {
        assert_eq!(
            extract_verification_token(LOGIN_PAGE),
            Some("ABC123".to_string())
        );
    }

    #[test]
    fn extracts_token_regardless_of_attribute_order() {
        let html = r#"<input type="hidden" value="XYZ" name="__RequestVerificationToken">"#;
        assert_eq!(extract_verification_token(html), Some("XYZ".to_string()));
    }

    #[test]
    fn no_token_in_page_yields_none() {
        assert_eq!(
            extract_verification_token("<html><body>maintenance</body></html>"),
            None
        );
        assert_eq!(
            extract_verification_token(r#"<input name="other" value="x">"#),
            None
        );
    }

    #[tokio::test]
    async fn login_submits_token_and_credentials() -> Result<(), Error> {
        let session = MockSession::new();
        session.push_text(LOGIN_PAGE);
        session.push_text("");

        let credentials = credentials();
        AuthSession::new(&session, &credentials).login().await?;

        let requests = session.requests();
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].method, "GET");
        assert_eq!(
            requests[0].url,
            "https://online.vaasansahko.fi/eServices/Online/IndexNoAuth"
        );

        assert_eq!(requests[1].method, "POST");
        assert_eq!(
            requests[1].url,
            "https://online.vaasansahko.fi/eServices/Online/Login"
        );
        assert_eq!(
            requests[1].form,
            vec![
                (
                    "__RequestVerificationToken".to_string(),
                    "ABC123".to_string()
                ),
                ("UserName".to_string(), "user@example.com".to_string()),
                ("Password".to_string(), "p&ss wörd=".to_string()),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_respects_base_url_override() -> Result<(), Error> {
        let session = MockSession::new();
        session.push_text(LOGIN_PAGE);
        session.push_text("");

        let credentials = credentials();
        AuthSession::new(&session, &credentials)
            .with_base_url("http://localhost:8080".to_string())
            .login()
            .await?;

        let requests = session.requests();
        assert_eq!(
            requests[0].url,
            "http://localhost:8080/eServices/Online/IndexNoAuth"
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_fails_without_token_and_does_not_post() {
        let session = MockSession::new();
        session.push_text("<html><body>no form here</body></html>");

        let credentials = credentials();
        let result = AuthSession::new(&session, &credentials).login().await;

        assert!(matches!(result, Err(Error::Authentication)));
        // The handshake must stop before submitting anything.
        assert_eq!(session.requests().len(), 1);
    }

    #[tokio::test]
    async fn login_surfaces_network_errors() {
        let session = MockSession::new();
        session.push_error(Error::Network("connection failed".to_string()));

        let credentials = credentials();
        let result = AuthSession::new(&session, &credentials).login().await;

        assert!(matches!(result, Err(Error::Network(_))));
    }
}
