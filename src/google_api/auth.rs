//! OAuth2 identity client for Google APIs.
//!
//! Two paths to a bearer token:
//! 1. Refresh grant against the token endpoint when a refresh token is on
//!    file (the normal reactive-refresh path).
//! 2. Interactive browser consent: open the consent URL, capture the
//!    redirect on a localhost TcpListener, exchange the auth code.
//!
//! `request_access_token` tries the refresh grant first and falls back to
//! the consent flow, so a revoked refresh token degrades to a re-consent
//! rather than a hard failure.

use std::io::{Read, Write};
use std::net::TcpListener;

use super::{GoogleApiError, IdentityClient};

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Result of a completed interactive consent flow.
#[derive(Debug, Clone)]
pub struct ConsentOutcome {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub email: String,
}

pub struct GoogleIdentity {
    client_id: String,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

impl GoogleIdentity {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<Self, GoogleApiError> {
        let client_id = client_id.ok_or(GoogleApiError::NotConfigured)?;
        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
        })
    }

    /// Exchange the stored refresh token for a fresh access token.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<String, GoogleApiError> {
        let client = reqwest::Client::new();
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = client.post(TOKEN_URI).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let lowered = body.to_lowercase();
            if (status.as_u16() == 400 || status.as_u16() == 401)
                && lowered.contains("invalid_grant")
            {
                return Err(GoogleApiError::AuthExpired);
            }
            return Err(GoogleApiError::RefreshFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)?;
        parsed["access_token"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GoogleApiError::RefreshFailed("No access_token in response".into()))
    }

    /// Run the full browser consent flow.
    ///
    /// 1. Start a TcpListener on a random localhost port
    /// 2. Open the browser with the authorization URL
    /// 3. Wait for the redirect carrying the auth code
    /// 4. Exchange the code for tokens
    /// 5. Fetch the authenticated email
    pub async fn run_consent_flow(&self, scopes: &[&str]) -> Result<ConsentOutcome, GoogleApiError> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}", port);

        let scope_string = scopes.join(" ");
        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            AUTH_URI,
            urlencode(&self.client_id),
            urlencode(&redirect_uri),
            urlencode(&scope_string),
        );

        log::info!("Opening browser for Google OAuth consent...");
        if let Err(e) = open::that(&auth_url) {
            log::warn!("Failed to open browser: {}. URL: {}", e, auth_url);
        }

        listener.set_nonblocking(false)?;
        let auth_code = wait_for_auth_code(&listener)?;

        let client = reqwest::Client::new();
        let mut form = vec![
            ("code", auth_code.as_str()),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = client.post(TOKEN_URI).form(&form).send().await?;
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::RefreshFailed(format!(
                "Token exchange failed: {}",
                body
            )));
        }

        let body: serde_json::Value = resp.json().await?;
        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| GoogleApiError::RefreshFailed("No access_token in response".into()))?
            .to_string();
        let refresh_token = body["refresh_token"].as_str().map(|s| s.to_string());

        let email = fetch_user_email(&access_token).await;

        Ok(ConsentOutcome {
            access_token,
            refresh_token,
            email,
        })
    }
}

#[async_trait::async_trait]
impl IdentityClient for GoogleIdentity {
    async fn request_access_token(&self, scopes: &[&str]) -> Result<String, GoogleApiError> {
        if let Some(ref refresh_token) = self.refresh_token {
            match self.refresh_grant(refresh_token).await {
                Ok(token) => return Ok(token),
                Err(GoogleApiError::AuthExpired) => {
                    log::warn!("Refresh token revoked; falling back to consent flow");
                }
                Err(e) => return Err(e),
            }
        }
        let outcome = self.run_consent_flow(scopes).await?;
        Ok(outcome.access_token)
    }
}

/// Wait for the OAuth redirect and extract the auth code from the URL.
fn wait_for_auth_code(listener: &TcpListener) -> Result<String, GoogleApiError> {
    let (mut stream, _) = listener.accept()?;

    let mut buffer = [0u8; 4096];
    let n = stream.read(&mut buffer)?;
    let request = String::from_utf8_lossy(&buffer[..n]);

    // Extract the code parameter from `GET /?code=xxx&scope=... HTTP/1.1`
    let code = request
        .lines()
        .next()
        .and_then(|line| {
            let path = line.split_whitespace().nth(1)?;
            let query = path.split('?').nth(1)?;
            query
                .split('&')
                .find(|p| p.starts_with("code="))
                .map(|p| p.strip_prefix("code=").unwrap_or("").to_string())
        })
        .unwrap_or_default();

    if code.is_empty() {
        if request.contains("error=") {
            send_response(&mut stream, "Authorization denied. You can close this tab.");
        } else {
            send_response(
                &mut stream,
                "No authorization code received. You can close this tab.",
            );
        }
        return Err(GoogleApiError::FlowCancelled);
    }

    let code = urldecode(&code);
    send_response(
        &mut stream,
        "Authorization successful! You can close this tab and return to daybrief.",
    );

    Ok(code)
}

/// Send a minimal HTTP response back to the browser.
fn send_response(stream: &mut impl Write, message: &str) {
    let body = format!(
        "<html><body style=\"font-family: system-ui; text-align: center; padding: 40px;\">\
         <h2>{}</h2></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Fetch the authenticated user's email address.
///
/// Falls back to "authenticated" if both profile endpoints fail.
async fn fetch_user_email(access_token: &str) -> String {
    let client = reqwest::Client::new();

    match client
        .get("https://gmail.googleapis.com/gmail/v1/users/me/profile")
        .bearer_auth(access_token)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                if let Some(email) = body["emailAddress"].as_str() {
                    return email.to_string();
                }
            }
        }
        _ => {}
    }

    match client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(access_token)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                if let Some(email) = body["email"].as_str() {
                    return email.to_string();
                }
            }
        }
        _ => {}
    }

    "authenticated".to_string()
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn urldecode(s: &str) -> String {
    url::form_urlencoded::parse(format!("v={}", s).as_bytes())
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| s.to_string())
}
