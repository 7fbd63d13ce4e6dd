//! Interactive OAuth2 authorization-code flow over the out-of-band redirect.
//!
//! There is no HTTP callback server in this flow: the authorization URL uses
//! the OOB sentinel redirect, the user authorizes in a browser, and the
//! provider displays a code for the user to paste back into the client.

use crate::error::{AuthError, ConfigError, StatusError};
use crate::token::{expiry_from_secs, Token};
use base64::engine::general_purpose::URL_SAFE as B64_URL;
use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use std::io::BufRead;

/// Out-of-band redirect target; no server listens here, the provider shows
/// the code to the user instead.
pub const OOB_REDIRECT_URL: &str = "urn:ietf:wg:oauth:2.0:oob";

/// The only scopes this client ever needs: basic profile plus OpenID.
const DEFAULT_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "openid",
];

/// OAuth2 client configuration for the authorization-code flow.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct InstalledDocument {
    installed: InstalledClient,
}

/// The relevant subset of a Google `client_secret.json` "installed" section.
#[derive(Debug, Deserialize)]
struct InstalledClient {
    client_id: String,
    #[serde(default)]
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

impl OauthConfig {
    /// Parse an OAuth client config from the Google "installed application"
    /// client-secret JSON document, fixing the scopes and redirect to the
    /// values this flow requires.
    pub fn from_installed_json(data: &str) -> Result<Self, ConfigError> {
        let doc: InstalledDocument = serde_json::from_str(data)?;
        let client = doc.installed;
        if client.client_id.is_empty() {
            return Err(ConfigError::Invalid(
                "client secret document has no client_id".to_string(),
            ));
        }
        Ok(Self {
            client_id: client.client_id,
            client_secret: client.client_secret,
            auth_url: client.auth_uri,
            token_url: client.token_uri,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            redirect_url: OOB_REDIRECT_URL.to_string(),
        })
    }

    /// Build the authorization endpoint URL the user must visit.
    ///
    /// Always requests `access_type=offline` so the provider issues a
    /// refresh token. The `state` value appears in the URL but is never
    /// verified afterwards; with no redirect callback there is nothing to
    /// check it against.
    pub fn auth_code_url(&self, state: &str) -> Result<String, ConfigError> {
        let scopes = self.scopes.join(" ");
        let url = reqwest::Url::parse_with_params(
            &self.auth_url,
            [
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", scopes.as_str()),
                ("access_type", "offline"),
                ("state", state),
            ],
        )
        .map_err(|err| {
            ConfigError::Invalid(format!(
                "bad authorization endpoint `{}`: {err}",
                self.auth_url
            ))
        })?;
        Ok(url.to_string())
    }

    /// Exchange a pasted authorization code for an OAuth2 access token.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<Token, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
        ];
        let response = http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StatusError::new(status.as_u16(), body).into());
        }
        // Token endpoints answer JSON or, on some older providers,
        // form-encoded text. Dispatch on the response content type.
        if content_type.starts_with("application/x-www-form-urlencoded")
            || content_type.starts_with("text/plain")
        {
            token_from_form(&body)
        } else {
            token_from_json(&body)
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(deserialize_with = "deserialize_secs_option", default)]
    expires_in: Option<f64>,
}

fn token_from_json(body: &str) -> Result<Token, AuthError> {
    let parsed: TokenEndpointResponse = serde_json::from_str(body)
        .map_err(|err| AuthError::Decode(format!("failed to parse token response: {err}")))?;
    finish_token(parsed)
}

fn token_from_form(body: &str) -> Result<Token, AuthError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
        .map_err(|err| AuthError::Decode(format!("failed to parse token response: {err}")))?;
    let mut parsed = TokenEndpointResponse {
        access_token: String::new(),
        token_type: None,
        refresh_token: None,
        id_token: None,
        expires_in: None,
    };
    for (key, value) in pairs {
        match key.as_str() {
            "access_token" => parsed.access_token = value,
            "token_type" => parsed.token_type = Some(value),
            "refresh_token" => parsed.refresh_token = Some(value),
            "id_token" => parsed.id_token = Some(value),
            "expires_in" => {
                let secs: f64 = value.trim().parse().map_err(|err| {
                    AuthError::Decode(format!("invalid expires_in value `{value}`: {err}"))
                })?;
                parsed.expires_in = Some(secs);
            }
            _ => {}
        }
    }
    finish_token(parsed)
}

fn finish_token(parsed: TokenEndpointResponse) -> Result<Token, AuthError> {
    if parsed.access_token.is_empty() {
        return Err(AuthError::Decode(
            "token response did not include access_token".to_string(),
        ));
    }
    Ok(Token {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token.unwrap_or_default(),
        token_type: parsed.token_type.unwrap_or_else(|| "Bearer".to_string()),
        expiry: parsed.expires_in.map(expiry_from_secs),
        id_token: parsed.id_token,
        user_id: None,
    })
}

/// CSPRNG-generated 128-bit base64url `state` value for the authorization
/// URL.
pub fn random_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    B64_URL.encode(bytes)
}

/// Read a single whitespace-delimited authorization code from `input`.
///
/// Blocks until input is available; a stream error or EOF before any code
/// byte fails the surrounding exchange.
pub fn read_code<R: BufRead>(mut input: R) -> Result<String, AuthError> {
    let mut code: Vec<u8> = Vec::new();
    loop {
        let (consumed, done) = {
            let buf = input.fill_buf().map_err(AuthError::Input)?;
            if buf.is_empty() {
                // EOF. Whatever was collected is the code.
                if code.is_empty() {
                    return Err(AuthError::Input(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "no authorization code on input",
                    )));
                }
                return finish_code(code);
            }
            let mut consumed = 0;
            let mut done = false;
            for &byte in buf {
                consumed += 1;
                if byte.is_ascii_whitespace() {
                    if !code.is_empty() {
                        done = true;
                        break;
                    }
                } else {
                    code.push(byte);
                }
            }
            (consumed, done)
        };
        input.consume(consumed);
        if done {
            return finish_code(code);
        }
    }
}

fn finish_code(code: Vec<u8>) -> Result<String, AuthError> {
    String::from_utf8(code).map_err(|_| {
        AuthError::Input(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "authorization code was not valid UTF-8",
        ))
    })
}

fn deserialize_secs_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(num) => num
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("expires_in must be a number"))
            .map(Some),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("invalid expires_in: {err}"))),
        _ => Err(serde::de::Error::custom(
            "expires_in must be string, number, or null",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{oauth_token_response_json, test_oauth_config, TEST_OAUTH_CODE};
    use mockito::Matcher;

    const INSTALLED_JSON: &str = r#"{
  "installed": {
    "client_id": "test.apps.googleusercontent.com",
    "project_id": "test",
    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
    "token_uri": "https://oauth2.googleapis.com/token",
    "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
    "client_secret": "test",
    "redirect_uris": [
      "urn:ietf:wg:oauth:2.0:oob",
      "http://localhost"
    ]
  }
}"#;

    #[test]
    fn installed_json_parses_valid_document() {
        let cfg = OauthConfig::from_installed_json(INSTALLED_JSON).expect("parse");
        assert_eq!(cfg.client_id, "test.apps.googleusercontent.com");
        assert_eq!(cfg.client_secret, "test");
        assert_eq!(cfg.redirect_url, OOB_REDIRECT_URL);
        assert_eq!(cfg.scopes.len(), 3);
        assert!(cfg.scopes.iter().any(|s| s == "openid"));
    }

    #[test]
    fn installed_json_rejects_malformed_document() {
        let err = OauthConfig::from_installed_json(r#"{"installed": {"client_id": "test.a"#)
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::Json(_)), "got: {err}");
    }

    #[test]
    fn auth_code_url_carries_oob_offline_and_state() {
        let cfg = OauthConfig::from_installed_json(INSTALLED_JSON).expect("parse");
        let url = cfg.auth_code_url("st4te").expect("build url");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("state=st4te"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn random_state_is_128_bits_of_base64url() {
        let state = random_state();
        let decoded = B64_URL.decode(&state).expect("base64url");
        assert_eq!(decoded.len(), 16);
        assert_ne!(state, random_state());
    }

    #[test]
    fn read_code_takes_first_whitespace_delimited_token() {
        let code = read_code(&b"  test_auth_code extra\n"[..]).expect("read");
        assert_eq!(code, "test_auth_code");
    }

    #[test]
    fn read_code_accepts_code_at_eof_without_newline() {
        let code = read_code(&b"test_auth_code"[..]).expect("read");
        assert_eq!(code, "test_auth_code");
    }

    #[test]
    fn read_code_fails_on_empty_input() {
        let err = read_code(&b"\n  \n"[..]).expect_err("should fail");
        assert!(matches!(err, AuthError::Input(_)), "got: {err}");
    }

    #[tokio::test]
    async fn exchange_code_parses_json_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), TEST_OAUTH_CODE.into()),
                Matcher::UrlEncoded("client_id".into(), "test_client_id".into()),
                Matcher::UrlEncoded("client_secret".into(), "test_client_secret".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(oauth_token_response_json())
            .create_async()
            .await;

        let cfg = test_oauth_config(&server.url());
        let token = cfg
            .exchange_code(&reqwest::Client::new(), TEST_OAUTH_CODE)
            .await
            .expect("exchange");
        mock.assert_async().await;
        assert_eq!(token.access_token, "test_auth_token");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.id_token.is_some());
    }

    #[tokio::test]
    async fn exchange_code_parses_form_encoded_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("access_token=test_auth_token&token_type=Bearer&expires_in=3600")
            .create_async()
            .await;

        let cfg = test_oauth_config(&server.url());
        let token = cfg
            .exchange_code(&reqwest::Client::new(), TEST_OAUTH_CODE)
            .await
            .expect("exchange");
        assert_eq!(token.access_token, "test_auth_token");
        assert!(token.expiry.is_some());
        assert!(token.valid());
    }

    #[tokio::test]
    async fn exchange_code_surfaces_classified_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let cfg = test_oauth_config(&server.url());
        let err = cfg
            .exchange_code(&reqwest::Client::new(), "bogus")
            .await
            .expect_err("should fail");
        let status = err.status().expect("classified error");
        assert_eq!(status.code(), 400);
        assert!(!status.temporary());
    }

    #[tokio::test]
    async fn exchange_code_rejects_response_without_access_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let cfg = test_oauth_config(&server.url());
        let err = cfg
            .exchange_code(&reqwest::Client::new(), TEST_OAUTH_CODE)
            .await
            .expect_err("should fail");
        assert!(matches!(err, AuthError::Decode(_)), "got: {err}");
    }
}
