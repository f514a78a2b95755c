use crate::clients::types::{JwtClaims, ServiceAccountKey, TokenResponse};
use crate::clients::REQUEST_TIMEOUT;
use crate::error::{ReportError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::Client;
use std::path::Path;

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];
const TOKEN_LIFETIME_SECS: i64 = 3600;
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Exchanges a service account key for a short-lived OAuth access token.
pub struct ServiceAccountAuth {
    client: Client,
    key: ServiceAccountKey,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, key }
    }

    pub async fn from_key_file(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            ReportError::Config(format!(
                "cannot read service account key {}: {}",
                path.display(),
                e
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&json)?;
        Ok(Self::new(key))
    }

    pub(crate) fn signed_assertion(&self, issued_at: i64) -> Result<String> {
        let claims = JwtClaims {
            iss: self.key.client_email.clone(),
            scope: SCOPES.join(" "),
            aud: self.key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| ReportError::Auth(format!("invalid service account private key: {}", e)))?;
        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| ReportError::Auth(format!("failed to sign token request: {}", e)))
    }

    pub async fn access_token(&self) -> Result<String> {
        let assertion = self.signed_assertion(Utc::now().timestamp())?;
        debug!("Requesting access token for {}", self.key.client_email);

        let res = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(ReportError::Auth(format!(
                "token exchange failed (status {}): {}",
                status, err_text
            )));
        }

        let token: TokenResponse = res.json().await?;
        info!("Authenticated as {}", self.key.client_email);
        Ok(token.access_token)
    }
}
