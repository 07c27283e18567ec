use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use log::{debug, error, warn};
use tokio::sync::RwLock;

use super::{Token, TokenClaims};

use crate::integration;
use crate::integration::idp;
use crate::user;
use crate::user::model::User;
use crate::Raw;

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
const RETRY_DELAY: Duration = Duration::from_secs(15);

#[async_trait]
pub trait AuthService {
    /// One validation per connection attempt. Every failure collapses into
    /// [`super::Error::Rejected`]; the cause is only logged.
    async fn authenticate(&self, token: &Token) -> super::Result<User>;
}

#[derive(Clone)]
pub struct AuthServiceImpl {
    user_service: user::Service,
    jwt_validator: Arc<Validation>,
    jwk_decoding_keys: Arc<RwLock<HashMap<String, DecodingKey>>>,
}

impl AuthServiceImpl {
    pub fn new(cfg: &idp::Config, user_service: user::Service) -> Self {
        let jwt_validator = {
            let mut v = Validation::new(jsonwebtoken::Algorithm::RS256);
            v.set_required_spec_claims(cfg.required_claims());
            v.set_issuer(&[cfg.issuer()]);
            v.set_audience(&[cfg.audience()]);
            v
        };

        let jwk_decoding_keys = Arc::new(RwLock::new(HashMap::new()));
        let service = Self {
            user_service,
            jwt_validator: Arc::new(jwt_validator),
            jwk_decoding_keys: jwk_decoding_keys.clone(),
        };

        let jwks_url = cfg.jwks_url().to_string();
        tokio::spawn(async move {
            let http = integration::init_http_client();
            loop {
                match fetch_jwk_decoding_keys(&jwks_url, &http).await {
                    Ok(keys) => *jwk_decoding_keys.write().await = keys,
                    Err(e) => {
                        error!("Failed to fetch JWKs: {e:?}");
                        debug!(
                            "Retrying to fetch JWKs in {} seconds",
                            RETRY_DELAY.as_secs()
                        );
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                }
                tokio::time::sleep(ONE_DAY).await;
            }
        });

        service
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn authenticate(&self, token: &Token) -> super::Result<User> {
        let sub = self.validate(token).await?;

        self.user_service.find_by_sub(&sub).await.map_err(|e| {
            warn!("Rejecting connection, no active user for validated token: {e:?}");
            super::Error::Rejected
        })
    }
}

impl AuthServiceImpl {
    async fn validate(&self, token: &Token) -> super::Result<user::Sub> {
        let jwt_header = decode_header(token.raw()).map_err(|e| {
            warn!("Rejecting connection, failed to decode JWT header: {e:?}");
            super::Error::Rejected
        })?;

        let kid = jwt_header.kid.ok_or_else(|| {
            warn!("Rejecting connection, JWT carries no kid");
            super::Error::Rejected
        })?;

        let decoding_keys_guard = self.jwk_decoding_keys.read().await;
        let decoding_key = decoding_keys_guard.get(&kid).ok_or_else(|| {
            warn!("Rejecting connection, unknown kid '{kid}'");
            super::Error::Rejected
        })?;

        decode::<TokenClaims>(token.raw(), decoding_key, &self.jwt_validator)
            .map(|data| data.claims.sub)
            .map_err(|e| {
                warn!("Rejecting connection, token claims failed validation: {e:?}");
                super::Error::Rejected
            })
    }
}

async fn fetch_jwk_decoding_keys(
    jwks_url: &str,
    http: &reqwest::Client,
) -> super::Result<HashMap<String, DecodingKey>> {
    let jwk_response = http.get(jwks_url).send().await?;
    let jwk_set: JwkSet = jwk_response.json().await?;

    let mut keys = HashMap::new();
    for jwk in &jwk_set.keys {
        if let Some(kid) = jwk.clone().common.key_id {
            let key = DecodingKey::from_jwk(jwk)?;

            debug!("Fetched jwk with id '{kid}'");
            keys.insert(kid, key);
        }
    }

    Ok(keys)
}
