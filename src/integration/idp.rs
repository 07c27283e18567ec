use std::env;

#[derive(Clone)]
pub struct Config {
    issuer: String,
    audience: String,
    jwks_url: String,
    required_claims: Vec<String>,
}

impl Config {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks_url: impl Into<String>,
        required_claims: &[String],
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: jwks_url.into(),
            required_claims: required_claims.to_vec(),
        }
    }

    pub fn env() -> Self {
        Self::new(
            env::var("ISSUER").expect("ISSUER must be set"),
            env::var("AUDIENCE").expect("AUDIENCE must be set"),
            env::var("JWKS_URL").expect("JWKS_URL must be set"),
            env::var("REQUIRED_CLAIMS")
                .expect("REQUIRED_CLAIMS must be set")
                .split(',')
                .map(String::from)
                .collect::<Vec<String>>()
                .as_slice(),
        )
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }
}
