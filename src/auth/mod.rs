use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::user;
use crate::{Raw, Redact};

pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Service = Arc<dyn service::AuthService + Send + Sync>;

#[derive(Deserialize, Clone)]
struct TokenClaims {
    sub: user::Sub,
}

/// Bearer credential supplied at connection-open time.
#[derive(Deserialize, Clone)]
pub struct Token(String);

impl Token {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Redact for Token {}

impl Raw for Token {
    fn raw(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.redact())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // one uniform rejection for every credential failure, so the closing
    // handshake cannot distinguish a malformed token from a missing user
    #[error("connection credential rejected")]
    Rejected,

    #[error(transparent)]
    _Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    _JsonWebtoken(#[from] jsonwebtoken::errors::Error),
}
