use std::env;
use std::time::Duration;

use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;

use crate::integration::Result;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct Config {
    host: String,
    port: u16,
    db: String,
    user: String,
    password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 5432,
            db: String::from("collab"),
            user: String::from("postgres"),
            password: String::from("postgres"),
        }
    }
}

impl Config {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        db: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            db: db.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn env() -> Result<Self> {
        let host = env::var("POSTGRES_HOST")?;
        let port = env::var("POSTGRES_PORT")?.parse()?;
        let db = env::var("POSTGRES_DB")?;
        let user = env::var("POSTGRES_USER")?;
        let password = env::var("POSTGRES_PASSWORD")?;

        Ok(Self {
            host,
            port,
            db,
            user,
            password,
        })
    }

    fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

pub fn init(config: &Config) -> Pool {
    let manager = ConnectionManager::<PgConnection>::new(config.url());

    match r2d2::Pool::builder()
        .connection_timeout(Duration::from_secs(5))
        .build(manager)
    {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to connect to Postgres: {e}"),
    }
}
