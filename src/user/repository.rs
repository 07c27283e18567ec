use async_trait::async_trait;
use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::QueryDsl;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;

use crate::integration::db;
use crate::schema::users;

use super::model::User;
use super::{Id, Sub};

#[async_trait]
pub trait UserRepository {
    async fn find_by_sub(&self, sub: &Sub) -> super::Result<User>;

    async fn find_by_ids(&self, ids: &[Id]) -> super::Result<Vec<User>>;
}

pub struct PgUserRepository {
    pool: db::Pool,
}

impl PgUserRepository {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_sub(&self, s: &Sub) -> super::Result<User> {
        let mut conn = self.pool.get()?;

        users::table
            .filter(users::sub.eq(s.as_str()))
            .limit(1)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or(super::Error::NotFound(s.clone()))
    }

    async fn find_by_ids(&self, ids: &[Id]) -> super::Result<Vec<User>> {
        let mut conn = self.pool.get()?;

        let found = users::table
            .filter(users::id.eq_any(ids))
            .select(User::as_select())
            .get_results(&mut conn)?;

        Ok(found)
    }
}
