use std::collections::HashMap;

use async_trait::async_trait;

use super::model::User;
use super::{Id, Nickname, Repository, Sub};

#[async_trait]
pub trait UserService {
    async fn find_by_sub(&self, sub: &Sub) -> super::Result<User>;

    /// Nickname lookup restricted to the given user set, keyed for
    /// mention resolution.
    async fn nicknames_of(&self, ids: &[Id]) -> super::Result<HashMap<Nickname, Id>>;
}

#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Repository,
}

impl UserServiceImpl {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn find_by_sub(&self, sub: &Sub) -> super::Result<User> {
        self.repo.find_by_sub(sub).await
    }

    async fn nicknames_of(&self, ids: &[Id]) -> super::Result<HashMap<Nickname, Id>> {
        let users = self.repo.find_by_ids(ids).await?;

        Ok(users
            .into_iter()
            .map(|u| (u.nickname(), *u.id()))
            .collect())
    }
}
