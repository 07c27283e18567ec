use diesel::prelude::{Queryable, Selectable};

use super::{Id, Nickname, Sub};

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    id: Id,
    sub: String,
    nickname: String,
    name: String,
}

impl User {
    pub fn new(id: Id, sub: &Sub, nickname: &Nickname, name: impl Into<String>) -> Self {
        Self {
            id,
            sub: sub.as_str().to_string(),
            nickname: nickname.as_str().to_string(),
            name: name.into(),
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub fn sub(&self) -> Sub {
        Sub(self.sub.clone())
    }

    pub fn nickname(&self) -> Nickname {
        Nickname::new(self.nickname.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
