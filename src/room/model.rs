use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable, Selectable};

use crate::user;
use crate::workspace;

use super::{Id, Kind, Role};

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Room {
    id: Id,
    workspace_id: workspace::Id,
    kind: Kind,
    name: String,
    archived: bool,
    created_by: user::Id,
}

impl Room {
    pub fn new(
        id: Id,
        workspace_id: workspace::Id,
        kind: Kind,
        name: impl Into<String>,
        created_by: user::Id,
    ) -> Self {
        Self {
            id,
            workspace_id,
            kind,
            name: name.into(),
            archived: false,
            created_by,
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn workspace_id(&self) -> &workspace::Id {
        &self.workspace_id
    }

    pub const fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn archived(&self) -> bool {
        self.archived
    }

    pub const fn created_by(&self) -> &user::Id {
        &self.created_by
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::rooms)]
pub struct NewRoom<'a> {
    id: &'a Id,
    workspace_id: &'a workspace::Id,
    kind: &'a Kind,
    name: &'a str,
    created_by: &'a user::Id,
}

impl<'a> NewRoom<'a> {
    pub fn new(
        id: &'a Id,
        workspace_id: &'a workspace::Id,
        kind: &'a Kind,
        name: &'a str,
        created_by: &'a user::Id,
    ) -> Self {
        Self {
            id,
            workspace_id,
            kind,
            name,
            created_by,
        }
    }
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::room_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Membership {
    room_id: Id,
    user_id: user::Id,
    role: Role,
    last_read_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(room_id: Id, user_id: user::Id, role: Role, last_read_at: DateTime<Utc>) -> Self {
        Self {
            room_id,
            user_id,
            role,
            last_read_at,
        }
    }

    pub const fn room_id(&self) -> &Id {
        &self.room_id
    }

    pub const fn user_id(&self) -> &user::Id {
        &self.user_id
    }

    pub const fn role(&self) -> &Role {
        &self.role
    }

    pub const fn last_read_at(&self) -> DateTime<Utc> {
        self.last_read_at
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::room_members)]
pub struct NewMembership<'a> {
    room_id: &'a Id,
    user_id: &'a user::Id,
    role: &'a Role,
    last_read_at: DateTime<Utc>,
}

impl<'a> NewMembership<'a> {
    pub fn new(room_id: &'a Id, user_id: &'a user::Id, role: &'a Role) -> Self {
        Self {
            room_id,
            user_id,
            role,
            last_read_at: Utc::now(),
        }
    }
}
