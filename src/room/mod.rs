use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::sql_types;
use crate::user;

pub mod model;
pub mod repository;
pub mod service;

type Result<T> = std::result::Result<T, Error>;
pub type Repository = Arc<dyn repository::RoomRepository + Send + Sync>;
pub type Members = Arc<dyn repository::MembershipRepository + Send + Sync>;
pub type Service = Arc<dyn service::RoomService + Send + Sync>;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Hash, PartialEq, Eq, FromSqlRow, AsExpression)]
#[diesel(sql_type = diesel::sql_types::Uuid)]
pub struct Id(Uuid);

impl Id {
    pub const fn get(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql<diesel::sql_types::Uuid, Pg> for Id {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <Uuid as ToSql<diesel::sql_types::Uuid, Pg>>::to_sql(&self.0, out)
    }
}

impl FromSql<diesel::sql_types::Uuid, Pg> for Id {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        <Uuid as FromSql<diesel::sql_types::Uuid, Pg>>::from_sql(bytes).map(Self)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, FromSqlRow, AsExpression)]
#[diesel(sql_type = sql_types::RoomKind)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Open,
    Restricted,
    Direct,
}

impl Kind {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Restricted => "restricted",
            Self::Direct => "direct",
        }
    }
}

impl ToSql<sql_types::RoomKind, Pg> for Kind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<sql_types::RoomKind, Pg> for Kind {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"open" => Ok(Self::Open),
            b"restricted" => Ok(Self::Restricted),
            b"direct" => Ok(Self::Direct),
            other => Err(format!("unrecognized room kind: {other:?}").into()),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, FromSqlRow, AsExpression)]
#[diesel(sql_type = sql_types::MemberRole)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl ToSql<sql_types::MemberRole, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<sql_types::MemberRole, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"admin" => Ok(Self::Admin),
            b"member" => Ok(Self::Member),
            other => Err(format!("unrecognized member role: {other:?}").into()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("room not found: {0:?}")]
    NotFound(Id),
    #[error("user is not a member of the room")]
    NotAMember,
    #[error("room is archived")]
    Archived,
    #[error("direct room takes exactly two distinct members, got {0}")]
    DirectMembers(usize),
    #[error("direct rooms cannot be archived independently")]
    DirectArchive,
    #[error("room creator cannot be removed")]
    CreatorRemoval,
    #[error("could not create room")]
    NotCreated,

    #[error(transparent)]
    _User(#[from] user::Error),
    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}
