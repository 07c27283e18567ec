use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::ExpressionMethods;
use diesel::OptionalExtension;
use diesel::QueryDsl;
use diesel::RunQueryDsl;
use diesel::SelectableHelper;

use crate::integration::db;
use crate::schema::{room_members, rooms};
use crate::user;
use crate::workspace;

use super::model::{Membership, NewMembership, NewRoom, Room};
use super::Id;

#[async_trait]
pub trait RoomRepository {
    /// Inserts the room and its initial memberships in one transaction.
    async fn create(
        &self,
        room: &NewRoom<'_>,
        members: &[NewMembership<'_>],
    ) -> super::Result<()>;

    async fn find_by_id(&self, id: &Id) -> super::Result<Room>;

    async fn ids_for_member(
        &self,
        workspace_id: &workspace::Id,
        user_id: &user::Id,
    ) -> super::Result<Vec<Id>>;

    async fn set_archived(&self, id: &Id, archived: bool) -> super::Result<()>;
}

#[async_trait]
pub trait MembershipRepository {
    async fn find(&self, room_id: &Id, user_id: &user::Id) -> super::Result<Option<Membership>>;

    async fn members(&self, room_id: &Id) -> super::Result<Vec<user::Id>>;

    async fn insert(&self, membership: &NewMembership<'_>) -> super::Result<()>;

    async fn delete(&self, room_id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn set_last_read(
        &self,
        room_id: &Id,
        user_id: &user::Id,
        at: DateTime<Utc>,
    ) -> super::Result<()>;
}

pub struct PgRoomRepository {
    pool: db::Pool,
}

impl PgRoomRepository {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create(
        &self,
        room: &NewRoom<'_>,
        members: &[NewMembership<'_>],
    ) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| -> super::Result<()> {
            diesel::insert_into(rooms::table).values(room).execute(conn)?;
            diesel::insert_into(room_members::table)
                .values(members)
                .execute(conn)?;
            Ok(())
        })
    }

    async fn find_by_id(&self, id: &Id) -> super::Result<Room> {
        let mut conn = self.pool.get()?;

        rooms::table
            .find(id)
            .select(Room::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or(super::Error::NotFound(*id))
    }

    async fn ids_for_member(
        &self,
        workspace_id: &workspace::Id,
        user_id: &user::Id,
    ) -> super::Result<Vec<Id>> {
        let mut conn = self.pool.get()?;

        let ids = rooms::table
            .inner_join(room_members::table)
            .filter(rooms::workspace_id.eq(workspace_id))
            .filter(room_members::user_id.eq(user_id))
            .select(rooms::id)
            .get_results(&mut conn)?;

        Ok(ids)
    }

    async fn set_archived(&self, id: &Id, archived: bool) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(rooms::table.find(id))
            .set(rooms::archived.eq(archived))
            .execute(&mut conn)?;

        Ok(())
    }
}

pub struct PgMembershipRepository {
    pool: db::Pool,
}

impl PgMembershipRepository {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn find(&self, room_id: &Id, user_id: &user::Id) -> super::Result<Option<Membership>> {
        let mut conn = self.pool.get()?;

        let membership = room_members::table
            .find((room_id, user_id))
            .select(Membership::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(membership)
    }

    async fn members(&self, room_id: &Id) -> super::Result<Vec<user::Id>> {
        let mut conn = self.pool.get()?;

        let members = room_members::table
            .filter(room_members::room_id.eq(room_id))
            .select(room_members::user_id)
            .get_results(&mut conn)?;

        Ok(members)
    }

    async fn insert(&self, membership: &NewMembership<'_>) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(room_members::table)
            .values(membership)
            .on_conflict_do_nothing()
            .execute(&mut conn)?;

        Ok(())
    }

    async fn delete(&self, room_id: &Id, user_id: &user::Id) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::delete(room_members::table.find((room_id, user_id))).execute(&mut conn)?;

        Ok(())
    }

    async fn set_last_read(
        &self,
        room_id: &Id,
        user_id: &user::Id,
        at: DateTime<Utc>,
    ) -> super::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(room_members::table.find((room_id, user_id)))
            .set(room_members::last_read_at.eq(at))
            .execute(&mut conn)?;

        Ok(())
    }
}
