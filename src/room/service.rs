use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::integration::cache;
use crate::user;
use crate::workspace;

use super::model::{NewMembership, NewRoom, Room};
use super::{Id, Kind, Members, Repository, Role};

pub struct CreateRoom {
    pub workspace_id: workspace::Id,
    pub kind: Kind,
    pub name: String,
    pub created_by: user::Id,
    pub members: Vec<user::Id>,
}

#[async_trait]
pub trait RoomService {
    async fn create(&self, req: &CreateRoom) -> super::Result<Room>;

    async fn find(&self, id: &Id) -> super::Result<Room>;

    async fn rooms_for(
        &self,
        workspace_id: &workspace::Id,
        user_id: &user::Id,
    ) -> super::Result<Vec<Id>>;

    async fn add_member(&self, id: &Id, user_id: &user::Id, role: &Role) -> super::Result<()>;

    async fn remove_member(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn archive(&self, id: &Id) -> super::Result<()>;

    async fn members(&self, id: &Id) -> super::Result<HashSet<user::Id>>;

    async fn check_member(&self, id: &Id, user_id: &user::Id) -> super::Result<()>;

    async fn mark_read(
        &self,
        id: &Id,
        user_id: &user::Id,
        at: DateTime<Utc>,
    ) -> super::Result<DateTime<Utc>>;
}

#[derive(Clone)]
pub struct RoomServiceImpl {
    repo: Repository,
    member_repo: Members,
    redis: cache::Redis,
}

impl RoomServiceImpl {
    pub fn new(repo: Repository, member_repo: Members, redis: cache::Redis) -> Self {
        Self {
            repo,
            member_repo,
            redis,
        }
    }
}

#[async_trait]
impl RoomService for RoomServiceImpl {
    async fn create(&self, req: &CreateRoom) -> super::Result<Room> {
        let mut member_ids: Vec<user::Id> = Vec::with_capacity(req.members.len() + 1);
        for candidate in req.members.iter().chain(std::iter::once(&req.created_by)) {
            if !member_ids.contains(candidate) {
                member_ids.push(*candidate);
            }
        }

        if matches!(req.kind, Kind::Direct) && member_ids.len() != 2 {
            return Err(super::Error::DirectMembers(member_ids.len()));
        }

        let id = Id::from(Uuid::new_v4());
        let admin = Role::Admin;
        let member = Role::Member;

        let memberships = member_ids
            .iter()
            .map(|user_id| {
                let role = if user_id.eq(&req.created_by) {
                    &admin
                } else {
                    &member
                };
                NewMembership::new(&id, user_id, role)
            })
            .collect::<Vec<_>>();

        let room = NewRoom::new(&id, &req.workspace_id, &req.kind, &req.name, &req.created_by);
        self.repo.create(&room, &memberships).await?;

        Ok(Room::new(
            id,
            req.workspace_id,
            req.kind,
            req.name.clone(),
            req.created_by,
        ))
    }

    async fn find(&self, id: &Id) -> super::Result<Room> {
        self.repo.find_by_id(id).await
    }

    async fn rooms_for(
        &self,
        workspace_id: &workspace::Id,
        user_id: &user::Id,
    ) -> super::Result<Vec<Id>> {
        self.repo.ids_for_member(workspace_id, user_id).await
    }

    async fn add_member(&self, id: &Id, user_id: &user::Id, role: &Role) -> super::Result<()> {
        let _ = self.repo.find_by_id(id).await?;

        self.member_repo
            .insert(&NewMembership::new(id, user_id, role))
            .await?;

        self.redis.del(cache::Key::RoomMembers(*id)).await;
        Ok(())
    }

    async fn remove_member(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        let room = self.repo.find_by_id(id).await?;
        if room.created_by().eq(user_id) {
            return Err(super::Error::CreatorRemoval);
        }

        self.member_repo.delete(id, user_id).await?;

        self.redis.del(cache::Key::RoomMembers(*id)).await;
        Ok(())
    }

    async fn archive(&self, id: &Id) -> super::Result<()> {
        let room = self.repo.find_by_id(id).await?;
        if matches!(room.kind(), Kind::Direct) {
            return Err(super::Error::DirectArchive);
        }

        self.repo.set_archived(id, true).await
    }

    async fn members(&self, id: &Id) -> super::Result<HashSet<user::Id>> {
        let key = cache::Key::RoomMembers(*id);
        let cached = self.redis.smembers::<HashSet<user::Id>>(key.clone()).await;

        match cached {
            Some(m) if !m.is_empty() => Ok(m),
            _ => {
                let members = self.member_repo.members(id).await?;
                let members: HashSet<user::Id> = HashSet::from_iter(members);

                if !members.is_empty() {
                    self.redis.sadd(key.clone(), &members).await;
                    self.redis.expire(key).await;
                }

                Ok(members)
            }
        }
    }

    async fn check_member(&self, id: &Id, user_id: &user::Id) -> super::Result<()> {
        let members = self.members(id).await?;

        if !members.contains(user_id) {
            return Err(super::Error::NotAMember);
        }

        Ok(())
    }

    async fn mark_read(
        &self,
        id: &Id,
        user_id: &user::Id,
        at: DateTime<Utc>,
    ) -> super::Result<DateTime<Utc>> {
        self.check_member(id, user_id).await?;

        self.member_repo.set_last_read(id, user_id, at).await?;
        Ok(at)
    }
}
