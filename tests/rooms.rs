use std::sync::Arc;

use diesel::ExpressionMethods;
use diesel::RunQueryDsl;
use diesel::connection::SimpleConnection;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::redis::Redis;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::ContainerAsync;
use uuid::Uuid;

use collab_service::event::broadcast::Broadcaster;
use collab_service::integration::{cache, db};
use collab_service::message;
use collab_service::message::repository::{MessageRepository, PgMessageRepository};
use collab_service::message::service::MessageServiceImpl;
use collab_service::room;
use collab_service::room::repository::{
    MembershipRepository, PgMembershipRepository, PgRoomRepository,
};
use collab_service::room::service::{CreateRoom, RoomServiceImpl};
use collab_service::schema::users;
use collab_service::user;
use collab_service::user::repository::PgUserRepository;
use collab_service::user::service::UserServiceImpl;
use collab_service::workspace;

const SCHEMA: &str = r#"
    CREATE TYPE room_kind AS ENUM ('open', 'restricted', 'direct');
    CREATE TYPE member_role AS ENUM ('admin', 'member');

    CREATE TABLE users (
        id UUID PRIMARY KEY,
        sub TEXT NOT NULL UNIQUE,
        nickname TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    );

    CREATE TABLE rooms (
        id UUID PRIMARY KEY,
        workspace_id UUID NOT NULL,
        kind room_kind NOT NULL,
        name TEXT NOT NULL,
        archived BOOLEAN NOT NULL DEFAULT FALSE,
        created_by UUID NOT NULL REFERENCES users (id)
    );

    CREATE TABLE room_members (
        room_id UUID NOT NULL REFERENCES rooms (id),
        user_id UUID NOT NULL REFERENCES users (id),
        role member_role NOT NULL,
        last_read_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (room_id, user_id)
    );

    CREATE TABLE messages (
        id UUID PRIMARY KEY,
        room_id UUID NOT NULL REFERENCES rooms (id),
        sender_id UUID REFERENCES users (id),
        body TEXT NOT NULL,
        parent_id UUID REFERENCES messages (id),
        created_at TIMESTAMPTZ NOT NULL,
        edited BOOLEAN NOT NULL DEFAULT FALSE,
        deleted BOOLEAN NOT NULL DEFAULT FALSE,
        pinned BOOLEAN NOT NULL DEFAULT FALSE
    );

    CREATE TABLE message_mentions (
        message_id UUID NOT NULL REFERENCES messages (id),
        user_id UUID NOT NULL REFERENCES users (id),
        PRIMARY KEY (message_id, user_id)
    );
"#;

struct Stack {
    _pg: ContainerAsync<Postgres>,
    _redis: ContainerAsync<Redis>,
    pool: db::Pool,
    room_service: RoomServiceImpl,
    member_repo: room::Members,
    message_service: MessageServiceImpl,
    message_repo: message::Repository,
}

async fn stack() -> Stack {
    let pg = Postgres::default().start().await.unwrap();
    let pg_port = pg.get_host_port_ipv4(5432).await.unwrap();
    let redis_node = Redis::default().start().await.unwrap();
    let redis_port = redis_node.get_host_port_ipv4(6379).await.unwrap();

    let pool = db::init(&db::Config::new(
        "127.0.0.1", pg_port, "postgres", "postgres", "postgres",
    ));
    pool.get().unwrap().batch_execute(SCHEMA).unwrap();

    let redis = cache::init(&cache::Config::new("127.0.0.1", redis_port))
        .await
        .unwrap();

    let room_repo: room::Repository = Arc::new(PgRoomRepository::new(pool.clone()));
    let member_repo: room::Members = Arc::new(PgMembershipRepository::new(pool.clone()));
    let room_service = RoomServiceImpl::new(room_repo, member_repo.clone(), redis);

    let user_repo: user::Repository = Arc::new(PgUserRepository::new(pool.clone()));
    let user_service: user::Service = Arc::new(UserServiceImpl::new(user_repo));

    let message_repo: message::Repository = Arc::new(PgMessageRepository::new(pool.clone()));
    let message_service = MessageServiceImpl::new(
        message_repo.clone(),
        Arc::new(room_service.clone()),
        user_service,
        Arc::new(Broadcaster::new()),
    );

    Stack {
        _pg: pg,
        _redis: redis_node,
        pool,
        room_service,
        member_repo,
        message_service,
        message_repo,
    }
}

fn seed_user(pool: &db::Pool, nickname: &str) -> user::Id {
    let id = user::Id::from(Uuid::new_v4());
    let mut conn = pool.get().unwrap();

    diesel::insert_into(users::table)
        .values((
            users::id.eq(&id),
            users::sub.eq(format!("auth0|{nickname}")),
            users::nickname.eq(nickname),
            users::name.eq(nickname),
        ))
        .execute(&mut conn)
        .unwrap();

    id
}

fn create_room(kind: room::Kind, created_by: user::Id, members: &[user::Id]) -> CreateRoom {
    CreateRoom {
        workspace_id: workspace::Id::from(Uuid::new_v4()),
        kind,
        name: "general".to_string(),
        created_by,
        members: members.to_vec(),
    }
}

#[tokio::test]
async fn direct_rooms_take_exactly_two_participants() {
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");
    let carol = seed_user(&stack.pool, "carol");

    let too_many = stack
        .room_service
        .create(&create_room(room::Kind::Direct, alice, &[bob, carol]))
        .await;
    assert!(matches!(too_many, Err(room::Error::DirectMembers(3))));

    let alone = stack
        .room_service
        .create(&create_room(room::Kind::Direct, alice, &[]))
        .await;
    assert!(matches!(alone, Err(room::Error::DirectMembers(1))));

    let dm = stack
        .room_service
        .create(&create_room(room::Kind::Direct, alice, &[bob]))
        .await
        .unwrap();

    let members = stack.room_service.members(dm.id()).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.contains(&alice) && members.contains(&bob));
}

#[tokio::test]
async fn the_creator_is_an_admin_and_cannot_be_removed() {
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");

    let created = stack
        .room_service
        .create(&create_room(room::Kind::Open, alice, &[bob]))
        .await
        .unwrap();

    let membership = stack
        .member_repo
        .find(created.id(), &alice)
        .await
        .unwrap()
        .expect("creator membership is created automatically");
    assert!(matches!(membership.role(), room::Role::Admin));

    let removal = stack.room_service.remove_member(created.id(), &alice).await;
    assert!(matches!(removal, Err(room::Error::CreatorRemoval)));

    stack
        .room_service
        .remove_member(created.id(), &bob)
        .await
        .unwrap();
    let members = stack.room_service.members(created.id()).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn archived_rooms_reject_new_messages_but_stay_readable() {
    use collab_service::message::service::MessageService;
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");

    let created = stack
        .room_service
        .create(&create_room(room::Kind::Open, alice, &[bob]))
        .await
        .unwrap();

    stack
        .message_service
        .create(&alice, created.id(), "before the freeze", None)
        .await
        .unwrap();

    stack.room_service.archive(created.id()).await.unwrap();

    let rejected = stack
        .message_service
        .create(&alice, created.id(), "after the freeze", None)
        .await;
    assert!(matches!(
        rejected,
        Err(message::Error::_Room(room::Error::Archived))
    ));

    let history = stack
        .message_service
        .history(&bob, created.id(), None, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].body, "before the freeze");
}

#[tokio::test]
async fn direct_rooms_are_never_archived_independently() {
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");

    let dm = stack
        .room_service
        .create(&create_room(room::Kind::Direct, alice, &[bob]))
        .await
        .unwrap();

    let archived = stack.room_service.archive(dm.id()).await;
    assert!(matches!(archived, Err(room::Error::DirectArchive)));
}

#[tokio::test]
async fn sending_bumps_the_senders_read_position_with_the_insert() {
    use collab_service::message::service::MessageService;
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");

    let created = stack
        .room_service
        .create(&create_room(room::Kind::Open, alice, &[bob]))
        .await
        .unwrap();

    let sent = stack
        .message_service
        .create(&alice, created.id(), "hi @bob", None)
        .await
        .unwrap();

    let membership = stack
        .member_repo
        .find(created.id(), &alice)
        .await
        .unwrap()
        .unwrap();
    let stored = stack.message_repo.find_by_id(&sent.id).await.unwrap();
    assert_eq!(membership.last_read_at(), stored.created_at());

    // and the validated mention set is durable
    let mentions = stack.message_repo.mentions_of(&sent.id).await.unwrap();
    assert_eq!(mentions.len(), 1);
    assert!(mentions.contains(&bob));
}

#[tokio::test]
async fn thread_parents_must_live_in_the_same_room() {
    use collab_service::message::service::MessageService;
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");

    let room_a = stack
        .room_service
        .create(&create_room(room::Kind::Open, alice, &[bob]))
        .await
        .unwrap();
    let room_b = stack
        .room_service
        .create(&create_room(room::Kind::Open, alice, &[bob]))
        .await
        .unwrap();

    let root = stack
        .message_service
        .create(&alice, room_a.id(), "root", None)
        .await
        .unwrap();

    let cross_room = stack
        .message_service
        .create(&bob, room_b.id(), "reply", Some(&root.id))
        .await;
    assert!(matches!(cross_room, Err(message::Error::ParentNotFound)));

    let same_room = stack
        .message_service
        .create(&bob, room_a.id(), "reply", Some(&root.id))
        .await
        .unwrap();
    assert_eq!(same_room.parent_id, Some(root.id));

    // threads stay one level deep
    let nested = stack
        .message_service
        .create(&alice, room_a.id(), "reply to reply", Some(&same_room.id))
        .await;
    assert!(matches!(nested, Err(message::Error::ParentNotFound)));
}

#[tokio::test]
async fn edits_deletes_and_pins_are_owner_and_member_gated() {
    use collab_service::message::service::MessageService;
    use collab_service::room::service::RoomService;

    let stack = stack().await;
    let alice = seed_user(&stack.pool, "alice");
    let bob = seed_user(&stack.pool, "bob");

    let created = stack
        .room_service
        .create(&create_room(room::Kind::Open, alice, &[bob]))
        .await
        .unwrap();

    let sent = stack
        .message_service
        .create(&alice, created.id(), "tpyo", None)
        .await
        .unwrap();

    let foreign_edit = stack
        .message_service
        .update_body(&bob, &sent.id, "typo")
        .await;
    assert!(matches!(foreign_edit, Err(message::Error::NotOwner)));

    stack
        .message_service
        .update_body(&alice, &sent.id, "typo")
        .await
        .unwrap();

    stack
        .message_service
        .set_pinned(&bob, &sent.id, true)
        .await
        .unwrap();

    let fetched = stack.message_service.find_by_id(&sent.id).await.unwrap();
    assert_eq!(fetched.body, "typo");
    assert!(fetched.edited);
    assert!(fetched.pinned);

    stack
        .message_service
        .delete(&alice, &sent.id)
        .await
        .unwrap();
    let deleted = stack.message_service.find_by_id(&sent.id).await.unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.body, "typo", "soft delete keeps the body");
}
