//! Chat integration tests
//!
//! End-to-end room scenarios over the in-memory store: the shared room,
//! direct rooms, full-log delivery, and the one-room-at-a-time rule.

use std::sync::Arc;

use onboardly_engine::chat::{
    ChatSession, Message, MessageDraft, ParticipantId, RoomKey, RoomSession, RoomUpdate,
};
use onboardly_engine::InMemoryStore;

fn participant(id: &str) -> ParticipantId {
    ParticipantId::new(id).expect("valid test participant id")
}

fn draft(sender: &str, body: &str) -> MessageDraft {
    MessageDraft::new(participant(sender), body)
}

/// Receive one delivery and unwrap the message log
async fn next_log(session: &mut RoomSession) -> Arc<Vec<Message>> {
    match session.recv().await {
        Some(RoomUpdate::Messages(log)) => log,
        other => panic!("expected message log, got {other:?}"),
    }
}

/// Receive `n` deliveries and return the last log
async fn drain_logs(session: &mut RoomSession, n: usize) -> Arc<Vec<Message>> {
    let mut last = next_log(session).await;
    for _ in 1..n {
        last = next_log(session).await;
    }
    last
}

fn bodies(log: &[Message]) -> Vec<&str> {
    log.iter().map(|m| m.body.as_str()).collect()
}

#[tokio::test]
async fn test_chat_e2e() {
    let store = Arc::new(InMemoryStore::new());
    let ana = participant("ana");
    let bo = participant("bo");

    // 1. Ana joins the shared room; nobody has written yet
    let mut ana_chat = ChatSession::new(store.clone(), ana.clone());
    let ana_room = ana_chat.join_general().await.unwrap();
    assert!(next_log(ana_room).await.is_empty());

    // 2. Ana writes, and her own feed echoes the append
    ana_room
        .send(MessageDraft::new(ana.clone(), "Good morning").with_sender_name("Ana"))
        .await
        .unwrap();
    let log = next_log(ana_room).await;
    assert_eq!(bodies(&log), vec!["Good morning"]);
    assert_eq!(log[0].seq, 1);

    // 3. Bo joins late and still gets the full history
    let mut bo_chat = ChatSession::new(store.clone(), bo.clone());
    let bo_room = bo_chat.join_general().await.unwrap();
    let log = next_log(bo_room).await;
    assert_eq!(bodies(&log), vec!["Good morning"]);
    assert_eq!(log[0].sender_name.as_deref(), Some("Ana"));

    // 4. Bo replies; both participants converge on the same ordered log
    bo_room
        .send(MessageDraft::new(bo.clone(), "Morning!"))
        .await
        .unwrap();
    let bo_log = next_log(bo_room).await;
    let ana_room = ana_chat.room_mut().expect("ana is still attached");
    let ana_log = next_log(ana_room).await;
    assert_eq!(*ana_log, *bo_log);
    assert_eq!(bodies(&ana_log), vec!["Good morning", "Morning!"]);
    assert_eq!(ana_log[0].seq, 1);
    assert_eq!(ana_log[1].seq, 2);
    assert!(ana_log[0].created_at <= ana_log[1].created_at);

    // 5. Ana moves to a direct room; the shared feed is hers no longer
    let ana_direct = ana_chat.join_direct(&bo).await.unwrap();
    assert!(ana_direct.room().is_direct());
    assert!(next_log(ana_direct).await.is_empty());
    assert_eq!(store.open_room_feeds(&RoomKey::general()).await, 1);

    // 6. Direct messages start their own sequence
    ana_direct
        .send(MessageDraft::new(ana.clone(), "Got a minute?"))
        .await
        .unwrap();
    let log = next_log(ana_direct).await;
    assert_eq!(log[0].seq, 1);
    assert_eq!(log[0].room, RoomKey::direct(&ana, &bo));

    // 7. Bo opens the same direct room from his side of the pair
    let bo_direct = bo_chat.join_direct(&ana).await.unwrap();
    assert_eq!(bo_direct.room(), &RoomKey::direct(&ana, &bo));
    let log = next_log(bo_direct).await;
    assert_eq!(bodies(&log), vec!["Got a minute?"]);

    // 8. Back in the shared room, Bo sees only shared-room history
    let bo_room = bo_chat.join_general().await.unwrap();
    let log = next_log(bo_room).await;
    assert_eq!(bodies(&log), vec!["Good morning", "Morning!"]);
}

#[tokio::test]
async fn test_two_subscribers_observe_identical_order() {
    let store = Arc::new(InMemoryStore::new());
    let room = RoomKey::general();

    let mut first = RoomSession::open(store.clone(), room.clone()).await.unwrap();
    let mut second = RoomSession::open(store.clone(), room.clone()).await.unwrap();
    assert!(next_log(&mut first).await.is_empty());
    assert!(next_log(&mut second).await.is_empty());

    // Interleave appends from both sides
    first.send(draft("ana", "one")).await.unwrap();
    second.send(draft("bo", "two")).await.unwrap();
    first.send(draft("ana", "three")).await.unwrap();
    second.send(draft("bo", "four")).await.unwrap();

    let first_log = drain_logs(&mut first, 4).await;
    let second_log = drain_logs(&mut second, 4).await;

    assert_eq!(*first_log, *second_log);
    assert_eq!(bodies(&first_log), vec!["one", "two", "three", "four"]);
    let seqs: Vec<u64> = first_log.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
    for pair in first_log.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
}

#[tokio::test]
async fn test_blank_sends_consume_no_sequence_numbers() {
    let store = Arc::new(InMemoryStore::new());
    let mut session = RoomSession::open(store, RoomKey::general()).await.unwrap();
    next_log(&mut session).await;

    session.send(draft("ana", "first")).await.unwrap();
    assert!(session.send(draft("ana", "   \t")).await.unwrap().is_none());
    session.send(draft("ana", "second")).await.unwrap();

    // Two stored messages, two deliveries, no gap in the sequence
    let log = drain_logs(&mut session, 2).await;
    assert_eq!(bodies(&log), vec!["first", "second"]);
    assert_eq!(log[0].seq, 1);
    assert_eq!(log[1].seq, 2);
}

#[tokio::test]
async fn test_direct_rooms_are_isolated_per_pair() {
    let store = Arc::new(InMemoryStore::new());
    let ana = participant("ana");
    let bo = participant("bo");
    let caro = participant("caro");

    let mut ana_bo = RoomSession::open(store.clone(), RoomKey::direct(&ana, &bo))
        .await
        .unwrap();
    let mut ana_caro = RoomSession::open(store.clone(), RoomKey::direct(&ana, &caro))
        .await
        .unwrap();
    next_log(&mut ana_bo).await;
    next_log(&mut ana_caro).await;

    ana_bo.send(draft("ana", "for bo only")).await.unwrap();
    ana_caro.send(draft("ana", "for caro only")).await.unwrap();

    assert_eq!(bodies(&next_log(&mut ana_bo).await), vec!["for bo only"]);
    assert_eq!(bodies(&next_log(&mut ana_caro).await), vec!["for caro only"]);

    // The pair key is the room identity, not the join order
    assert_eq!(RoomKey::direct(&bo, &ana), ana_bo.room().clone());
    assert_ne!(ana_bo.room(), ana_caro.room());
}
