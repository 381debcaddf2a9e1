//! Chat service behaviour against a real SQLite store.

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{BrokenSink, RecordingSink, TestContext, TestResult};
use tether_chats::{ChatError, StatusTransition};
use tether_database::{MessageStatus, NotificationKind};

#[tokio::test]
async fn conversation_lookup_is_order_independent_and_idempotent() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();

    let forward = chat.get_or_create_conversation(1, 2).await?;
    let backward = chat.get_or_create_conversation(2, 1).await?;
    let again = chat.get_or_create_conversation(1, 2).await?;

    assert_eq!(forward.id, backward.id);
    assert_eq!(forward.id, again.id);
    assert_eq!((forward.user_low, forward.user_high), (1, 2));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creators_get_the_same_conversation() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let chat = chat.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                chat.get_or_create_conversation(5, 9).await
            } else {
                chat.get_or_create_conversation(9, 5).await
            }
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await??.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "expected one conversation, got {ids:?}");

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
        .fetch_one(&ctx.pool)
        .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
async fn self_and_invalid_pairs_are_rejected() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();

    assert!(matches!(
        chat.get_or_create_conversation(3, 3).await,
        Err(ChatError::Validation { .. })
    ));
    assert!(matches!(
        chat.get_or_create_conversation(0, 3).await,
        Err(ChatError::Validation { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn list_messages_is_empty_for_new_conversation() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();

    let conversation = chat.get_or_create_conversation(1, 2).await?;
    assert!(chat.list_messages(conversation.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn send_message_persists_as_sent_and_notifies_recipient() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    let message = chat.send_message(conversation.id, 1, "hello").await?;
    assert_eq!(message.status, MessageStatus::Sent);
    assert_eq!(message.sender_id, 1);
    assert!(message.read_at.is_none());

    let notifications: Vec<(i64, i64, String, Option<i64>, String)> = sqlx::query_as(
        "SELECT user_id, actor_id, kind, ref_id, message FROM notifications ORDER BY id",
    )
    .fetch_all(&ctx.pool)
    .await?;
    assert_eq!(
        notifications,
        vec![(
            2,
            1,
            NotificationKind::Message.to_string(),
            Some(message.id),
            "New message from user 1".to_string()
        )]
    );
    Ok(())
}

#[tokio::test]
async fn notification_targets_the_other_participant() -> TestResult {
    let ctx = TestContext::new().await?;
    let sink = Arc::new(RecordingSink::default());
    let chat = ctx.service_with(sink.clone());
    let conversation = chat.get_or_create_conversation(4, 7).await?;

    chat.send_message(conversation.id, 7, "ping").await?;
    chat.send_message(conversation.id, 4, "pong").await?;

    let seen = sink.seen.lock().unwrap();
    let recipients: Vec<_> = seen.iter().map(|n| (n.recipient_id, n.actor_id)).collect();
    assert_eq!(recipients, vec![(4, 7), (7, 4)]);
    Ok(())
}

#[tokio::test]
async fn failing_notification_sink_does_not_fail_the_send() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.service_with(Arc::new(BrokenSink));
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    let message = chat.send_message(conversation.id, 1, "still here").await?;

    let stored = chat.list_messages(conversation.id).await?;
    assert_eq!(stored, vec![message]);
    Ok(())
}

#[tokio::test]
async fn empty_content_is_rejected_without_a_row() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    for content in ["", "   ", "\n"] {
        let result = chat.send_message(conversation.id, 1, content).await;
        assert!(matches!(result, Err(ChatError::Validation { .. })), "{content:?}");
    }
    assert!(chat.list_messages(conversation.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn send_checks_conversation_and_participation() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    assert!(matches!(
        chat.send_message(999, 1, "hello").await,
        Err(ChatError::ConversationNotFound { id: 999 })
    ));
    assert!(matches!(
        chat.send_message(conversation.id, 3, "hello").await,
        Err(ChatError::Forbidden { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn authorize_distinguishes_unknown_from_outsider() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    assert_eq!(chat.authorize(conversation.id, 2).await?.id, conversation.id);
    assert_eq!(chat.authorize(conversation.id, 3).await.unwrap_err().kind(), "forbidden");
    assert_eq!(chat.authorize(conversation.id + 1, 1).await.unwrap_err().kind(), "not_found");
    Ok(())
}

#[tokio::test]
async fn messages_come_back_in_send_order() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    for (sender, text) in [(1, "one"), (2, "two"), (1, "three")] {
        chat.send_message(conversation.id, sender, text).await?;
    }

    let contents: Vec<String> = chat
        .list_messages(conversation.id)
        .await?
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
    Ok(())
}

#[tokio::test]
async fn mark_delivered_only_touches_the_other_participants_sent_messages() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    chat.send_message(conversation.id, 1, "from one").await?;
    chat.send_message(conversation.id, 2, "from two").await?;

    assert_eq!(chat.mark_delivered(conversation.id, 2).await?, 1);
    assert_eq!(chat.mark_delivered(conversation.id, 2).await?, 0);

    let statuses: Vec<_> = chat
        .list_messages(conversation.id)
        .await?
        .into_iter()
        .map(|m| (m.sender_id, m.status))
        .collect();
    assert_eq!(
        statuses,
        vec![(1, MessageStatus::Delivered), (2, MessageStatus::Sent)]
    );
    Ok(())
}

#[tokio::test]
async fn mark_read_is_idempotent_and_spares_own_messages() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    chat.send_message(conversation.id, 1, "a").await?;
    chat.send_message(conversation.id, 1, "b").await?;
    chat.send_message(conversation.id, 2, "mine").await?;
    chat.mark_delivered(conversation.id, 2).await?;

    let at = Utc::now();
    assert_eq!(chat.mark_read(conversation.id, 2, at).await?, 2);
    let once = chat.list_messages(conversation.id).await?;

    assert_eq!(chat.mark_read(conversation.id, 2, Utc::now()).await?, 0);
    let twice = chat.list_messages(conversation.id).await?;
    assert_eq!(once, twice);

    for message in &twice {
        if message.sender_id == 2 {
            assert_eq!(message.status, MessageStatus::Sent);
            assert!(message.read_at.is_none());
        } else {
            assert_eq!(message.status, MessageStatus::Read);
            assert!(message.read_at.is_some());
        }
    }
    Ok(())
}

#[tokio::test]
async fn delivered_never_follows_read() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    chat.send_message(conversation.id, 1, "skip ahead").await?;
    chat.mark_read(conversation.id, 2, Utc::now()).await?;
    assert_eq!(chat.mark_delivered(conversation.id, 2).await?, 0);

    let messages = chat.list_messages(conversation.id).await?;
    assert_eq!(messages[0].status, MessageStatus::Read);
    Ok(())
}

#[tokio::test]
async fn conversation_list_carries_latest_message() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let with_two = chat.get_or_create_conversation(1, 2).await?;
    let with_three = chat.get_or_create_conversation(1, 3).await?;

    chat.send_message(with_two.id, 2, "older").await?;
    let latest = chat.send_message(with_three.id, 3, "newer").await?;

    let listed = chat.list_conversations(1).await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].conversation.id, with_three.id);
    assert_eq!(listed[0].last_message.as_ref().map(|m| m.id), Some(latest.id));
    assert!(chat.list_conversations(4).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn outsiders_cannot_move_message_status() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    chat.send_message(conversation.id, 1, "from one").await?;
    chat.send_message(conversation.id, 2, "from two").await?;

    let read = chat.mark_read(conversation.id, 99, Utc::now()).await;
    assert!(matches!(read, Err(ChatError::Forbidden { .. })));
    let delivered = chat.mark_delivered(conversation.id, 99).await;
    assert!(matches!(delivered, Err(ChatError::Forbidden { .. })));

    let statuses: Vec<_> = chat
        .list_messages(conversation.id)
        .await?
        .into_iter()
        .map(|m| m.status)
        .collect();
    assert_eq!(statuses, vec![MessageStatus::Sent, MessageStatus::Sent]);
    Ok(())
}

#[tokio::test]
async fn status_changes_on_unknown_conversation_are_not_found() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();

    let delivered = chat.mark_delivered(4242, 1).await;
    assert!(matches!(
        delivered,
        Err(ChatError::ConversationNotFound { id: 4242 })
    ));
    let read = chat.mark_read(4242, 1, Utc::now()).await;
    assert_eq!(read.map_err(|e| e.kind()), Err("not_found"));
    Ok(())
}

#[tokio::test]
async fn stored_transitions_match_the_in_memory_rules() -> TestResult {
    let ctx = TestContext::new().await?;
    let chat = ctx.store_service();
    let conversation = chat.get_or_create_conversation(1, 2).await?;

    chat.send_message(conversation.id, 1, "early").await?;
    chat.send_message(conversation.id, 2, "reply").await?;
    chat.mark_delivered(conversation.id, 2).await?;
    chat.send_message(conversation.id, 1, "late").await?;

    let at = Utc::now();
    for (viewer, transition) in [
        (1, StatusTransition::Deliver),
        (2, StatusTransition::Read { at }),
    ] {
        let mut expected = chat.list_messages(conversation.id).await?;
        let changed = expected
            .iter()
            .filter(|message| transition.applies_to(message, viewer))
            .count();
        for message in expected.iter_mut() {
            transition.apply(message, viewer);
        }

        let updated = match transition {
            StatusTransition::Deliver => chat.mark_delivered(conversation.id, viewer).await?,
            StatusTransition::Read { at } => chat.mark_read(conversation.id, viewer, at).await?,
        };
        let stored = chat.list_messages(conversation.id).await?;

        assert_eq!(updated as usize, changed);
        let expected_statuses: Vec<_> = expected.iter().map(|m| m.status).collect();
        let stored_statuses: Vec<_> = stored.iter().map(|m| m.status).collect();
        assert_eq!(stored_statuses, expected_statuses);
        assert_eq!(
            stored.iter().map(|m| m.read_at.is_some()).collect::<Vec<_>>(),
            expected.iter().map(|m| m.read_at.is_some()).collect::<Vec<_>>()
        );
    }
    Ok(())
}
