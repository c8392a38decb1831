// Conversation slot tests - behaviour across independent store handles
//
// Every pipai invocation opens its own ConversationStore on the same file;
// these tests model consecutive invocations with separate handles.

use pipai_session::{ChatMessage, ConversationStore, DEFAULT_EXPIRY, MessageRole};
use std::fs;
use tempfile::tempdir;

#[test]
fn turns_survive_across_invocations() {
    let dir = tempdir().expect("tempdir");

    ConversationStore::in_dir(dir.path()).start().expect("start");
    ConversationStore::in_dir(dir.path())
        .append(MessageRole::User, "what is in this log?")
        .expect("append user");
    ConversationStore::in_dir(dir.path())
        .append(MessageRole::Assistant, "three warnings")
        .expect("append assistant");

    let history = ConversationStore::in_dir(dir.path()).history_for_model();
    assert_eq!(
        history,
        vec![
            ChatMessage::user("what is in this log?"),
            ChatMessage::assistant("three warnings"),
        ]
    );
}

#[test]
fn every_append_is_on_disk_before_returning() {
    let dir = tempdir().expect("tempdir");
    let store = ConversationStore::in_dir(dir.path());
    store.start().expect("start");

    store.append(MessageRole::User, "first").expect("append");
    let on_disk = fs::read_to_string(store.path()).expect("read slot");
    assert!(on_disk.contains("first"));

    store.append(MessageRole::User, "second").expect("append");
    let on_disk = fs::read_to_string(store.path()).expect("read slot");
    assert!(on_disk.contains("second"));
}

#[test]
fn stop_from_another_handle_ends_history() {
    let dir = tempdir().expect("tempdir");
    let writer = ConversationStore::in_dir(dir.path());
    writer.start().expect("start");
    writer.append(MessageRole::User, "hello").expect("append");

    ConversationStore::in_dir(dir.path()).stop().expect("stop");

    assert!(writer.history_for_model().is_empty());
    assert!(!writer.append(MessageRole::User, "after stop").expect("append"));
    assert!(writer.load().is_none());
}

#[test]
fn fresh_conversation_is_not_expired() {
    let dir = tempdir().expect("tempdir");
    let store = ConversationStore::in_dir(dir.path());
    store.start().expect("start");
    assert!(!store.is_expired(DEFAULT_EXPIRY));

    store.append(MessageRole::User, "still fresh").expect("append");
    assert!(!store.is_expired(DEFAULT_EXPIRY));
}

#[test]
fn truncated_slot_degrades_to_no_history() {
    let dir = tempdir().expect("tempdir");
    let store = ConversationStore::in_dir(dir.path());
    store.start().expect("start");
    store.append(MessageRole::User, "soon lost").expect("append");

    let content = fs::read_to_string(store.path()).expect("read");
    fs::write(store.path(), &content[..content.len() / 2]).expect("truncate");

    assert!(store.load().is_none());
    assert!(store.history_for_model().is_empty());
    assert!(!store.is_expired(DEFAULT_EXPIRY));

    store.start().expect("start recovers");
    assert!(store.is_active());
}
