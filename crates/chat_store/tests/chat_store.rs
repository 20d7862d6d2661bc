use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use chat_store::{chat_file_name, chat_root, ChatStore, ChatStoreError};
use serde_json::json;
use tempfile::TempDir;

fn open_store() -> (TempDir, ChatStore) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = ChatStore::open(dir.path()).expect("store should open");
    (dir, store)
}

fn write_chat_file(store: &ChatStore, chat_id: &str, lines: &[String]) -> PathBuf {
    let path = store.root().join(chat_file_name(chat_id));
    let mut file = File::create(&path).expect("chat file should be created");
    for line in lines {
        writeln!(file, "{line}").expect("line should be written");
    }
    path
}

fn header_line(chat_id: &str) -> String {
    json!({
        "type": "chat",
        "version": 1,
        "id": chat_id,
        "public_id": "pub0001",
        "title": "Transacciones de ventas",
        "created_at": "2026-02-14T00:00:00Z",
    })
    .to_string()
}

fn message_line(id: &str, ts: &str, content: &str, is_user: bool) -> String {
    json!({
        "type": "message",
        "id": id,
        "content": content,
        "is_user": is_user,
        "created_at": ts,
    })
    .to_string()
}

#[test]
fn open_creates_chat_directory() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let store = ChatStore::open(dir.path()).expect("store should open");
    assert_eq!(store.root(), chat_root(dir.path()));
    assert!(store.root().is_dir());
}

#[test]
fn create_append_and_load_round_trip() {
    let (_dir, store) = open_store();
    let chat = store.create_chat("¿Cómo uso SE16N?").expect("create chat");
    assert!(!chat.is_public);
    assert_eq!(chat.created_at, chat.updated_at);

    let question = store
        .append_message(&chat.id, "¿Cómo uso SE16N?", true)
        .expect("append user message");
    let answer = store
        .append_message(&chat.id, "Abre la transacción SE16N y...", false)
        .expect("append assistant message");

    let log = store.load(&chat.id).expect("load chat");
    assert_eq!(log.chat.id, chat.id);
    assert_eq!(log.chat.title, "¿Cómo uso SE16N?");
    assert_eq!(log.messages, vec![question, answer.clone()]);
    assert_eq!(log.chat.updated_at, answer.created_at);
}

#[test]
fn find_resolves_id_and_public_id() {
    let (_dir, store) = open_store();
    let chat = store.create_chat("Consulta").expect("create chat");

    let by_id = store.find(&chat.id).expect("find by id").expect("chat exists");
    assert_eq!(by_id.chat.id, chat.id);

    let by_public = store
        .find(&chat.public_id)
        .expect("find by public id")
        .expect("chat exists");
    assert_eq!(by_public.chat.id, chat.id);

    assert!(store.find("missing-chat").expect("find missing").is_none());
    assert!(store.find("../etc/passwd").expect("find traversal").is_none());
}

#[test]
fn set_public_is_reflected_on_reload() {
    let (_dir, store) = open_store();
    let chat = store.create_chat("Compartir").expect("create chat");

    let shared = store.set_public(&chat.id, true).expect("share chat");
    assert!(shared.is_public);
    assert!(store.load(&chat.id).expect("reload").chat.is_public);

    let hidden = store.set_public(&chat.id, false).expect("unshare chat");
    assert!(!hidden.is_public);
}

#[test]
fn list_recent_orders_by_last_activity_and_limits() {
    let (_dir, store) = open_store();
    write_chat_file(
        &store,
        "chat-old",
        &[
            header_line("chat-old"),
            message_line("m1", "2026-02-14T00:00:05Z", "hola", true),
        ],
    );
    write_chat_file(
        &store,
        "chat-new",
        &[
            header_line("chat-new"),
            message_line("m1", "2026-02-15T09:00:00Z", "hola", true),
        ],
    );
    write_chat_file(&store, "chat-empty", &[header_line("chat-empty")]);

    let chats = store.list_recent(50).expect("list");
    let ids = chats.iter().map(|chat| chat.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["chat-new", "chat-old", "chat-empty"]);

    let limited = store.list_recent(1).expect("list limited");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, "chat-new");
}

#[test]
fn list_recent_skips_corrupt_files() {
    let (_dir, store) = open_store();
    store.create_chat("Válido").expect("create chat");
    write_chat_file(&store, "broken", &["{not json".to_owned()]);
    fs::write(store.root().join("notes.txt"), "ignored").expect("write stray file");

    let chats = store.list_recent(50).expect("list");
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].title, "Válido");
}

#[test]
fn delete_removes_chat_and_reports_unknown() {
    let (_dir, store) = open_store();
    let chat = store.create_chat("Borrar").expect("create chat");

    store.delete(&chat.id).expect("delete");
    assert!(matches!(
        store.load(&chat.id),
        Err(ChatStoreError::UnknownChat { .. })
    ));
    assert!(matches!(
        store.delete(&chat.id),
        Err(ChatStoreError::UnknownChat { .. })
    ));
}

#[test]
fn append_to_unknown_chat_fails() {
    let (_dir, store) = open_store();
    let error = store
        .append_message("no-such-chat", "hola", true)
        .expect_err("unknown chat must fail");
    assert!(matches!(error, ChatStoreError::UnknownChat { .. }));

    let error = store
        .append_message("../escape", "hola", true)
        .expect_err("invalid id must fail");
    assert!(matches!(error, ChatStoreError::InvalidChatId { .. }));
}

#[test]
fn load_rejects_missing_header() {
    let (_dir, store) = open_store();
    write_chat_file(&store, "empty", &[]);

    let error = store.load("empty").expect_err("empty file must fail");
    assert!(matches!(error, ChatStoreError::MissingHeader { .. }));
}

#[test]
fn load_rejects_message_as_first_line() {
    let (_dir, store) = open_store();
    write_chat_file(
        &store,
        "headless",
        &[message_line("m1", "2026-02-14T00:00:01Z", "hola", true)],
    );

    let error = store.load("headless").expect_err("headless file must fail");
    assert!(matches!(
        error,
        ChatStoreError::InvalidHeaderRecord { line: 1, .. }
    ));
}

#[test]
fn load_rejects_unsupported_version() {
    let (_dir, store) = open_store();
    write_chat_file(
        &store,
        "future",
        &[json!({
            "type": "chat",
            "version": 2,
            "id": "future",
            "public_id": "p",
            "title": "t",
            "created_at": "2026-02-14T00:00:00Z",
        })
        .to_string()],
    );

    let error = store.load("future").expect_err("version 2 must fail");
    assert!(matches!(
        error,
        ChatStoreError::UnsupportedVersion {
            line: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn load_rejects_duplicate_message_ids() {
    let (_dir, store) = open_store();
    write_chat_file(
        &store,
        "dupes",
        &[
            header_line("dupes"),
            message_line("m1", "2026-02-14T00:00:01Z", "hola", true),
            message_line("m1", "2026-02-14T00:00:02Z", "otra vez", true),
        ],
    );

    let error = store.load("dupes").expect_err("duplicate ids must fail");
    assert!(matches!(
        error,
        ChatStoreError::DuplicateMessageId { line: 3, ref id, .. } if id == "m1"
    ));
}

#[test]
fn load_rejects_repeated_header_and_bad_timestamps() {
    let (_dir, store) = open_store();
    write_chat_file(
        &store,
        "twice",
        &[header_line("twice"), header_line("twice")],
    );
    assert!(matches!(
        store.load("twice"),
        Err(ChatStoreError::InvalidEntryRecord { line: 2, .. })
    ));

    write_chat_file(
        &store,
        "badts",
        &[
            header_line("badts"),
            message_line("m1", "yesterday", "hola", true),
        ],
    );
    assert!(matches!(
        store.load("badts"),
        Err(ChatStoreError::InvalidTimestamp {
            line: 2,
            field: "created_at",
            ..
        })
    ));
}

#[test]
fn load_reports_malformed_json_with_line_context() {
    let (_dir, store) = open_store();
    write_chat_file(&store, "garbled", &[header_line("garbled"), "{oops".to_owned()]);

    let error = store.load("garbled").expect_err("malformed line must fail");
    assert!(matches!(
        error,
        ChatStoreError::JsonLineParse { line: 2, .. }
    ));
    assert!(error.to_string().contains(":2:"));
}
