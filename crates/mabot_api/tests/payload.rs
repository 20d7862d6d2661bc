use serde_json::json;

use mabot_api::payload::{AudioContent, FileContent, TextContent};
use mabot_api::{Content, Message, ParseMode, Platform, Role, Token, UpdateIn, UpdateOut};

#[test]
fn update_in_serializes_absent_ids_as_null() {
    let update = UpdateIn {
        platform: Platform::Web,
        chat_id: None,
        platform_chat_id: None,
        messages: vec![Message::user(vec![Content::text("hola")])],
        bot_username: None,
        prefix_with_bot_name: false,
    };

    let value = serde_json::to_value(&update).expect("serialize update");
    assert_eq!(
        value,
        json!({
            "platform": "web",
            "chat_id": null,
            "platform_chat_id": null,
            "messages": [
                {"role": "user", "contents": [{"type": "text", "value": "hola"}]}
            ],
            "bot_username": null,
            "prefix_with_bot_name": false,
        })
    );
}

#[test]
fn content_variants_use_type_tag() {
    let image = Content::Image(FileContent {
        value: "https://cdn/x.png".to_owned(),
        filename: "x.png".to_owned(),
        mimetype: "image/png".to_owned(),
    });
    let value = serde_json::to_value(&image).expect("serialize image");
    assert_eq!(value["type"], "image");
    assert_eq!(value["mimetype"], "image/png");

    let document: Content = serde_json::from_value(json!({
        "type": "document",
        "value": "ref",
        "filename": "a.pdf",
        "mimetype": "application/pdf",
    }))
    .expect("deserialize document");
    assert!(matches!(document, Content::Document(FileContent { ref filename, .. }) if filename == "a.pdf"));
}

#[test]
fn text_parse_mode_uses_wire_names() {
    let content = Content::Text(TextContent {
        value: "<b>x</b>".to_owned(),
        parse_mode: Some(ParseMode::Html),
    });
    let value = serde_json::to_value(&content).expect("serialize text");
    assert_eq!(value["parse_mode"], "HTML");

    let parsed: Content = serde_json::from_value(json!({
        "type": "text",
        "value": "*x*",
        "parse_mode": "MarkdownV2",
    }))
    .expect("deserialize text");
    assert_eq!(
        parsed,
        Content::Text(TextContent {
            value: "*x*".to_owned(),
            parse_mode: Some(ParseMode::MarkdownV2),
        })
    );
}

#[test]
fn audio_content_is_base64_and_requests_transcription() {
    let content = Content::audio(b"abc", "nota.webm", "audio/webm");
    match content {
        Content::Audio(AudioContent {
            value,
            parse_to_text,
            mimetype,
            ..
        }) => {
            assert_eq!(value, "YWJj");
            assert_eq!(parse_to_text, Some(true));
            assert_eq!(mimetype, "audio/webm");
        }
        other => panic!("unexpected content: {other:?}"),
    }
}

#[test]
fn update_out_joins_assistant_text_only() {
    let update: UpdateOut = serde_json::from_value(json!({
        "chat_id": "remote-1",
        "messages": [
            {"role": "user", "contents": [{"type": "text", "value": "pregunta"}]},
            {"role": "assistant", "contents": [
                {"type": "text", "value": "Primera parte"},
                {"type": "image", "value": "ref", "filename": "a.png", "mimetype": "image/png"},
                {"type": "text", "value": "Segunda parte"}
            ]},
            {"role": "tool", "contents": [{"type": "text", "value": "internal"}]}
        ]
    }))
    .expect("deserialize update out");

    assert_eq!(update.chat_id, "remote-1");
    assert!(update.platform_chat_id.is_none());
    assert_eq!(update.assistant_text(), "Primera parte\n\nSegunda parte");
}

#[test]
fn nested_reply_to_message_round_trips_roles() {
    let message: Message = serde_json::from_value(json!({
        "role": "assistant",
        "contents": [],
        "reply_to_message": {"role": "function", "contents": []}
    }))
    .expect("deserialize nested message");
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(
        message.reply_to_message.map(|reply| reply.role),
        Some(Role::Function)
    );
}

#[test]
fn token_type_defaults_when_missing() {
    let token: Token = serde_json::from_value(json!({
        "access_token": "a",
        "refresh_token": "r",
    }))
    .expect("deserialize token");
    assert_eq!(token.token_type, "");
}
