use super::*;

#[test]
fn client_message_parses_select_user() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"select_user","user_id":"u1"}"#).expect("parse");
    assert_eq!(msg, ClientMessage::SelectUser { user_id: "u1".into() });
}

#[test]
fn client_message_parses_delete_task() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"delete_task","task_id":"t9"}"#).expect("parse");
    assert_eq!(msg, ClientMessage::DeleteTask { task_id: "t9".into() });
}

#[test]
fn unknown_type_tag_is_rejected() {
    assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"drop_tables"}"#).is_err());
}

#[test]
fn tasks_snapshot_serializes_with_snake_case_tag() {
    let msg = ServerMessage::Tasks {
        user_id: "u1".into(),
        tasks: vec![Task { id: "t1".into(), title: "x".into(), is_done: true }],
    };
    let json = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(json["type"], "tasks");
    assert_eq!(json["tasks"][0]["isDone"], serde_json::json!(true));
}

#[test]
fn error_helper_carries_message() {
    let json = serde_json::to_value(ServerMessage::error("boom")).expect("serialize");
    assert_eq!(json["type"], "error");
    assert_eq!(json["message"], "boom");
}
