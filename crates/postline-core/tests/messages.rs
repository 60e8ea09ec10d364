//! Single-message operations and flag changes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::MockTransport;
use postline_core::transport::{BodyPart, Flag, Quota};
use postline_core::{ErrorKind, ListingConfig, MailSession};

fn session(transport: MockTransport) -> MailSession<MockTransport> {
    MailSession::new(transport, ListingConfig::default())
}

#[tokio::test]
async fn message_picks_html_part_from_structure() {
    let mut transport = MockTransport::with_messages(2);
    transport.messages[1].body_structure = Some(BodyPart::multipart(
        "",
        "multipart/alternative",
        vec![
            BodyPart::leaf("1", "text/plain", 10),
            BodyPart::leaf("2", "text/html", 20),
        ],
    ));
    transport.messages[1].body = Some(b"<p>hello</p>".to_vec());
    let mut session = session(transport);

    let detail = session
        .message("INBOX", 20, true, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(detail.text_part.as_deref(), Some("2"));
    assert_eq!(detail.text.as_deref(), Some(&b"<p>hello</p>"[..]));
    assert_eq!(detail.summary.uid, 20);
    assert_eq!(detail.summary.subject(), Some("Message 2"));
    let calls = &session.transport().calls;
    assert!(calls.contains(&"FETCH uid 20 1".to_string()));
    assert!(calls.contains(&"FETCH uid 20 6".to_string()));
}

#[tokio::test]
async fn explicit_part_skips_structure_lookup() {
    let mut session = session(MockTransport::with_messages(2));
    let detail = session
        .message("INBOX", 1, false, Some("1.2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.text_part.as_deref(), Some("1.2"));
    assert_eq!(session.transport().count("FETCH"), 1);
}

#[tokio::test]
async fn message_id_zero_is_invalid() {
    let mut session = session(MockTransport::with_messages(2));
    let err = session.message("INBOX", 0, true, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn missing_message_is_none() {
    let mut session = session(MockTransport::with_messages(2));
    assert!(session.message("INBOX", 99, true, None).await.unwrap().is_none());
}

#[tokio::test]
async fn set_seen_adds_silently_in_read_write_mode() {
    let mut session = session(MockTransport::with_messages(2));
    session.set_seen("INBOX", &[10, 20], true, true).await.unwrap();
    session.set_flagged("INBOX", &[2], false, false).await.unwrap();

    let calls = &session.transport().calls;
    assert!(calls.contains(&"SELECT INBOX rw".to_string()));
    assert!(calls.contains(&"STORE uid 10,20 AddSilent \\Seen".to_string()));
    assert!(calls.contains(&"STORE seq 2 RemoveSilent \\Flagged".to_string()));
}

#[tokio::test]
async fn flag_outside_permanent_flags_is_rejected() {
    let mut session = session(MockTransport::with_messages(2));
    let err = session
        .set_flag("INBOX", &[10], true, Flag::Keyword("$Label1".into()), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(session.transport().count("STORE"), 0);

    let err = session
        .set_flag("INBOX", &[], true, Flag::Seen, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn wildcard_permits_any_keyword() {
    let mut transport = MockTransport::with_messages(2);
    transport.selected.permanent_flags = vec![Flag::parse("\\*")];
    let mut session = session(transport);
    session
        .set_flag("INBOX", &[10], true, Flag::Keyword("$Label1".into()), true)
        .await
        .unwrap();
    assert!(
        session
            .transport()
            .calls
            .contains(&"STORE uid 10 AddSilent $Label1".to_string())
    );
}

#[tokio::test]
async fn delete_by_uid_expunges_only_those_messages() {
    let mut session = session(MockTransport::with_messages(2));
    session.delete_messages("INBOX", &[10], true, true).await.unwrap();
    session.delete_messages("INBOX", &[2], false, true).await.unwrap();
    session.delete_messages("INBOX", &[1], false, false).await.unwrap();

    let calls = &session.transport().calls;
    assert!(calls.contains(&"STORE uid 10 AddSilent \\Deleted".to_string()));
    assert!(calls.contains(&"EXPUNGE 10".to_string()));
    assert!(calls.contains(&"EXPUNGE -".to_string()));
    assert_eq!(session.transport().count("EXPUNGE"), 2);
}

#[tokio::test]
async fn move_copies_then_deletes() {
    let mut session = session(MockTransport::with_messages(2));
    session
        .move_messages("INBOX", "Archive", &[10, 20], true)
        .await
        .unwrap();

    let calls = &session.transport().calls;
    let copy = calls.iter().position(|c| c == "COPY 10,20 Archive").unwrap();
    let store = calls
        .iter()
        .position(|c| c == "STORE uid 10,20 AddSilent \\Deleted")
        .unwrap();
    assert!(copy < store);
    assert!(calls.contains(&"EXPUNGE 10,20".to_string()));

    let err = session
        .move_messages("INBOX", "", &[10], true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn append_returns_reported_uid() {
    let mut transport = MockTransport::with_messages(0);
    transport.append_uid = Some(42);
    let mut session = session(transport);

    let uid = session
        .append_message("Sent", b"Subject: hi\r\n\r\nbody\r\n", &[Flag::Seen])
        .await
        .unwrap();
    assert_eq!(uid, Some(42));

    let err = session.append_message("Sent", b"", &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn message_id_lookup_needs_a_unique_match() {
    let mut transport = MockTransport::with_messages(3);
    transport.search_replies.push_back(Ok(vec![20]));
    transport.search_replies.push_back(Ok(vec![20, 30]));
    let mut session = session(transport);

    let found = session
        .find_uid_by_message_id("INBOX", "<20@example.com>")
        .await
        .unwrap();
    assert_eq!(found, Some(20));

    let ambiguous = session
        .find_uid_by_message_id("INBOX", "<20@example.com>")
        .await
        .unwrap();
    assert_eq!(ambiguous, None);
}

#[tokio::test]
async fn quota_is_passed_through() {
    let mut transport = MockTransport::with_messages(0);
    transport.quota = Some(Quota {
        used: 512,
        limit: 1024,
    });
    let mut session = session(transport);
    let quota = session.quota().await.unwrap().unwrap();
    assert_eq!(quota.used, 512);
    assert_eq!(quota.limit, 1024);
}
