//! Core protocol types for Teamchat's wire format.
//!
//! Everything in this module is serialized with camelCase field names
//! and kebab-case `type` tags, because the other end is a browser.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A team code: the short, shareable name of a chat room.
///
/// Newtype over `String` so a code can't be confused with a user name or
/// message text. `#[serde(transparent)]` keeps it a plain JSON string,
/// which also lets it key a JSON object in [`TeamMap`].
///
/// Codes coming from users must go through [`TeamCode::normalize`];
/// [`TeamCode::new`] stores its argument as-is.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TeamCode(String);

impl TeamCode {
    /// Wraps an already-normalized code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Trims and uppercases user input. Returns `None` when nothing is
    /// left after trimming.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single chat message within a room's log.
///
/// Generated by the room layer as `<unix-millis>-<random suffix>`; the
/// protocol treats it as an opaque string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registered team. Created once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// The team's code (also the room name).
    pub code: TeamCode,
    /// When the team was registered.
    pub created_at: DateTime<Utc>,
}

/// All registered teams, ordered by code.
pub type TeamMap = BTreeMap<TeamCode, Team>;

/// One entry in a room's log: either a chat line or a system notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique within the room's log.
    pub id: MessageId,
    /// Author's display name. `None` for system notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Message body (already trimmed).
    pub text: String,
    /// Server time the message was created.
    pub timestamp: DateTime<Utc>,
    /// `true` for join/leave notices.
    pub is_system: bool,
}

impl ChatMessage {
    /// Builds a message authored by a joined member.
    pub fn user(
        id: MessageId,
        name: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: Some(name.into()),
            text: text.into(),
            timestamp,
            is_system: false,
        }
    }

    /// Builds a system notice (no author).
    pub fn system(
        id: MessageId,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: None,
            text: text.into(),
            timestamp,
            is_system: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client can send.
///
/// Every payload field is optional on the wire. A frame like
/// `{"seq":1,"type":"join-room"}` still decodes; the room layer is what
/// rejects it with a "missing field" ack. That keeps validation errors
/// addressable to the request instead of turning them into decode
/// failures with no request to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Register a new team, optionally with a chosen code.
    CreateTeam {
        #[serde(default)]
        custom_code: Option<String>,
    },

    /// List every registered team.
    ListTeams,

    /// Join the room for `team_code` under display name `name`.
    JoinRoom {
        #[serde(default)]
        team_code: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },

    /// Post a message to the joined room.
    SendMessage {
        #[serde(default)]
        text: Option<String>,
    },

    /// Remove a message from the joined room's log.
    DeleteMessage {
        #[serde(default)]
        id: Option<String>,
    },

    /// Keep-alive. Answered with [`ServerEvent::Pong`], no ack.
    Ping {
        #[serde(default)]
        client_time: u64,
    },
}

/// An inbound frame: a client-chosen sequence number plus the event.
///
/// The server echoes `seq` back as [`Ack::reply_to`] so clients can match
/// acknowledgements to requests.
///
/// ```text
/// {"seq": 4, "type": "send-message", "text": "hi"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Client-side request counter. Defaults to 0 when omitted.
    #[serde(default)]
    pub seq: u64,

    #[serde(flatten)]
    pub event: ClientEvent,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// The single acknowledgement sent for each [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// The `seq` of the request being answered.
    pub reply_to: u64,
    /// Whether the request succeeded.
    pub ok: bool,
    /// Human-readable failure reason, present only when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The new code, on a successful `create-team`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_code: Option<TeamCode>,
    /// The registry contents, on a successful `list-teams`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<TeamMap>,
}

impl Ack {
    /// A bare success ack.
    pub fn ok(reply_to: u64) -> Self {
        Self {
            reply_to,
            ok: true,
            error: None,
            team_code: None,
            teams: None,
        }
    }

    /// A failure ack carrying `error`'s message.
    pub fn failure(reply_to: u64, error: impl fmt::Display) -> Self {
        Self {
            reply_to,
            ok: false,
            error: Some(error.to_string()),
            team_code: None,
            teams: None,
        }
    }

    /// Attaches a team code (create-team).
    pub fn with_team_code(mut self, code: TeamCode) -> Self {
        self.team_code = Some(code);
        self
    }

    /// Attaches the team listing (list-teams).
    pub fn with_teams(mut self, teams: TeamMap) -> Self {
        self.teams = Some(teams);
        self
    }
}

/// Everything the server can push to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Answer to one request.
    Ack(Ack),

    /// The room's full log, sent only to a member that just joined.
    RoomHistory { messages: Vec<ChatMessage> },

    /// A new message (chat line or system notice), broadcast.
    Message(ChatMessage),

    /// A message was removed from the log, broadcast.
    DeleteMessage { id: MessageId },

    /// Reply to [`ClientEvent::Ping`]. `server_time` is unix millis.
    Pong { client_time: u64, server_time: u64 },

    /// A frame could not be decoded, so there is no `seq` to ack.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client parses these exact JSON shapes, so most tests
    //! here pin the serde attributes rather than round-trip values.

    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    // =====================================================================
    // TeamCode
    // =====================================================================

    #[test]
    fn test_team_code_normalize_trims_and_uppercases() {
        let code = TeamCode::normalize("  test01 \n").unwrap();
        assert_eq!(code.as_str(), "TEST01");
    }

    #[test]
    fn test_team_code_normalize_empty_is_none() {
        assert!(TeamCode::normalize("").is_none());
        assert!(TeamCode::normalize("   ").is_none());
    }

    #[test]
    fn test_team_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&TeamCode::new("ABC234")).unwrap();
        assert_eq!(json, r#""ABC234""#);
        assert_eq!(TeamCode::new("ABC234").to_string(), "ABC234");
    }

    #[test]
    fn test_team_map_serializes_as_object_keyed_by_code() {
        let mut teams = TeamMap::new();
        teams.insert(
            TeamCode::new("TEST01"),
            Team { code: TeamCode::new("TEST01"), created_at: at(0) },
        );
        let json = serde_json::to_value(&teams).unwrap();
        assert_eq!(json["TEST01"]["code"], "TEST01");
        assert!(json["TEST01"]["createdAt"].is_string());

        let back: TeamMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, teams);
    }

    // =====================================================================
    // ChatMessage
    // =====================================================================

    #[test]
    fn test_chat_message_user_json_format() {
        let msg = ChatMessage::user(MessageId::new("1-abc"), "Alice", "hi", at(10));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["id"], "1-abc");
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["isSystem"], false);
    }

    #[test]
    fn test_chat_message_system_omits_name() {
        let msg = ChatMessage::system(MessageId::new("2-xyz"), "Alice joined", at(10));
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("name").is_none());
        assert_eq!(json["isSystem"], true);
    }

    // =====================================================================
    // Request / ClientEvent
    // =====================================================================

    #[test]
    fn test_request_join_room_decodes_camel_case_fields() {
        let frame = r#"{"seq":1,"type":"join-room","teamCode":"test01","name":"Alice"}"#;
        let req: Request = serde_json::from_str(frame).unwrap();
        assert_eq!(req.seq, 1);
        assert_eq!(
            req.event,
            ClientEvent::JoinRoom {
                team_code: Some("test01".into()),
                name: Some("Alice".into()),
            }
        );
    }

    #[test]
    fn test_request_missing_payload_fields_decode_as_none() {
        let req: Request =
            serde_json::from_str(r#"{"seq":2,"type":"join-room"}"#).unwrap();
        assert_eq!(
            req.event,
            ClientEvent::JoinRoom { team_code: None, name: None }
        );

        let req: Request =
            serde_json::from_str(r#"{"seq":3,"type":"delete-message"}"#).unwrap();
        assert_eq!(req.event, ClientEvent::DeleteMessage { id: None });
    }

    #[test]
    fn test_request_delete_message_id_is_not_the_seq() {
        let req: Request = serde_json::from_str(
            r#"{"seq":9,"type":"delete-message","id":"17-abcdef"}"#,
        )
        .unwrap();
        assert_eq!(req.seq, 9);
        assert_eq!(
            req.event,
            ClientEvent::DeleteMessage { id: Some("17-abcdef".into()) }
        );
    }

    #[test]
    fn test_request_seq_defaults_to_zero() {
        let req: Request =
            serde_json::from_str(r#"{"type":"list-teams"}"#).unwrap();
        assert_eq!(req.seq, 0);
        assert_eq!(req.event, ClientEvent::ListTeams);
    }

    #[test]
    fn test_request_create_team_with_custom_code() {
        let req: Request = serde_json::from_str(
            r#"{"seq":1,"type":"create-team","customCode":"team1"}"#,
        )
        .unwrap();
        assert_eq!(
            req.event,
            ClientEvent::CreateTeam { custom_code: Some("team1".into()) }
        );
    }

    #[test]
    fn test_request_unknown_type_is_rejected() {
        let result: Result<Request, _> =
            serde_json::from_str(r#"{"seq":1,"type":"fly-to-moon"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerEvent / Ack
    // =====================================================================

    #[test]
    fn test_ack_ok_omits_optional_fields() {
        let json = serde_json::to_value(ServerEvent::Ack(Ack::ok(5))).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["replyTo"], 5);
        assert_eq!(json["ok"], true);
        assert!(json.get("error").is_none());
        assert!(json.get("teamCode").is_none());
        assert!(json.get("teams").is_none());
    }

    #[test]
    fn test_ack_failure_carries_error_text() {
        let ack = Ack::failure(6, "team not found");
        let json = serde_json::to_value(ServerEvent::Ack(ack)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "team not found");
    }

    #[test]
    fn test_ack_with_team_code() {
        let ack = Ack::ok(1).with_team_code(TeamCode::new("TEST01"));
        let json = serde_json::to_value(ServerEvent::Ack(ack)).unwrap();
        assert_eq!(json["teamCode"], "TEST01");
    }

    #[test]
    fn test_server_event_message_is_flat() {
        let msg = ChatMessage::user(MessageId::new("1-a"), "Bob", "yo", at(1));
        let json = serde_json::to_value(ServerEvent::Message(msg)).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["name"], "Bob");
        assert_eq!(json["text"], "yo");
    }

    #[test]
    fn test_server_event_room_history_and_delete_shapes() {
        let json = serde_json::to_value(ServerEvent::RoomHistory {
            messages: vec![],
        })
        .unwrap();
        assert_eq!(json["type"], "room-history");
        assert_eq!(json["messages"], serde_json::json!([]));

        let json = serde_json::to_value(ServerEvent::DeleteMessage {
            id: MessageId::new("1-a"),
        })
        .unwrap();
        assert_eq!(json["type"], "delete-message");
        assert_eq!(json["id"], "1-a");
    }

    #[test]
    fn test_server_event_pong_json_format() {
        let json = serde_json::to_value(ServerEvent::Pong {
            client_time: 10,
            server_time: 20,
        })
        .unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["clientTime"], 10);
        assert_eq!(json["serverTime"], 20);
    }
}
