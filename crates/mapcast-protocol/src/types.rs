//! Core protocol types for Mapcast's wire format.
//!
//! Everything in this module either arrives from a browser client or is
//! written to one. The text rendering of each type lives in
//! [`codec`](crate::codec); here we only describe the shapes.

use std::fmt;

/// The field separator used by every frame.
pub const FIELD_SEPARATOR: char = '|';

// ---------------------------------------------------------------------------
// ActivityId: the first field of every frame
// ---------------------------------------------------------------------------

/// The integer code that opens every frame and says what the rest means.
///
/// Codes below 100 flow client → server, codes from 101 flow
/// server → client. The numeric values are shared with the browser client
/// and must never be renumbered.
///
/// `#[repr(u16)]` pins the discriminants so `as u16` yields the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ActivityId {
    /// Placeholder code; always ignored.
    Unknown = 0,

    /// Client → Server: "here is my session token, bind me to my account."
    Auth = 1,

    /// Server → Client: a pin was added by someone else.
    MarkerAdded = 101,

    /// Server → Client: a pin was removed by an admin.
    MarkerRemoved = 102,

    /// Server → Client: a polygon layer was created.
    LayerAdded = 105,

    /// Server → Client: a polygon layer was deleted.
    LayerRemoved = 106,

    /// Server → Client: a polygon layer's metadata or geometry changed.
    LayerEdited = 107,
}

impl ActivityId {
    /// Looks up an activity by its wire code.
    ///
    /// Returns `None` for codes nobody has assigned. Note that `0` maps to
    /// [`ActivityId::Unknown`], which callers still treat as "ignore".
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Auth),
            101 => Some(Self::MarkerAdded),
            102 => Some(Self::MarkerRemoved),
            105 => Some(Self::LayerAdded),
            106 => Some(Self::LayerRemoved),
            107 => Some(Self::LayerEdited),
            _ => None,
        }
    }

    /// Returns the wire code for this activity.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns `true` for activities a client is allowed to send.
    pub fn is_inbound(self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "UNKNOWN",
            Self::Auth => "AUTH",
            Self::MarkerAdded => "MARKER_ADDED",
            Self::MarkerRemoved => "MARKER_REMOVED",
            Self::LayerAdded => "LAYER_ADDED",
            Self::LayerRemoved => "LAYER_REMOVED",
            Self::LayerEdited => "LAYER_EDITED",
        };
        write!(f, "{name}({})", self.code())
    }
}

// ---------------------------------------------------------------------------
// ClientMessage: what a browser may send us
// ---------------------------------------------------------------------------

/// A decoded client → server frame.
///
/// There is exactly one today. It stays an enum so the connection handler
/// `match`es on it and the compiler flags the handler when a new inbound
/// activity is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `1|<token>`: bind this connection to the account owning `token`.
    Auth { token: String },
}

// ---------------------------------------------------------------------------
// ServerMessage: what we push to browsers
// ---------------------------------------------------------------------------

/// A server → client notification, one variant per outbound activity.
///
/// Fields are listed in the order they appear on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// `101|id|name|url|lat|lng`
    MarkerAdded {
        id: String,
        name: String,
        url: String,
        lat: f64,
        lng: f64,
    },

    /// `102|id`
    MarkerRemoved { id: String },

    /// `105|id|name|description|geometryJson`
    LayerAdded {
        id: String,
        name: String,
        description: String,
        geometry_json: String,
    },

    /// `106|id`
    LayerRemoved { id: String },

    /// `107|id|name|description|geometryJson`
    LayerEdited {
        id: String,
        name: String,
        description: String,
        geometry_json: String,
    },
}

impl ServerMessage {
    /// The activity code this message is sent under.
    pub fn activity(&self) -> ActivityId {
        match self {
            Self::MarkerAdded { .. } => ActivityId::MarkerAdded,
            Self::MarkerRemoved { .. } => ActivityId::MarkerRemoved,
            Self::LayerAdded { .. } => ActivityId::LayerAdded,
            Self::LayerRemoved { .. } => ActivityId::LayerRemoved,
            Self::LayerEdited { .. } => ActivityId::LayerEdited,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame: one encoded text message
// ---------------------------------------------------------------------------

/// One encoded text frame, ready to be written to a connection.
///
/// A newtype rather than a bare `String` so a frame can't be confused with
/// any other text (a name, a token) in function signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame(String);

impl Frame {
    /// Wraps already-encoded text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrows the frame text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the owned frame text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_codes_match_wire_table() {
        assert_eq!(ActivityId::Unknown.code(), 0);
        assert_eq!(ActivityId::Auth.code(), 1);
        assert_eq!(ActivityId::MarkerAdded.code(), 101);
        assert_eq!(ActivityId::MarkerRemoved.code(), 102);
        assert_eq!(ActivityId::LayerAdded.code(), 105);
        assert_eq!(ActivityId::LayerRemoved.code(), 106);
        assert_eq!(ActivityId::LayerEdited.code(), 107);
    }

    #[test]
    fn test_from_code_unassigned_returns_none() {
        assert_eq!(ActivityId::from_code(2), None);
        assert_eq!(ActivityId::from_code(103), None);
        assert_eq!(ActivityId::from_code(104), None);
    }

    #[test]
    fn test_from_code_zero_is_unknown() {
        assert_eq!(ActivityId::from_code(0), Some(ActivityId::Unknown));
    }

    #[test]
    fn test_is_inbound_only_auth() {
        assert!(ActivityId::Auth.is_inbound());
        assert!(!ActivityId::Unknown.is_inbound());
        assert!(!ActivityId::MarkerAdded.is_inbound());
        assert!(!ActivityId::LayerEdited.is_inbound());
    }

    #[test]
    fn test_activity_display_includes_name_and_code() {
        assert_eq!(ActivityId::LayerEdited.to_string(), "LAYER_EDITED(107)");
    }

    #[test]
    fn test_server_message_activity() {
        let msg = ServerMessage::LayerRemoved { id: "l1".into() };
        assert_eq!(msg.activity(), ActivityId::LayerRemoved);
    }

    #[test]
    fn test_frame_display_is_raw_text() {
        let frame = Frame::new("102|m1");
        assert_eq!(frame.to_string(), "102|m1");
        assert_eq!(frame.as_str(), "102|m1");
        assert_eq!(frame.into_string(), "102|m1");
    }
}
