//! Codec trait and the pipe-delimited implementation.
//!
//! A "codec" converts between typed messages and frames. The connection
//! handler and the broadcast dispatcher only see the [`Codec`] trait, so a
//! different framing can be swapped in without touching either of them.

use crate::{ActivityId, ClientMessage, Frame, ProtocolError, ServerMessage, FIELD_SEPARATOR};

/// Encodes outbound messages and decodes inbound frames.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task and by the dispatcher for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Renders a server message as a frame. Encoding text never fails.
    fn encode(&self, msg: &ServerMessage) -> Frame;

    /// Parses a raw inbound payload.
    ///
    /// # Errors
    /// Any [`ProtocolError`]; callers drop the frame without replying.
    fn decode(&self, data: &[u8]) -> Result<ClientMessage, ProtocolError>;
}

// ---------------------------------------------------------------------------
// PipeCodec
// ---------------------------------------------------------------------------

/// The `code|field|field|...` text codec spoken by the browser client.
///
/// # Known limitation
///
/// Fields are written verbatim. A `|` inside a marker name, a layer
/// description or the geometry JSON produces a frame with extra fields, and
/// the client's positional split will misread it. The browser client has no
/// escape rule to agree on, so the codec does not invent one.
///
/// ## Example
///
/// ```rust
/// use mapcast_protocol::{ClientMessage, Codec, PipeCodec, ServerMessage};
///
/// let codec = PipeCodec;
///
/// let frame = codec.encode(&ServerMessage::MarkerRemoved { id: "m1".into() });
/// assert_eq!(frame.as_str(), "102|m1");
///
/// let msg = codec.decode(b"1|secret").unwrap();
/// assert_eq!(msg, ClientMessage::Auth { token: "secret".into() });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeCodec;

impl PipeCodec {
    fn join(activity: ActivityId, fields: &[&str]) -> Frame {
        let mut text = activity.code().to_string();
        for field in fields {
            text.push(FIELD_SEPARATOR);
            text.push_str(field);
        }
        Frame::new(text)
    }
}

impl Codec for PipeCodec {
    fn encode(&self, msg: &ServerMessage) -> Frame {
        let activity = msg.activity();
        match msg {
            ServerMessage::MarkerAdded {
                id,
                name,
                url,
                lat,
                lng,
            } => {
                // `f64`'s Display is the shortest round-trip form: 53.1, 50.
                let lat = lat.to_string();
                let lng = lng.to_string();
                Self::join(activity, &[id.as_str(), name, url, &lat, &lng])
            }
            ServerMessage::MarkerRemoved { id } | ServerMessage::LayerRemoved { id } => {
                Self::join(activity, &[id.as_str()])
            }
            ServerMessage::LayerAdded {
                id,
                name,
                description,
                geometry_json,
            }
            | ServerMessage::LayerEdited {
                id,
                name,
                description,
                geometry_json,
            } => Self::join(
                activity,
                &[id.as_str(), name, description, geometry_json],
            ),
        }
    }

    fn decode(&self, data: &[u8]) -> Result<ClientMessage, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::NotUtf8)?;
        let mut fields = text.split(FIELD_SEPARATOR);

        // `split` always yields at least one item, even for "".
        let head = fields.next().unwrap_or_default();
        let activity = head
            .trim()
            .parse::<u16>()
            .ok()
            .and_then(ActivityId::from_code)
            .filter(|a| *a != ActivityId::Unknown)
            .ok_or_else(|| ProtocolError::UnknownActivity(head.to_string()))?;
        if !activity.is_inbound() {
            return Err(ProtocolError::UnsupportedActivity(activity));
        }

        match activity {
            ActivityId::Auth => {
                let token = fields.next().unwrap_or_default();
                if token.is_empty() {
                    return Err(ProtocolError::InvalidMessage(
                        "AUTH frame without a token".into(),
                    ));
                }
                Ok(ClientMessage::Auth {
                    token: token.to_string(),
                })
            }
            other => Err(ProtocolError::InvalidMessage(format!(
                "no decoder for inbound activity {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(msg: ServerMessage) -> String {
        PipeCodec.encode(&msg).into_string()
    }

    // =====================================================================
    // encode()
    // =====================================================================

    #[test]
    fn test_encode_marker_added_field_order() {
        let frame = encode(ServerMessage::MarkerAdded {
            id: "m7".into(),
            name: "Park".into(),
            url: "http://x".into(),
            lat: 53.1,
            lng: 50.2,
        });
        assert_eq!(frame, "101|m7|Park|http://x|53.1|50.2");
    }

    #[test]
    fn test_encode_marker_added_whole_coordinates_have_no_fraction() {
        let frame = encode(ServerMessage::MarkerAdded {
            id: "m1".into(),
            name: "A".into(),
            url: "u".into(),
            lat: 50.0,
            lng: -3.0,
        });
        assert_eq!(frame, "101|m1|A|u|50|-3");
    }

    #[test]
    fn test_encode_marker_removed() {
        assert_eq!(encode(ServerMessage::MarkerRemoved { id: "m1".into() }), "102|m1");
    }

    #[test]
    fn test_encode_layer_added_keeps_geometry_as_one_field() {
        let geometry = r#"{"type":"Polygon","coordinates":[[[1,2],[3,4],[1,2]]]}"#;
        let frame = encode(ServerMessage::LayerAdded {
            id: "l1".into(),
            name: "Zone".into(),
            description: "north".into(),
            geometry_json: geometry.into(),
        });
        assert_eq!(frame, format!("105|l1|Zone|north|{geometry}"));
        assert_eq!(frame.split('|').count(), 5);
    }

    #[test]
    fn test_encode_layer_edited_uses_code_107() {
        let frame = encode(ServerMessage::LayerEdited {
            id: "l1".into(),
            name: "Zone".into(),
            description: "".into(),
            geometry_json: "{}".into(),
        });
        assert_eq!(frame, "107|l1|Zone||{}");
    }

    #[test]
    fn test_encode_layer_removed() {
        assert_eq!(encode(ServerMessage::LayerRemoved { id: "l9".into() }), "106|l9");
    }

    #[test]
    fn test_encode_pipe_in_field_is_not_escaped() {
        // Pins the known ambiguity: the frame gains an extra field.
        let frame = encode(ServerMessage::MarkerAdded {
            id: "m1".into(),
            name: "Cafe | Bar".into(),
            url: "u".into(),
            lat: 1.0,
            lng: 2.0,
        });
        assert_eq!(frame, "101|m1|Cafe | Bar|u|1|2");
        assert_eq!(frame.split('|').count(), 7);
    }

    // =====================================================================
    // decode()
    // =====================================================================

    #[test]
    fn test_decode_auth_returns_token() {
        let msg = PipeCodec.decode(b"1|abc123").unwrap();
        assert_eq!(msg, ClientMessage::Auth { token: "abc123".into() });
    }

    #[test]
    fn test_decode_auth_ignores_trailing_fields() {
        let msg = PipeCodec.decode(b"1|abc|extra|stuff").unwrap();
        assert_eq!(msg, ClientMessage::Auth { token: "abc".into() });
    }

    #[test]
    fn test_decode_auth_without_token_is_invalid() {
        assert!(matches!(
            PipeCodec.decode(b"1"),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(matches!(
            PipeCodec.decode(b"1|"),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_zero_code_is_unknown() {
        assert!(matches!(
            PipeCodec.decode(b"0|abc"),
            Err(ProtocolError::UnknownActivity(_))
        ));
    }

    #[test]
    fn test_decode_non_numeric_code_is_unknown() {
        assert!(matches!(
            PipeCodec.decode(b"hello|abc"),
            Err(ProtocolError::UnknownActivity(_))
        ));
        assert!(matches!(
            PipeCodec.decode(b""),
            Err(ProtocolError::UnknownActivity(_))
        ));
    }

    #[test]
    fn test_decode_unassigned_code_is_unknown() {
        assert!(matches!(
            PipeCodec.decode(b"42|abc"),
            Err(ProtocolError::UnknownActivity(_))
        ));
    }

    #[test]
    fn test_decode_server_code_from_client_is_unsupported() {
        assert_eq!(
            PipeCodec.decode(b"102|m1"),
            Err(ProtocolError::UnsupportedActivity(ActivityId::MarkerRemoved))
        );
    }

    #[test]
    fn test_decode_rejects_every_non_inbound_code() {
        for code in [101u16, 102, 105, 106, 107] {
            let activity = ActivityId::from_code(code).unwrap();
            assert!(!activity.is_inbound());
            let frame = format!("{code}|x|y|z");
            assert_eq!(
                PipeCodec.decode(frame.as_bytes()),
                Err(ProtocolError::UnsupportedActivity(activity)),
                "{activity}"
            );
        }
    }

    #[test]
    fn test_decode_invalid_utf8_is_rejected() {
        assert_eq!(PipeCodec.decode(&[0xff, 0xfe]), Err(ProtocolError::NotUtf8));
    }
}
