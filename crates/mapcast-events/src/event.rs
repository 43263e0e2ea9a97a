//! The closed set of mutations the rest of the system can announce.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An immutable record of a mutation that has already been persisted.
///
/// Events carry only owned strings and numbers, never references into the
/// store, so they can be cloned, logged and encoded freely.
///
/// `#[serde(tag = "type")]` gives the JSON shape
/// `{ "type": "MarkerRemoved", "id": "m1" }`, which is what the demo
/// console reads from stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A signed-in user added a pin.
    MarkerAdded {
        /// Store-assigned marker id.
        id: String,
        name: String,
        url: String,
        lat: f64,
        lng: f64,
        /// Email of the user who added the pin; they are not echoed.
        owner_email: String,
    },

    /// An admin removed a pin.
    MarkerRemoved { id: String },

    /// An admin created a polygon layer.
    LayerAdded {
        id: String,
        name: String,
        description: String,
        /// GeoJSON geometry, already serialized.
        geometry_json: String,
    },

    /// An admin replaced a layer's metadata and geometry.
    LayerEdited {
        id: String,
        name: String,
        description: String,
        geometry_json: String,
    },

    /// An admin deleted a polygon layer.
    LayerRemoved { id: String },
}

impl DomainEvent {
    /// Returns the variant tag, used as the subscription key.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MarkerAdded { .. } => EventKind::MarkerAdded,
            Self::MarkerRemoved { .. } => EventKind::MarkerRemoved,
            Self::LayerAdded { .. } => EventKind::LayerAdded,
            Self::LayerEdited { .. } => EventKind::LayerEdited,
            Self::LayerRemoved { .. } => EventKind::LayerRemoved,
        }
    }
}

/// Field-less mirror of [`DomainEvent`]'s variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MarkerAdded,
    MarkerRemoved,
    LayerAdded,
    LayerEdited,
    LayerRemoved,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 5] = [
        Self::MarkerAdded,
        Self::MarkerRemoved,
        Self::LayerAdded,
        Self::LayerEdited,
        Self::LayerRemoved,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MarkerAdded => "MarkerAdded",
            Self::MarkerRemoved => "MarkerRemoved",
            Self::LayerAdded => "LayerAdded",
            Self::LayerEdited => "LayerEdited",
            Self::LayerRemoved => "LayerRemoved",
        };
        f.write_str(name)
    }
}
