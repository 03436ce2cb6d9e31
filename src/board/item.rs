use serde::Serialize;
use thiserror::Error;

use crate::expr::Value;
use crate::geom::Vec2;

use super::layer::{Layer, LayerSet};
use super::Board;

/// Stable, opaque identity of a board item. Identities survive a whole
/// verification run and are what violation records serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub u64);

/// Identity of a net on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetId(pub u32);

/// Centerline geometry of a track.
#[derive(Debug, Clone, Copy)]
pub enum TrackShape {
    Segment { start: Vec2, end: Vec2 },
    Arc { start: Vec2, mid: Vec2, end: Vec2 },
}

/// A copper track segment or arc on a single layer.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: ItemId,
    pub layer: Layer,
    pub net: Option<NetId>,
    pub shape: TrackShape,
    pub width: i64,
}

impl Track {
    /// Reference position used for violation records: segment midpoint,
    /// arc start point.
    #[must_use]
    pub fn reference_point(&self) -> Vec2 {
        match self.shape {
            TrackShape::Segment { start, end } => Vec2::midpoint(start, end),
            TrackShape::Arc { start, .. } => start,
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> (Vec2, Vec2) {
        match self.shape {
            TrackShape::Segment { start, end } | TrackShape::Arc { start, end, .. } => (start, end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViaType {
    Through,
    BlindBuried,
    Micro,
}

/// A drilled via spanning a contiguous range of copper layers.
#[derive(Debug, Clone)]
pub struct Via {
    pub id: ItemId,
    pub net: Option<NetId>,
    pub position: Vec2,
    pub layers: LayerSet,
    pub diameter: i64,
    pub drill: i64,
    pub via_type: ViaType,
}

impl Via {
    /// Copper remaining around the drill: `(diameter - drill) / 2`.
    #[must_use]
    pub fn annular_width(&self) -> i64 {
        (self.diameter - self.drill) / 2
    }
}

/// A footprint pad, approximated as its bounding disc for pair checks.
#[derive(Debug, Clone)]
pub struct Pad {
    pub id: ItemId,
    pub net: Option<NetId>,
    pub position: Vec2,
    pub layers: LayerSet,
    pub size_x: i64,
    pub size_y: i64,
    /// Drill hole dimensions (x, y) for through-hole pads; slots have
    /// differing x/y.
    pub drill: Option<(i64, i64)>,
    pub plated: bool,
}

impl Pad {
    /// Smaller of the two drill dimensions, the value hole-size limits
    /// apply to.
    #[must_use]
    pub fn min_drill(&self) -> Option<i64> {
        self.drill.map(|(x, y)| x.min(y))
    }
}

/// A board item, closed over the kinds the check providers understand.
#[derive(Debug, Clone)]
pub enum Item {
    Track(Track),
    Via(Via),
    Pad(Pad),
}

/// Property names resolvable on items, the stable contract the
/// expression compiler preflights against.
pub const PROPERTY_NAMES: &[&str] = &[
    "Type", "Width", "Diameter", "Drill", "Layer", "NetName", "NetClass",
];

/// Zero/one-argument functions callable on items.
pub const FUNCTION_NAMES: &[&str] = &["isOnLayer", "isPlated", "isMicroVia"];

/// Name-resolution capability the expression compiler preflights
/// identifiers against before any real item is evaluated.
pub trait PropertyCatalog {
    fn has_property(&self, name: &str) -> bool;
    fn has_function(&self, name: &str) -> bool;
}

/// Catalog backed by the built-in property and function inventories.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl PropertyCatalog for BuiltinCatalog {
    fn has_property(&self, name: &str) -> bool {
        PROPERTY_NAMES.contains(&name)
    }

    fn has_function(&self, name: &str) -> bool {
        FUNCTION_NAMES.contains(&name)
    }
}

/// Unknown-name errors from property lookup. "Property exists but has no
/// value on this item kind" is `Ok(None)`, never an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),
}

impl Item {
    #[must_use]
    pub fn id(&self) -> ItemId {
        match self {
            Item::Track(t) => t.id,
            Item::Via(v) => v.id,
            Item::Pad(p) => p.id,
        }
    }

    #[must_use]
    pub fn net(&self) -> Option<NetId> {
        match self {
            Item::Track(t) => t.net,
            Item::Via(v) => v.net,
            Item::Pad(p) => p.net,
        }
    }

    #[must_use]
    pub fn layers(&self) -> LayerSet {
        match self {
            Item::Track(t) => LayerSet::single(t.layer),
            Item::Via(v) => v.layers,
            Item::Pad(p) => p.layers,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Track(t) => match t.shape {
                TrackShape::Segment { .. } => "Track",
                TrackShape::Arc { .. } => "Arc",
            },
            Item::Via(_) => "Via",
            Item::Pad(_) => "Pad",
        }
    }

    /// Resolve a named property against this item.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::UnknownProperty`] for names outside the
    /// documented inventory; a known property that does not apply to this
    /// item kind yields `Ok(None)`.
    pub fn property(&self, board: &Board, name: &str) -> Result<Option<Value>, PropertyError> {
        match name {
            "Type" => Ok(Some(Value::Str(self.type_name().to_owned()))),
            "Width" => Ok(match self {
                Item::Track(t) => Some(Value::Number(t.width as f64)),
                _ => None,
            }),
            "Diameter" => Ok(match self {
                Item::Via(v) => Some(Value::Number(v.diameter as f64)),
                _ => None,
            }),
            "Drill" => Ok(match self {
                Item::Via(v) => Some(Value::Number(v.drill as f64)),
                Item::Pad(p) => p.min_drill().map(|d| Value::Number(d as f64)),
                Item::Track(_) => None,
            }),
            "Layer" => Ok(self.layers().first().map(|l| Value::Str(l.name()))),
            "NetName" => Ok(Some(Value::Str(
                self.net()
                    .map(|n| board.net_name(n).to_owned())
                    .unwrap_or_default(),
            ))),
            "NetClass" => Ok(Some(Value::Str(
                self.net()
                    .map(|n| board.net_class(n).to_owned())
                    .unwrap_or_default(),
            ))),
            other => Err(PropertyError::UnknownProperty(other.to_owned())),
        }
    }

    /// Invoke a named function against this item.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::UnknownFunction`] for names outside the
    /// documented inventory.
    pub fn call(&self, _board: &Board, func: &str, arg: Option<&str>) -> Result<Value, PropertyError> {
        match func {
            "isOnLayer" => {
                let on = arg
                    .and_then(Layer::parse)
                    .is_some_and(|layer| self.layers().contains(layer));
                Ok(Value::from(on))
            }
            "isPlated" => Ok(Value::from(match self {
                Item::Pad(p) => p.plated,
                Item::Via(_) => true,
                Item::Track(_) => false,
            })),
            "isMicroVia" => Ok(Value::from(matches!(
                self,
                Item::Via(v) if v.via_type == ViaType::Micro
            ))),
            other => Err(PropertyError::UnknownFunction(other.to_owned())),
        }
    }
}
