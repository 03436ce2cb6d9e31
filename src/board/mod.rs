//! Read-only board view consumed by the rule engine and check providers.
//!
//! The engine never mutates a board during a run; items are referenced by
//! stable [`ItemId`] identities and exposed through read-only geometry and
//! property accessors.

mod item;
mod layer;

pub use item::{
    BuiltinCatalog, Item, ItemId, NetId, Pad, PropertyCatalog, PropertyError, Track, TrackShape,
    Via, ViaType, FUNCTION_NAMES, PROPERTY_NAMES,
};
pub use layer::{Layer, LayerSet};

use crate::geom::Vec2;

/// Board-wide limits used as implicit constraint defaults when no rule
/// provides a value for a constraint kind. All values are internal units;
/// `None` means "no board-wide limit".
#[derive(Debug, Clone, Default)]
pub struct DesignSettings {
    pub min_track_width: Option<i64>,
    pub min_clearance: Option<i64>,
    pub min_annular_width: Option<i64>,
    pub min_via_diameter: Option<i64>,
    pub min_through_hole: Option<i64>,
    pub min_microvia_hole: Option<i64>,
}

struct Net {
    name: String,
    class: String,
}

/// In-memory board model: items, nets, and design settings.
pub struct Board {
    items: Vec<Item>,
    nets: Vec<Net>,
    settings: DesignSettings,
    copper_layers: u8,
    next_id: u64,
}

impl Board {
    /// Create an empty board with the given copper layer count. Counts
    /// above the 32 layers the layer model can address clamp to 32.
    #[must_use]
    pub fn new(copper_layers: u8) -> Self {
        Self {
            items: Vec::new(),
            nets: Vec::new(),
            settings: DesignSettings::default(),
            copper_layers: copper_layers.min(32),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn copper_layers(&self) -> u8 {
        self.copper_layers
    }

    /// Every copper layer present on this board.
    #[must_use]
    pub fn copper_layer_set(&self) -> LayerSet {
        match self.copper_layers {
            0 => LayerSet::empty(),
            1 => LayerSet::single(Layer::F_CU),
            n => {
                let mut set = LayerSet::outer();
                for i in 1..=(n - 2) {
                    set = set.with(Layer::inner(i));
                }
                set
            }
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DesignSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: DesignSettings) {
        self.settings = settings;
    }

    pub fn add_net(&mut self, name: &str, class: &str) -> NetId {
        self.nets.push(Net {
            name: name.to_owned(),
            class: class.to_owned(),
        });
        NetId(u32::try_from(self.nets.len() - 1).expect("net count fits u32"))
    }

    #[must_use]
    pub fn net_name(&self, net: NetId) -> &str {
        self.nets
            .get(net.0 as usize)
            .map_or("", |n| n.name.as_str())
    }

    #[must_use]
    pub fn net_class(&self, net: NetId) -> &str {
        self.nets
            .get(net.0 as usize)
            .map_or("", |n| n.class.as_str())
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_item(&mut self, mut item: Item) -> ItemId {
        let id = self.allocate_id();
        match &mut item {
            Item::Track(t) => t.id = id,
            Item::Via(v) => v.id = id,
            Item::Pad(p) => p.id = id,
        }
        self.items.push(item);
        id
    }

    /// Add a straight track segment; convenience wrapper over [`add_item`](Self::add_item).
    pub fn add_segment(
        &mut self,
        layer: Layer,
        start: Vec2,
        end: Vec2,
        width: i64,
        net: Option<NetId>,
    ) -> ItemId {
        self.add_item(Item::Track(Track {
            id: ItemId(0),
            layer,
            net,
            shape: TrackShape::Segment { start, end },
            width,
        }))
    }

    pub fn add_arc(
        &mut self,
        layer: Layer,
        start: Vec2,
        mid: Vec2,
        end: Vec2,
        width: i64,
        net: Option<NetId>,
    ) -> ItemId {
        self.add_item(Item::Track(Track {
            id: ItemId(0),
            layer,
            net,
            shape: TrackShape::Arc { start, mid, end },
            width,
        }))
    }

    /// Add a through via spanning all copper layers.
    pub fn add_via(
        &mut self,
        position: Vec2,
        diameter: i64,
        drill: i64,
        net: Option<NetId>,
    ) -> ItemId {
        self.add_item(Item::Via(Via {
            id: ItemId(0),
            net,
            position,
            layers: LayerSet::span(Layer::F_CU, Layer::B_CU),
            diameter,
            drill,
            via_type: ViaType::Through,
        }))
    }

    pub fn add_micro_via(
        &mut self,
        position: Vec2,
        layers: LayerSet,
        diameter: i64,
        drill: i64,
        net: Option<NetId>,
    ) -> ItemId {
        self.add_item(Item::Via(Via {
            id: ItemId(0),
            net,
            position,
            layers,
            diameter,
            drill,
            via_type: ViaType::Micro,
        }))
    }

    pub fn add_pad(&mut self, pad: Pad) -> ItemId {
        self.add_item(Item::Pad(pad))
    }

    /// Iterate every item on the board.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.items.iter().filter_map(|i| match i {
            Item::Track(t) => Some(t),
            _ => None,
        })
    }

    pub fn vias(&self) -> impl Iterator<Item = &Via> {
        self.items.iter().filter_map(|i| match i {
            Item::Via(v) => Some(v),
            _ => None,
        })
    }

    pub fn pads(&self) -> impl Iterator<Item = &Pad> {
        self.items.iter().filter_map(|i| match i {
            Item::Pad(p) => Some(p),
            _ => None,
        })
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl PropertyCatalog for Board {
    fn has_property(&self, name: &str) -> bool {
        PROPERTY_NAMES.contains(&name)
    }

    fn has_function(&self, name: &str) -> bool {
        FUNCTION_NAMES.contains(&name)
    }
}
