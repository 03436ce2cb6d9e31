use std::fmt;

use serde::{Serialize, Serializer};

/// A single board layer. Copper layers occupy ids 0 (`F.Cu`) through 31
/// (`B.Cu`), with `In1.Cu`..`In30.Cu` in between, matching the layer
/// names rule files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Layer(u8);

impl Layer {
    pub const F_CU: Layer = Layer(0);
    pub const B_CU: Layer = Layer(31);
    pub const EDGE_CUTS: Layer = Layer(32);

    /// Inner copper layer `In<n>.Cu`, `n` in 1..=30.
    #[must_use]
    pub fn inner(n: u8) -> Layer {
        assert!((1..=30).contains(&n), "inner layer index out of range");
        Layer(n)
    }

    #[must_use]
    pub fn is_copper(self) -> bool {
        self.0 <= 31
    }

    #[must_use]
    pub fn is_outer(self) -> bool {
        self == Layer::F_CU || self == Layer::B_CU
    }

    #[must_use]
    pub fn is_inner(self) -> bool {
        self.is_copper() && !self.is_outer()
    }

    #[must_use]
    pub fn name(self) -> String {
        match self {
            Layer::F_CU => "F.Cu".to_owned(),
            Layer::B_CU => "B.Cu".to_owned(),
            Layer::EDGE_CUTS => "Edge.Cuts".to_owned(),
            Layer(n) => format!("In{n}.Cu"),
        }
    }

    /// Parse a layer from its canonical name ("F.Cu", "In3.Cu", ...).
    #[must_use]
    pub fn parse(name: &str) -> Option<Layer> {
        match name {
            "F.Cu" => Some(Layer::F_CU),
            "B.Cu" => Some(Layer::B_CU),
            "Edge.Cuts" => Some(Layer::EDGE_CUTS),
            _ => {
                let n: u8 = name.strip_prefix("In")?.strip_suffix(".Cu")?.parse().ok()?;
                if (1..=30).contains(&n) {
                    Some(Layer(n))
                } else {
                    None
                }
            }
        }
    }

    pub(crate) fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// A set of layers as a bitmask over layer ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerSet(u64);

impl LayerSet {
    #[must_use]
    pub const fn empty() -> Self {
        LayerSet(0)
    }

    #[must_use]
    pub fn single(layer: Layer) -> Self {
        LayerSet(1 << layer.index())
    }

    /// The two outer copper layers.
    #[must_use]
    pub fn outer() -> Self {
        LayerSet::single(Layer::F_CU).with(Layer::B_CU)
    }

    /// All inner copper layers.
    #[must_use]
    pub fn inner() -> Self {
        let mut set = LayerSet::empty();
        for n in 1..=30 {
            set = set.with(Layer::inner(n));
        }
        set
    }

    /// A contiguous copper span from `from` through `to` inclusive, the
    /// way a via occupies layers.
    #[must_use]
    pub fn span(from: Layer, to: Layer) -> Self {
        let (lo, hi) = if from.index() <= to.index() {
            (from.index(), to.index())
        } else {
            (to.index(), from.index())
        };
        let mut set = LayerSet::empty();
        for n in lo..=hi {
            set.0 |= 1 << n;
        }
        set
    }

    #[must_use]
    pub fn with(mut self, layer: Layer) -> Self {
        self.0 |= 1 << layer.index();
        self
    }

    #[must_use]
    pub fn contains(self, layer: Layer) -> bool {
        self.0 & (1 << layer.index()) != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn intersects(self, other: LayerSet) -> bool {
        self.0 & other.0 != 0
    }

    /// Iterate the contained copper layers in front-to-back order.
    pub fn iter(self) -> impl Iterator<Item = Layer> {
        (0u8..=31).filter_map(move |n| {
            if self.0 & (1 << n) != 0 {
                Some(Layer(n))
            } else {
                None
            }
        })
    }

    /// Lowest-indexed member, if any.
    #[must_use]
    pub fn first(self) -> Option<Layer> {
        self.iter().next()
    }
}
