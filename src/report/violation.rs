use serde::Serialize;

use crate::board::{ItemId, Layer};
use crate::geom::Vec2;
use crate::rules::Severity;

/// Closed enumeration of reportable defect kinds. The `key` spellings
/// are a stable serialization contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TrackWidth,
    Clearance,
    ViaDiameter,
    AnnularWidth,
    DrillOutOfRange,
    MicroviaDrillOutOfRange,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::TrackWidth,
        ErrorKind::Clearance,
        ErrorKind::ViaDiameter,
        ErrorKind::AnnularWidth,
        ErrorKind::DrillOutOfRange,
        ErrorKind::MicroviaDrillOutOfRange,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            ErrorKind::TrackWidth => "track_width",
            ErrorKind::Clearance => "clearance",
            ErrorKind::ViaDiameter => "via_diameter",
            ErrorKind::AnnularWidth => "annular_width",
            ErrorKind::DrillOutOfRange => "drill_out_of_range",
            ErrorKind::MicroviaDrillOutOfRange => "microvia_drill_out_of_range",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::TrackWidth => "Track width out of range",
            ErrorKind::Clearance => "Clearance violation",
            ErrorKind::ViaDiameter => "Via diameter out of range",
            ErrorKind::AnnularWidth => "Annular width below minimum",
            ErrorKind::DrillOutOfRange => "Hole size out of range",
            ErrorKind::MicroviaDrillOutOfRange => "Micro via hole size out of range",
        }
    }

    /// Dense index, for per-kind counters.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            ErrorKind::TrackWidth => 0,
            ErrorKind::Clearance => 1,
            ErrorKind::ViaDiameter => 2,
            ErrorKind::AnnularWidth => 3,
            ErrorKind::DrillOutOfRange => 4,
            ErrorKind::MicroviaDrillOutOfRange => 5,
        }
    }
}

/// One recorded defect. Refers to items by id only, so a violation
/// stays meaningful across board edits that do not touch its items.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub kind: ErrorKind,
    pub severity: Severity,
    /// One id for single-item checks, two for pair checks.
    pub items: Vec<ItemId>,
    /// Marker position, internal units.
    pub position: Vec2,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<Layer>,
    /// Human-readable detail including the constraint source, the bound
    /// and the actual value.
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Violation {
    #[must_use]
    pub fn new(kind: ErrorKind, severity: Severity, position: Vec2, detail: String) -> Self {
        Self {
            kind,
            severity,
            items: Vec::new(),
            position,
            layer: None,
            detail,
            rule_name: None,
            excluded: false,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_item(mut self, id: ItemId) -> Self {
        self.items.push(id);
        self
    }

    #[must_use]
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, name: Option<&str>) -> Self {
        self.rule_name = name.map(str::to_owned);
        self
    }

    /// Stable identity for exclusion matching. Item ids are sorted so
    /// the key is independent of pair discovery order, and no memory
    /// addresses or run-varying state participate.
    #[must_use]
    pub fn serialize_key(&self) -> String {
        let mut ids: Vec<u64> = self.items.iter().map(|id| id.0).collect();
        ids.sort_unstable();
        let ids = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}|{}|{}|{}",
            self.kind.key(),
            self.position.x,
            self.position.y,
            ids
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(items: &[u64]) -> Violation {
        let mut v = Violation::new(
            ErrorKind::Clearance,
            Severity::Error,
            Vec2 { x: 1_000, y: 2_000 },
            "Clearance violation (rule 'hv'; min 0.2 mm; actual 0.15 mm)".into(),
        );
        for &id in items {
            v = v.with_item(ItemId(id));
        }
        v
    }

    #[test]
    fn key_is_order_independent() {
        assert_eq!(sample(&[7, 3]).serialize_key(), sample(&[3, 7]).serialize_key());
    }

    #[test]
    fn key_shape_is_stable() {
        assert_eq!(
            sample(&[7, 3]).serialize_key(),
            "clearance|1000|2000|3,7"
        );
    }

    #[test]
    fn key_distinguishes_kind_and_position() {
        let a = sample(&[3, 7]);
        let mut b = sample(&[3, 7]);
        b.kind = ErrorKind::TrackWidth;
        assert_ne!(a.serialize_key(), b.serialize_key());
        let mut c = sample(&[3, 7]);
        c.position.x += 1;
        assert_ne!(a.serialize_key(), c.serialize_key());
    }

    #[test]
    fn kind_indices_are_dense_and_unique() {
        let mut seen = [false; ErrorKind::COUNT];
        for kind in ErrorKind::ALL {
            assert!(!seen[kind.index()]);
            seen[kind.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn serializes_to_json_with_stable_fields() {
        let v = sample(&[3]).with_layer(Layer::F_CU).with_rule(Some("hv"));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "clearance");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["layer"], "F.Cu");
        assert_eq!(json["rule_name"], "hv");
        assert_eq!(json["excluded"], false);
    }
}
