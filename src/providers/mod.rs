//! Built-in check providers.

mod annular_width;
mod clearance;
mod hole_size;
mod track_width;
mod via_diameter;

pub use annular_width::AnnularWidthProvider;
pub use clearance::ClearanceProvider;
pub use hole_size::HoleSizeProvider;
pub use track_width::TrackWidthProvider;
pub use via_diameter::ViaDiameterProvider;
