//! Geometry values carried in dataset records.
//!
//! Geometries serialize as GeoJSON geometry objects so snapshots and
//! published subsets can be read by any GIS tooling.

use serde::{Deserialize, Serialize};

/// A single `[x, y]` vertex.
pub type Coord = [f64; 2];

/// GeoJSON-compatible geometry.
///
/// Equality is exact vertex equality: a vertex moved by any amount is a
/// different geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Total number of vertices across all rings and parts.
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Point(_) => 1,
            Self::LineString(line) => line.len(),
            Self::Polygon(rings) => rings.iter().map(Vec::len).sum(),
            Self::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(|rings| rings.iter().map(Vec::len))
                .sum(),
        }
    }

    /// Exact vertex match, including vertex order.
    pub fn same_vertices(&self, other: &Geometry) -> bool {
        self == other
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Point([x, y]) => write!(f, "POINT ({} {})", x, y),
            other => write!(f, "{} ({} vertices)", other.type_name(), other.vertex_count()),
        }
    }
}
