//! AOI geometry loading and preparation.
//!
//! The service imposes a vertex ceiling on submitted geometries, so an AOI
//! read from a GeoJSON file is optionally reduced with a single
//! topology-preserving simplification pass before submission.
use std::path::Path;

use geo::{MultiPolygon, SimplifyVwPreserve};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("AOI file contains no polygon geometry")]
    NoPolygon,

    #[error("AOI file must contain exactly one polygon feature, found {0}")]
    MultipleFeatures(usize),

    #[error("AOI file declares CRS '{found}', expected geographic WGS 84")]
    CrsMismatch { found: String },
}

/// Area of interest: a multipolygon in a geographic CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Aoi {
    pub geometry: MultiPolygon<f64>,
    /// CRS name declared by the source file, `WGS 84` when absent.
    pub crs: String,
}

const DEFAULT_CRS: &str = "WGS 84";

fn is_geographic(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    upper.contains("4326") || upper.contains("CRS84") || upper.contains("WGS 84") || upper.contains("WGS84")
}

/// Pull the legacy `crs` member out of a GeoJSON object, if present.
fn declared_crs(foreign: Option<&geojson::JsonObject>) -> Option<String> {
    let crs = foreign?.get("crs")?;
    crs.get("properties")?
        .get("name")?
        .as_str()
        .map(|s| s.to_string())
}

impl Aoi {
    /// Read an AOI from a GeoJSON file. The file must contain exactly one
    /// polygon feature and, if it declares a CRS at all, that CRS must be
    /// geographic WGS 84. A non-geographic CRS is a configuration error and
    /// fails fast, before anything is submitted.
    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self, GeometryError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let aoi = Self::from_geojson_str(&text)?;
        info!(
            "Loaded AOI from {} ({} vertices)",
            path.as_ref().display(),
            vertex_count(&aoi)
        );
        Ok(aoi)
    }

    /// Parse an AOI from GeoJSON text. See [`Aoi::from_geojson_file`].
    pub fn from_geojson_str(text: &str) -> Result<Self, GeometryError> {
        let gj: geojson::GeoJson = text.parse()?;

        let (value, foreign) = match &gj {
            geojson::GeoJson::FeatureCollection(fc) => {
                let geoms: Vec<&geojson::Geometry> = fc
                    .features
                    .iter()
                    .filter_map(|f| f.geometry.as_ref())
                    .collect();
                match geoms.as_slice() {
                    [] => return Err(GeometryError::NoPolygon),
                    [geom] => (geom.value.clone(), fc.foreign_members.as_ref()),
                    many => return Err(GeometryError::MultipleFeatures(many.len())),
                }
            }
            geojson::GeoJson::Feature(feature) => {
                let geom = feature.geometry.as_ref().ok_or(GeometryError::NoPolygon)?;
                (geom.value.clone(), feature.foreign_members.as_ref())
            }
            geojson::GeoJson::Geometry(geom) => {
                (geom.value.clone(), geom.foreign_members.as_ref())
            }
        };

        let crs = match declared_crs(foreign) {
            Some(name) if !is_geographic(&name) => {
                return Err(GeometryError::CrsMismatch { found: name });
            }
            Some(name) => name,
            None => DEFAULT_CRS.to_string(),
        };

        let geometry = match geo::Geometry::<f64>::try_from(value) {
            Ok(geo::Geometry::Polygon(poly)) => MultiPolygon(vec![poly]),
            Ok(geo::Geometry::MultiPolygon(mp)) => mp,
            Ok(_) => return Err(GeometryError::NoPolygon),
            Err(e) => return Err(GeometryError::GeoJson(e)),
        };

        Ok(Aoi { geometry, crs })
    }
}

/// Number of points on the geometry's exterior rings. Interior rings (holes)
/// are not counted; the service cap is defined over exteriors.
pub fn vertex_count(aoi: &Aoi) -> usize {
    aoi.geometry
        .0
        .iter()
        .map(|poly| poly.exterior().0.len())
        .sum()
}

/// Reduce the AOI vertex count below the service ceiling.
///
/// A single topology-preserving simplification pass with `tolerance` is
/// applied when the count exceeds `max_count`; the pass is never iterated,
/// so the result may still exceed the cap and is passed through regardless.
/// The submission stage surfaces any remaining rejection remotely.
pub fn simplify(aoi: Aoi, tolerance: f64, max_count: usize) -> Aoi {
    let before = vertex_count(&aoi);
    info!("Number of vertices of original geometry: {}", before);

    let aoi = if before > max_count {
        Aoi {
            geometry: aoi.geometry.simplify_vw_preserve(&tolerance),
            crs: aoi.crs,
        }
    } else {
        aoi
    };

    info!(
        "Number of vertices after simplification: {}",
        vertex_count(&aoi)
    );
    aoi
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Polygon};

    fn ring_aoi(points: usize) -> Aoi {
        // Closed ring approximating a circle with `points` distinct vertices.
        let mut coords: Vec<Coord<f64>> = (0..points)
            .map(|i| {
                let angle = (i as f64) / (points as f64) * std::f64::consts::TAU;
                Coord {
                    x: angle.cos(),
                    y: angle.sin(),
                }
            })
            .collect();
        coords.push(coords[0]);
        Aoi {
            geometry: MultiPolygon(vec![Polygon::new(LineString(coords), vec![])]),
            crs: DEFAULT_CRS.to_string(),
        }
    }

    #[test]
    fn under_cap_geometry_is_unchanged() {
        let aoi = ring_aoi(100);
        let out = simplify(aoi.clone(), 0.004, 1500);
        assert_eq!(out, aoi);
    }

    #[test]
    fn over_cap_geometry_is_simplified() {
        let aoi = ring_aoi(2000);
        let out = simplify(aoi, 0.01, 1500);
        assert!(vertex_count(&out) < 2001);
    }

    #[test]
    fn simplification_is_not_iterated() {
        // A zero tolerance removes nothing; the single pass must still
        // terminate and pass the oversized geometry through.
        let aoi = ring_aoi(2000);
        let out = simplify(aoi, 0.0, 1500);
        assert!(vertex_count(&out) > 1500);
    }

    #[test]
    fn parses_polygon_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            }]
        }"#;
        let aoi = Aoi::from_geojson_str(text).unwrap();
        assert_eq!(aoi.crs, DEFAULT_CRS);
        assert_eq!(vertex_count(&aoi), 4);
    }

    #[test]
    fn rejects_projected_crs() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:32630" } },
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            }]
        }"#;
        match Aoi::from_geojson_str(text) {
            Err(GeometryError::CrsMismatch { found }) => assert_eq!(found, "EPSG:32630"),
            other => panic!("expected CRS mismatch, got {:?}", other),
        }
    }

    #[test]
    fn accepts_urn_crs84() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            }]
        }"#;
        assert!(Aoi::from_geojson_str(text).is_ok());
    }
}
