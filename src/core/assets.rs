//! Classification of job outputs into per-band asset groups.
//!
//! The service resolves its output template to keys of the form
//! `<prefix>/<tileName>/<outputId>.<format>`. An object is a band file iff
//! its key carries the raster extension and contains a recognized band
//! token as a substring.
use std::collections::BTreeMap;

use tracing::debug;

use crate::io::storage::StoredObject;

/// Extension the service uses for raster outputs.
pub const RASTER_EXT: &str = ".tif";

/// One classified raster object produced by the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandAsset {
    /// Object key relative to the store root.
    pub key: String,
    pub size: Option<u64>,
    /// Band token the key matched.
    pub band: String,
    /// Tile name, taken from the parent path segment.
    pub tile: String,
}

fn tile_name(key: &str) -> String {
    let mut parts = key.rsplit('/');
    parts.next();
    parts.next().unwrap_or("").to_string()
}

/// Group raster objects by band token.
///
/// Classification is first-match against `band_tokens` in the given order:
/// a key containing more than one token (or a token that is a substring of
/// another band's file name) resolves to the first match. This mirrors the
/// band-naming convention of the service outputs and is a known limitation
/// for token sets where one token is a substring of another; order the
/// longer token first in that case.
///
/// Within each group, assets keep lexicographic key order. The mosaicker
/// relies on that for deterministic, reproducible input ordering.
pub fn group_band_assets(
    objects: &[StoredObject],
    band_tokens: &[String],
) -> BTreeMap<String, Vec<BandAsset>> {
    let mut band_objects: Vec<&StoredObject> = objects
        .iter()
        .filter(|obj| {
            obj.key.ends_with(RASTER_EXT) && band_tokens.iter().any(|b| obj.key.contains(b.as_str()))
        })
        .collect();
    band_objects.sort_by(|a, b| a.key.cmp(&b.key));

    let mut groups: BTreeMap<String, Vec<BandAsset>> = BTreeMap::new();
    for obj in band_objects {
        for band in band_tokens {
            if obj.key.contains(band.as_str()) {
                groups.entry(band.clone()).or_default().push(BandAsset {
                    key: obj.key.clone(),
                    size: obj.size,
                    band: band.clone(),
                    tile: tile_name(&obj.key),
                });
                break;
            }
        }
    }

    for (band, assets) in &groups {
        debug!("Band {}: {} asset(s)", band, assets.len());
    }
    groups
}
