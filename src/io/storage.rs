//! Object storage boundary.
//!
//! The job writes its tile outputs into a bucket. The `ObjectStore` trait
//! exposes the two operations the pipeline needs from that store: a
//! recursive listing under a prefix, and a mapping from object key to a
//! GDAL-openable path. `LocalObjectStore` backs tests and local runs;
//! `VsiObjectStore` reaches S3 through GDAL's virtual filesystem, the same
//! way the mosaicker later opens the rasters.
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::params::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Listing root {0} does not exist")]
    MissingRoot(PathBuf),
}

/// One object in the store. Size is reported when the backing store exposes
/// it cheaply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key relative to the store root, `/`-separated.
    pub key: String,
    pub size: Option<u64>,
}

/// Read-only view of the bucket holding job outputs.
pub trait ObjectStore {
    /// List all objects under `prefix`, recursively. Result sets may be
    /// arbitrarily large; implementations fold any backend pagination into
    /// the returned vector.
    fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;

    /// Map an object key to a path GDAL can open directly.
    fn raster_path(&self, key: &str) -> String;
}

/// Filesystem-backed store rooted at a local directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        LocalObjectStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn visit(&self, dir: &Path, out: &mut Vec<StoredObject>) -> Result<(), StorageError> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.visit(&path, out)?;
            } else {
                let rel = path.strip_prefix(&self.root).unwrap_or(&path);
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let size = entry.metadata().ok().map(|m| m.len());
                out.push(StoredObject { key, size });
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let start = self.root.join(prefix.trim_matches('/'));
        if !start.exists() {
            return Err(StorageError::MissingRoot(start));
        }
        // Keys stay root-relative (they keep the prefix), matching what a
        // remote listing under the same prefix would return.
        let mut out = Vec::new();
        self.visit(&start, &mut out)?;
        Ok(out)
    }

    fn raster_path(&self, key: &str) -> String {
        self.root.join(key).to_string_lossy().into_owned()
    }
}

/// Store reached through a GDAL virtual filesystem root, e.g.
/// `/vsis3/<bucket>` for S3. Listing sizes are not reported by the VSI
/// layer.
pub struct VsiObjectStore {
    base: String,
}

impl VsiObjectStore {
    /// Build a store over `/vsis3/<bucket>`, applying the credentials to
    /// GDAL's configuration. This is the single place process-level state is
    /// touched, and it happens explicitly at construction.
    pub fn for_s3(config: &StorageConfig) -> Result<Self, StorageError> {
        gdal::config::set_config_option("AWS_ACCESS_KEY_ID", &config.aws_access_key_id)?;
        gdal::config::set_config_option("AWS_SECRET_ACCESS_KEY", &config.aws_secret_access_key)?;
        gdal::config::set_config_option("AWS_DEFAULT_REGION", &config.aws_region)?;
        Ok(VsiObjectStore {
            base: format!("/vsis3/{}", config.bucket_name),
        })
    }

    /// Build a store over an arbitrary VSI root (e.g. `/vsimem/unit-test`).
    pub fn new<S: Into<String>>(base: S) -> Self {
        VsiObjectStore { base: base.into() }
    }
}

impl ObjectStore for VsiObjectStore {
    fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let anchor = prefix.trim_matches('/');
        let dir = format!("{}/{}", self.base, anchor);
        let entries = gdal::vsi::read_dir(&dir, true)?;
        let mut out = Vec::new();
        for entry in entries {
            let rel = entry.to_string_lossy().replace('\\', "/");
            // Recursive VSI listings include directory entries; those never
            // carry a raster extension and are filtered by classification,
            // but drop the obvious ones here.
            if rel.ends_with('/') {
                continue;
            }
            let key = if anchor.is_empty() {
                rel
            } else {
                format!("{}/{}", anchor, rel)
            };
            out.push(StoredObject { key, size: None });
        }
        Ok(out)
    }

    fn raster_path(&self, key: &str) -> String {
        format!("{}/{}", self.base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_store_lists_recursively_with_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("run/tile_a")).unwrap();
        std::fs::create_dir_all(root.join("run/tile_b")).unwrap();
        std::fs::write(root.join("run/tile_a/B02.tif"), b"aa").unwrap();
        std::fs::write(root.join("run/tile_b/B02.tif"), b"bbbb").unwrap();

        let store = LocalObjectStore::new(root);
        let mut objects = store.list("run").unwrap();
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "run/tile_a/B02.tif");
        assert_eq!(objects[0].size, Some(2));
        assert_eq!(objects[1].key, "run/tile_b/B02.tif");
        assert_eq!(objects[1].size, Some(4));
    }

    #[test]
    fn local_store_missing_prefix_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(matches!(
            store.list("nope"),
            Err(StorageError::MissingRoot(_))
        ));
    }

    #[test]
    fn raster_paths_resolve_under_the_root() {
        let store = LocalObjectStore::new("/data");
        assert_eq!(
            store.raster_path("run/tile_a/B02.tif"),
            "/data/run/tile_a/B02.tif"
        );

        let store = VsiObjectStore::new("/vsis3/imagery");
        assert_eq!(
            store.raster_path("run/tile_a/B02.tif"),
            "/vsis3/imagery/run/tile_a/B02.tif"
        );
    }
}
