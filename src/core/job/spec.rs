//! Batch job specification: evalscript rendering, output path template, and
//! the request body handed to the processing service.
use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::core::geometry::Aoi;
use crate::core::params::{AcquisitionConfig, TilingGridConfig};
use crate::error::Result;
use crate::types::MosaickingOrder;

/// Immutable specification of one batch job. Created once per run from the
/// acquisition config; the time interval is taken as given (a reversed
/// interval is a caller error, not validated here).
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub evalscript: String,
    pub data_collection: String,
    pub time_interval: (NaiveDate, NaiveDate),
    pub max_cloud_cover: f64,
    pub mosaicking_order: MosaickingOrder,
    pub grid: TilingGridConfig,
    /// Template resolved by the service per tile, of the form
    /// `s3://<bucket>/<prefix>/<tileName>/<outputId>.<format>`.
    pub tile_path_template: String,
    /// Bands to mosaic and stack, in output order.
    pub bands: Vec<String>,
    /// Outputs requested but not stacked (masks, cloud probabilities).
    pub auxiliary_outputs: Vec<String>,
    pub description: String,
}

impl JobSpec {
    /// Build a specification from the acquisition config. The evalscript is
    /// loaded verbatim from `evalscript_path` when configured, otherwise a
    /// per-band pass-through script is rendered from the band lists.
    pub fn from_config(config: &AcquisitionConfig) -> Result<Self> {
        let evalscript = match &config.evalscript_path {
            Some(path) => std::fs::read_to_string(path)?,
            None => render_evalscript(&config.bands, &config.auxiliary_outputs),
        };

        Ok(JobSpec {
            evalscript,
            data_collection: config.data_collection.clone(),
            time_interval: config.time_interval,
            max_cloud_cover: config.max_cloud_cover,
            mosaicking_order: config.mosaicking_order,
            grid: config.grid,
            tile_path_template: tile_path_template(
                &config.storage.bucket_name,
                &config.tiles_path,
            ),
            bands: config.bands.clone(),
            auxiliary_outputs: config.auxiliary_outputs.clone(),
            description: config.description.clone(),
        })
    }

    /// All output identifiers the service must produce, stacked bands first.
    pub fn output_ids(&self) -> impl Iterator<Item = &String> {
        self.bands.iter().chain(self.auxiliary_outputs.iter())
    }

    /// JSON request body for job creation.
    pub fn to_request_body(&self, aoi: &Aoi) -> Value {
        let geometry = geojson::Geometry::new(geojson::Value::from(&aoi.geometry));
        let responses: Vec<Value> = self
            .output_ids()
            .map(|id| {
                json!({
                    "identifier": id,
                    "format": { "type": "image/tiff" }
                })
            })
            .collect();

        json!({
            "processRequest": {
                "input": {
                    "bounds": {
                        "geometry": geometry,
                        "properties": {
                            "crs": "http://www.opengis.net/def/crs/OGC/1.3/CRS84"
                        }
                    },
                    "data": [{
                        "type": self.data_collection,
                        "dataFilter": {
                            "timeRange": {
                                "from": format!("{}T00:00:00Z", self.time_interval.0),
                                "to": format!("{}T23:59:59Z", self.time_interval.1)
                            },
                            "maxCloudCoverage": self.max_cloud_cover * 100.0,
                            "mosaickingOrder": self.mosaicking_order.as_str()
                        }
                    }]
                },
                "output": { "responses": responses },
                "evalscript": self.evalscript
            },
            "tilingGrid": {
                "id": self.grid.id,
                "resolution": self.grid.resolution,
                "bufferX": self.grid.buffer[0],
                "bufferY": self.grid.buffer[1]
            },
            "output": {
                "defaultTilePath": self.tile_path_template,
                "overwrite": true,
                "skipExisting": false
            },
            "description": self.description
        })
    }
}

/// Output path template resolved by the service for every produced tile.
pub fn tile_path_template(bucket: &str, tiles_path: &str) -> String {
    format!(
        "s3://{}/{}/<tileName>/<outputId>.<format>",
        bucket,
        tiles_path.trim_matches('/')
    )
}

/// Render a pass-through evalscript requesting one single-band output per
/// band. Stacked bands are emitted as UINT16 raw digital numbers, auxiliary
/// outputs (masks, probabilities) as UINT8.
pub fn render_evalscript(bands: &[String], auxiliary: &[String]) -> String {
    let all: Vec<String> = bands
        .iter()
        .chain(auxiliary.iter())
        .map(|b| format!("\"{}\"", b))
        .collect();

    let mut outputs = Vec::new();
    for band in bands {
        outputs.push(format!(
            "      {{id: \"{}\", bands: 1, sampleType: \"UINT16\"}}",
            band
        ));
    }
    for band in auxiliary {
        outputs.push(format!(
            "      {{id: \"{}\", bands: 1, sampleType: \"UINT8\"}}",
            band
        ));
    }

    let returns: Vec<String> = bands
        .iter()
        .chain(auxiliary.iter())
        .map(|b| format!("    {}: [sample.{}]", b, b))
        .collect();

    format!(
        r#"//VERSION=3
function setup() {{
  return {{
    input: [{{
      bands: [{inputs}],
      units: "DN"
    }}],
    output: [
{outputs}
    ]
  }};
}}

function evaluatePixel(sample) {{
  return {{
{returns}
  }};
}}
"#,
        inputs = all.join(", "),
        outputs = outputs.join(",\n"),
        returns = returns.join(",\n"),
    )
}
