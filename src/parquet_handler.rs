use anyhow::{anyhow, Error};
use parquet::basic::{Repetition, Type as PhysicalType};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::format::KeyValue;
use parquet::record::RecordWriter;
use parquet::schema::types::Type;
use parquet_derive::ParquetRecordWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::SoundingRow;

/// Per-variable attributes required by the UASDC exchange convention,
/// consulted once at write time. Every variable additionally carries a NaN
/// `_FillValue` and an empty `processing_level`.
pub struct VariableAttrs {
    pub name: &'static str,
    pub units: &'static str,
    pub long_name: &'static str,
}

pub const VARIABLE_ATTRIBUTES: &[VariableAttrs] = &[
    VariableAttrs {
        name: "time",
        units: "seconds since 1970-01-01T00:00:00",
        long_name: "Time",
    },
    VariableAttrs {
        name: "lat",
        units: "degrees_north",
        long_name: "Latitude",
    },
    VariableAttrs {
        name: "lon",
        units: "degrees_east",
        long_name: "Longitude",
    },
    VariableAttrs {
        name: "altitude",
        units: "meters_above_sea_level",
        long_name: "Altitude",
    },
    VariableAttrs {
        name: "air_temperature",
        units: "Kelvin",
        long_name: "Air Temperature",
    },
    VariableAttrs {
        name: "wind_speed",
        units: "m/s",
        long_name: "Wind Speed",
    },
    VariableAttrs {
        name: "wind_direction",
        units: "degrees",
        long_name: "Wind Direction",
    },
    VariableAttrs {
        name: "humidity_mixing_ratio",
        units: "kg/kg",
        long_name: "Humidity Mixing Ratio",
    },
    VariableAttrs {
        name: "air_pressure",
        units: "Pa",
        long_name: "Atmospheric Pressure",
    },
];

/// One output row under the convention's variable names. `obs` is the row
/// index within the segment.
#[derive(Debug, ParquetRecordWriter)]
pub struct SoundingRecord {
    pub obs: i64,
    pub time: f64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub air_temperature: Option<f64>,
    pub air_pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub humidity_mixing_ratio: Option<f64>,
}

impl SoundingRecord {
    fn from_row(index: usize, row: &SoundingRow) -> Self {
        SoundingRecord {
            obs: index as i64,
            time: row.time,
            lat: row.latitude,
            lon: row.longitude,
            altitude: row.altitude,
            air_temperature: row.temperature,
            air_pressure: row.pressure,
            wind_speed: row.wind_speed,
            wind_direction: row.wind_direction,
            humidity_mixing_ratio: row.humidity_mixing_ratio,
        }
    }
}

pub fn create_sounding_schema() -> Type {
    let obs = Type::primitive_type_builder("obs", PhysicalType::INT64)
        .with_repetition(Repetition::REQUIRED)
        .build()
        .unwrap();

    let time = Type::primitive_type_builder("time", PhysicalType::DOUBLE)
        .with_repetition(Repetition::REQUIRED)
        .build()
        .unwrap();

    let lat = Type::primitive_type_builder("lat", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let lon = Type::primitive_type_builder("lon", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let altitude = Type::primitive_type_builder("altitude", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let air_temperature = Type::primitive_type_builder("air_temperature", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let air_pressure = Type::primitive_type_builder("air_pressure", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let wind_speed = Type::primitive_type_builder("wind_speed", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let wind_direction = Type::primitive_type_builder("wind_direction", PhysicalType::DOUBLE)
        .with_repetition(Repetition::OPTIONAL)
        .build()
        .unwrap();

    let humidity_mixing_ratio =
        Type::primitive_type_builder("humidity_mixing_ratio", PhysicalType::DOUBLE)
            .with_repetition(Repetition::OPTIONAL)
            .build()
            .unwrap();

    Type::group_type_builder("sounding")
        .with_fields(vec![
            Arc::new(obs),
            Arc::new(time),
            Arc::new(lat),
            Arc::new(lon),
            Arc::new(altitude),
            Arc::new(air_temperature),
            Arc::new(air_pressure),
            Arc::new(wind_speed),
            Arc::new(wind_direction),
            Arc::new(humidity_mixing_ratio),
        ])
        .build()
        .unwrap()
}

fn attribute(key: String, value: &str) -> KeyValue {
    KeyValue {
        key,
        value: Some(value.to_string()),
    }
}

/// The full attribute set for one segment file: per-variable attributes
/// under `<variable>:<attribute>` keys, global attributes under their bare
/// names.
fn segment_metadata(mission_name: &str) -> Vec<KeyValue> {
    let mut metadata = Vec::new();
    for var in VARIABLE_ATTRIBUTES {
        metadata.push(attribute(format!("{}:units", var.name), var.units));
        metadata.push(attribute(format!("{}:long_name", var.name), var.long_name));
        metadata.push(attribute(format!("{}:_FillValue", var.name), "NaN"));
        metadata.push(attribute(format!("{}:processing_level", var.name), ""));
    }

    // Global attributes synonymous across all UASDC providers
    metadata.push(attribute("Conventions".to_string(), "CF-1.8, WMO-CF-1.0"));
    metadata.push(attribute("wmo__cf_profile".to_string(), "FM 303-2024"));
    metadata.push(attribute("featureType".to_string(), "trajectory"));

    // Global attributes unique to the provider
    metadata.push(attribute(
        "platform_name".to_string(),
        "WindBorne Global Sounding Balloon",
    ));
    metadata.push(attribute("flight_id".to_string(), mission_name));
    metadata.push(attribute(
        "site_terrain_elevation_height".to_string(),
        "not applicable",
    ));
    metadata.push(attribute("processing_level".to_string(), "b1"));
    metadata
}

/// Output filename for one (mission, bucket) pair: a 4-character code cut
/// from the mission name plus the bucket start in `YYYYMMDDHHMMSS` UTC.
pub fn output_filename(mission_name: &str, bucket_start: i64) -> Result<String, Error> {
    let code: String = mission_name.chars().skip(2).take(4).collect();
    let stamp = OffsetDateTime::from_unix_timestamp(bucket_start)
        .map_err(|e| anyhow!("bucket start out of range: {}", e))?
        .format(format_description!(
            "[year][month][day][hour][minute][second]"
        ))
        .map_err(|e| anyhow!("error formatting bucket start: {}", e))?;
    Ok(format!("WindBorne_W-{}_{}Z.parquet", code, stamp))
}

/// Writes one enriched segment as a single row group, with the convention's
/// attributes carried as file key/value metadata. Returns the path written.
pub fn save_segment(
    rows: &[SoundingRow],
    mission_name: &str,
    bucket_start: i64,
    data_dir: &str,
) -> Result<String, Error> {
    let filename = output_filename(mission_name, bucket_start)?;
    let output_path = Path::new(data_dir).join(&filename);

    let records: Vec<SoundingRecord> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| SoundingRecord::from_row(index, row))
        .collect();

    let file = File::create(&output_path)
        .map_err(|e| anyhow!("failed to create segment file: {}", e))?;
    let props = WriterProperties::builder()
        .set_key_value_metadata(Some(segment_metadata(mission_name)))
        .build();
    let mut writer = SerializedFileWriter::new(
        file,
        Arc::new(create_sounding_schema()),
        Arc::new(props),
    )
    .map_err(|e| anyhow!("failed to create parquet writer: {}", e))?;

    let mut row_group = writer
        .next_row_group()
        .map_err(|e| anyhow!("failed to create row group: {}", e))?;
    records
        .as_slice()
        .write_to_row_group(&mut row_group)
        .map_err(|e| anyhow!("failed to write segment rows: {}", e))?;
    row_group
        .close()
        .map_err(|e| anyhow!("failed to close row group: {}", e))?;
    writer
        .close()
        .map_err(|e| anyhow!("failed to close parquet writer: {}", e))?;

    Ok(output_path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_embeds_mission_code_and_bucket_start() {
        // Characters 3-6 of the mission name, bucket start in UTC
        assert_eq!(
            output_filename("W-1594", 1714338000).unwrap(),
            "WindBorne_W-1594_20240428210000Z.parquet"
        );
        assert_eq!(
            output_filename("W-1594", 0).unwrap(),
            "WindBorne_W-1594_19700101000000Z.parquet"
        );
    }

    #[test]
    fn every_output_variable_has_attributes() {
        let names: Vec<&str> = VARIABLE_ATTRIBUTES.iter().map(|v| v.name).collect();
        assert_eq!(
            names,
            vec![
                "time",
                "lat",
                "lon",
                "altitude",
                "air_temperature",
                "wind_speed",
                "wind_direction",
                "humidity_mixing_ratio",
                "air_pressure"
            ]
        );
    }

    #[test]
    fn metadata_includes_global_and_per_variable_attributes() {
        let metadata = segment_metadata("W-1594");
        let get = |key: &str| {
            metadata
                .iter()
                .find(|kv| kv.key == key)
                .and_then(|kv| kv.value.clone())
        };
        assert_eq!(get("flight_id").unwrap(), "W-1594");
        assert_eq!(get("featureType").unwrap(), "trajectory");
        assert_eq!(get("air_pressure:units").unwrap(), "Pa");
        assert_eq!(get("altitude:_FillValue").unwrap(), "NaN");
        assert_eq!(get("time:processing_level").unwrap(), "");
    }
}
