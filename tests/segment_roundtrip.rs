use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use slog::{o, Logger};
use std::fs::File;
use tempfile::tempdir;
use windborne_uasdc::{bucketize, enrich_segment, save_segment, Observation, SoundingRow};

fn test_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

fn sample_rows() -> Vec<SoundingRow> {
    vec![
        SoundingRow {
            time: 100.0,
            latitude: Some(54.1),
            longitude: Some(-2.5),
            altitude: Some(12000.0),
            temperature: Some(221.5),
            pressure: Some(19000.0),
            wind_speed: Some(5.0),
            wind_direction: Some(270.0),
            humidity_mixing_ratio: Some(1.0),
        },
        SoundingRow {
            time: 160.0,
            latitude: Some(54.2),
            longitude: Some(-2.6),
            altitude: None,
            temperature: None,
            pressure: Some(18900.0),
            wind_speed: None,
            wind_direction: None,
            humidity_mixing_ratio: None,
        },
    ]
}

#[test]
fn written_segment_preserves_variables_and_attributes() {
    let dir = tempdir().unwrap();
    let path = save_segment(&sample_rows(), "W-1594", 0, dir.path().to_str().unwrap()).unwrap();
    assert!(path.ends_with("WindBorne_W-1594_19700101000000Z.parquet"));

    let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
    let file_metadata = reader.metadata().file_metadata();
    let kv = file_metadata.key_value_metadata().unwrap();
    let get = |key: &str| {
        kv.iter()
            .find(|entry| entry.key == key)
            .and_then(|entry| entry.value.clone())
            .unwrap_or_else(|| panic!("missing metadata key {}", key))
    };

    // Global attributes
    assert_eq!(get("Conventions"), "CF-1.8, WMO-CF-1.0");
    assert_eq!(get("wmo__cf_profile"), "FM 303-2024");
    assert_eq!(get("featureType"), "trajectory");
    assert_eq!(get("platform_name"), "WindBorne Global Sounding Balloon");
    assert_eq!(get("flight_id"), "W-1594");
    assert_eq!(get("site_terrain_elevation_height"), "not applicable");
    assert_eq!(get("processing_level"), "b1");

    // Unit strings per variable
    assert_eq!(get("time:units"), "seconds since 1970-01-01T00:00:00");
    assert_eq!(get("lat:units"), "degrees_north");
    assert_eq!(get("lon:units"), "degrees_east");
    assert_eq!(get("altitude:units"), "meters_above_sea_level");
    assert_eq!(get("air_temperature:units"), "Kelvin");
    assert_eq!(get("wind_speed:units"), "m/s");
    assert_eq!(get("wind_direction:units"), "degrees");
    assert_eq!(get("humidity_mixing_ratio:units"), "kg/kg");
    assert_eq!(get("air_pressure:units"), "Pa");

    // Fill value, long names and the processing-level placeholder
    assert_eq!(get("air_temperature:_FillValue"), "NaN");
    assert_eq!(get("air_pressure:long_name"), "Atmospheric Pressure");
    assert_eq!(get("wind_speed:long_name"), "Wind Speed");
    assert_eq!(get("time:processing_level"), "");

    // Column data round-trips, including nulls for missing values
    let rows: Vec<_> = reader
        .get_row_iter(None)
        .unwrap()
        .map(|row| row.unwrap())
        .collect();
    assert_eq!(rows.len(), 2);

    let first: Vec<(String, Field)> = rows[0]
        .get_column_iter()
        .map(|(name, field)| (name.clone(), field.clone()))
        .collect();
    assert_eq!(first[0], ("obs".to_string(), Field::Long(0)));
    assert_eq!(first[1], ("time".to_string(), Field::Double(100.0)));
    assert_eq!(first[2], ("lat".to_string(), Field::Double(54.1)));
    assert_eq!(first[3], ("lon".to_string(), Field::Double(-2.5)));
    assert_eq!(first[4], ("altitude".to_string(), Field::Double(12000.0)));
    assert_eq!(
        first[5],
        ("air_temperature".to_string(), Field::Double(221.5))
    );
    assert_eq!(first[6], ("air_pressure".to_string(), Field::Double(19000.0)));
    assert_eq!(first[7], ("wind_speed".to_string(), Field::Double(5.0)));
    assert_eq!(
        first[8],
        ("wind_direction".to_string(), Field::Double(270.0))
    );
    assert_eq!(
        first[9],
        ("humidity_mixing_ratio".to_string(), Field::Double(1.0))
    );

    let second: Vec<(String, Field)> = rows[1]
        .get_column_iter()
        .map(|(name, field)| (name.clone(), field.clone()))
        .collect();
    assert_eq!(second[0], ("obs".to_string(), Field::Long(1)));
    assert_eq!(second[1], ("time".to_string(), Field::Double(160.0)));
    assert_eq!(second[4], ("altitude".to_string(), Field::Null));
    assert_eq!(second[5], ("air_temperature".to_string(), Field::Null));
    assert_eq!(second[7], ("wind_speed".to_string(), Field::Null));
    assert_eq!(
        second[9],
        ("humidity_mixing_ratio".to_string(), Field::Null)
    );
}

#[test]
fn rewriting_the_same_segment_is_byte_identical() {
    let first_dir = tempdir().unwrap();
    let second_dir = tempdir().unwrap();

    let first = save_segment(
        &sample_rows(),
        "W-1594",
        0,
        first_dir.path().to_str().unwrap(),
    )
    .unwrap();
    let second = save_segment(
        &sample_rows(),
        "W-1594",
        0,
        second_dir.path().to_str().unwrap(),
    )
    .unwrap();

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn mission_observations_flow_into_one_file_per_bucket() {
    let logger = test_logger();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap();

    // Two observations an hour apart plus one in the next 2-hour bucket
    let observations: Vec<Observation> = [100, 3700, 7300]
        .iter()
        .map(|&timestamp| Observation {
            timestamp,
            mission_name: Some("W-1594".to_string()),
            speed_u: Some(3.0),
            speed_v: Some(4.0),
            ..Default::default()
        })
        .collect();

    let segments = bucketize(observations, 7200, 0, &logger);
    assert_eq!(segments.len(), 2);

    let mut written = Vec::new();
    for segment in segments {
        let rows = enrich_segment(&segment.observations);
        written.push(save_segment(&rows, "W-1594", segment.start, data_dir).unwrap());
    }

    assert!(written[0].ends_with("WindBorne_W-1594_19700101000000Z.parquet"));
    assert!(written[1].ends_with("WindBorne_W-1594_19700101020000Z.parquet"));

    let reader = SerializedFileReader::new(File::open(&written[0]).unwrap()).unwrap();
    assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
    let reader = SerializedFileReader::new(File::open(&written[1]).unwrap()).unwrap();
    assert_eq!(reader.metadata().file_metadata().num_rows(), 1);
}
