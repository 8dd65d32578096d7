use crate::Observation;

/// Upstream reports specific humidity in mg/kg.
const MG_PER_KG: f64 = 1_000_000.0;

/// One enriched segment row: the fields that survive into the output file,
/// with the derived quantities computed and the intermediate-only fields
/// (wind components, specific humidity, relative humidity, raw timestamp,
/// mission name) already dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundingRow {
    /// Observation timestamp as a float coordinate, seconds since epoch.
    pub time: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub humidity_mixing_ratio: Option<f64>,
}

/// Computes the derived quantities for one segment. Element-wise and pure:
/// rows are never reordered or dropped, and a missing input to any formula
/// makes that row's derived value missing rather than zero.
pub fn enrich_segment(observations: &[Observation]) -> Vec<SoundingRow> {
    observations.iter().map(enrich).collect()
}

fn enrich(observation: &Observation) -> SoundingRow {
    let wind_speed = match (observation.speed_u, observation.speed_v) {
        (Some(u), Some(v)) => Some((u * u + v * v).sqrt()),
        _ => None,
    };
    // Meteorological convention: the direction the wind is coming from,
    // degrees in [0, 360).
    let wind_direction = match (observation.speed_u, observation.speed_v) {
        (Some(u), Some(v)) => Some((180.0 + u.atan2(v).to_degrees()).rem_euclid(360.0)),
        _ => None,
    };
    let humidity_mixing_ratio = observation.specific_humidity.map(|q| {
        let q_frac = q / MG_PER_KG;
        q_frac / (1.0 - q_frac)
    });

    SoundingRow {
        time: observation.timestamp as f64,
        latitude: observation.latitude,
        longitude: observation.longitude,
        altitude: observation.altitude,
        temperature: observation.temperature,
        pressure: observation.pressure,
        wind_speed,
        wind_direction,
        humidity_mixing_ratio,
    }
}
