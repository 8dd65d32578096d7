use serde::Deserialize;
use slog::{warn, Logger};
use std::collections::BTreeMap;

/// One super-observation as returned by the api. Sensor field presence is
/// not guaranteed per record; absent values stay `None` and are never
/// defaulted to zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observation {
    pub timestamp: i64,
    #[serde(default)]
    pub mission_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub specific_humidity: Option<f64>,
    #[serde(default)]
    pub speed_u: Option<f64>,
    #[serde(default)]
    pub speed_v: Option<f64>,
}

/// Collects observations page by page, grouped by mission. Within a mission
/// the insertion order is page-arrival order; sorting by timestamp belongs
/// to the bucketizer.
pub struct ObservationAccumulator {
    logger: Logger,
    by_mission: BTreeMap<String, Vec<Observation>>,
    total: usize,
}

impl ObservationAccumulator {
    pub fn new(logger: Logger) -> Self {
        ObservationAccumulator {
            logger,
            by_mission: BTreeMap::new(),
            total: 0,
        }
    }

    /// Files every observation on a page under its mission. An observation
    /// without a mission name cannot be grouped and is dropped with a
    /// diagnostic.
    pub fn add_page(&mut self, observations: Vec<Observation>) {
        for observation in observations {
            let Some(mission_name) = observation.mission_name.clone() else {
                warn!(
                    self.logger,
                    "got an observation without a mission name, dropping it"
                );
                continue;
            };
            self.by_mission
                .entry(mission_name)
                .or_default()
                .push(observation);
            self.total += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn finalize(self) -> BTreeMap<String, Vec<Observation>> {
        self.by_mission
    }
}
