// Sensor domain model and the static sensor lookup table
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensor {
    Temperature,
    Vibration,
    Rpm,
    WaterLevel,
}

/// Static description of one simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSpec {
    pub sensor: Sensor,
    pub display_name: &'static str,
    /// Key used in the published JSON payload. Must match the pipeline schema.
    pub field_key: &'static str,
    pub topic_suffix: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub step_decimals: u32,
    pub unit: &'static str,
    pub display_precision: u32,
    pub initial: f64,
    pub baseline: f64,
}

// Indexed by `Sensor as usize`.
pub static SENSOR_TABLE: [SensorSpec; 4] = [
    SensorSpec {
        sensor: Sensor::Temperature,
        display_name: "Temperature",
        field_key: "temperature",
        topic_suffix: "/temp",
        min: 20.0,
        max: 90.0,
        step: 1.0,
        step_decimals: 0,
        unit: "°C",
        display_precision: 0,
        initial: 45.0,
        baseline: 0.0,
    },
    SensorSpec {
        sensor: Sensor::Vibration,
        display_name: "Vibration",
        field_key: "vibration",
        topic_suffix: "/vibration",
        min: 0.0,
        max: 20.0,
        step: 0.1,
        step_decimals: 1,
        unit: "mm/s",
        display_precision: 2,
        initial: 2.5,
        baseline: 0.0,
    },
    SensorSpec {
        sensor: Sensor::Rpm,
        display_name: "RPM Sensor",
        field_key: "rpm",
        topic_suffix: "/rpm",
        min: 0.0,
        max: 4000.0,
        step: 10.0,
        step_decimals: 0,
        unit: "RPM",
        display_precision: 0,
        initial: 1500.0,
        baseline: 0.0,
    },
    SensorSpec {
        sensor: Sensor::WaterLevel,
        display_name: "Water Level",
        field_key: "level",
        topic_suffix: "/level",
        min: 0.0,
        max: 5.0,
        step: 0.1,
        step_decimals: 1,
        unit: "m",
        display_precision: 0,
        initial: 2.5,
        baseline: 0.0,
    },
];

impl Sensor {
    pub const ALL: [Sensor; 4] = [
        Sensor::Temperature,
        Sensor::Vibration,
        Sensor::Rpm,
        Sensor::WaterLevel,
    ];

    pub fn spec(self) -> &'static SensorSpec {
        &SENSOR_TABLE[self as usize]
    }

    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    /// Look up a sensor by display name ("RPM Sensor") or field key ("rpm").
    pub fn from_name(name: &str) -> Option<Sensor> {
        let name = name.trim();
        SENSOR_TABLE
            .iter()
            .find(|s| {
                s.display_name.eq_ignore_ascii_case(name) || s.field_key.eq_ignore_ascii_case(name)
            })
            .map(|s| s.sensor)
    }

    /// Snap a raw reading onto the step grid and clamp it into range.
    pub fn normalize(self, raw: f64) -> f64 {
        let spec = self.spec();
        let steps = ((raw - spec.min) / spec.step).round();
        let scale = 10f64.powi(spec.step_decimals as i32);
        let snapped = ((spec.min + steps * spec.step) * scale).round() / scale;
        snapped.clamp(spec.min, spec.max)
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for Sensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_sensor() {
        for sensor in Sensor::ALL {
            assert_eq!(sensor.spec().sensor, sensor);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Sensor::from_name("RPM Sensor"), Some(Sensor::Rpm));
        assert_eq!(Sensor::from_name("rpm"), Some(Sensor::Rpm));
        assert_eq!(Sensor::from_name("water level"), Some(Sensor::WaterLevel));
        assert_eq!(Sensor::from_name("level"), Some(Sensor::WaterLevel));
        assert_eq!(Sensor::from_name("Humidity"), None);
        assert_eq!(Sensor::from_name("sensor"), None);
    }

    #[test]
    fn test_field_keys_and_suffixes() {
        let keys: Vec<_> = Sensor::ALL.iter().map(|s| s.spec().field_key).collect();
        assert_eq!(keys, vec!["temperature", "vibration", "rpm", "level"]);

        let suffixes: Vec<_> = Sensor::ALL.iter().map(|s| s.spec().topic_suffix).collect();
        assert_eq!(suffixes, vec!["/temp", "/vibration", "/rpm", "/level"]);
    }

    #[test]
    fn test_normalize_clamps_and_snaps() {
        assert_eq!(Sensor::Temperature.normalize(-10.0), 20.0);
        assert_eq!(Sensor::Temperature.normalize(45.4), 45.0);
        assert_eq!(Sensor::Temperature.normalize(500.0), 90.0);
        assert_eq!(Sensor::Rpm.normalize(1504.0), 1500.0);
        assert_eq!(Sensor::Rpm.normalize(1506.0), 1510.0);
        assert_eq!(Sensor::Vibration.normalize(2.54), 2.5);
        assert_eq!(Sensor::Vibration.normalize(0.30000000000000004), 0.3);
        assert_eq!(Sensor::WaterLevel.normalize(5.04), 5.0);
    }

    #[test]
    fn test_initial_values_are_in_range() {
        for spec in SENSOR_TABLE {
            assert!(spec.initial >= spec.min && spec.initial <= spec.max);
            assert_eq!(spec.sensor.normalize(spec.initial), spec.initial);
        }
    }
}
