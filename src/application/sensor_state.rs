// In-memory sensor readings edited by the operator
use crate::domain::sensor::Sensor;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("unknown sensor: {0}")]
    UnknownSensor(String),
    #[error("invalid value for {sensor}: {value}")]
    InvalidValue { sensor: Sensor, value: f64 },
}

/// Consistent copy of every reading, taken once per publish batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    values: [f64; 4],
}

impl SensorSnapshot {
    pub fn get(&self, sensor: Sensor) -> f64 {
        self.values[sensor as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sensor, f64)> + '_ {
        Sensor::ALL.into_iter().map(|s| (s, self.get(s)))
    }

    pub fn readings(&self) -> Vec<SensorReading> {
        self.iter().map(|(s, v)| SensorReading::new(s, v)).collect()
    }
}

/// A reading with its presentation metadata, as shown to the operator.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SensorReading {
    pub name: Sensor,
    pub field: &'static str,
    pub value: f64,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub display_precision: u32,
}

impl SensorReading {
    pub fn new(sensor: Sensor, value: f64) -> Self {
        let spec = sensor.spec();
        Self {
            name: sensor,
            field: spec.field_key,
            value,
            unit: spec.unit,
            min: spec.min,
            max: spec.max,
            step: spec.step,
            display_precision: spec.display_precision,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorState {
    values: [f64; 4],
}

impl Default for SensorState {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorState {
    pub fn new() -> Self {
        Self {
            values: Sensor::ALL.map(|s| s.spec().initial),
        }
    }

    /// Store a new reading, snapped to the sensor's step and clamped into range.
    pub fn set(&mut self, sensor: Sensor, raw: f64) -> Result<f64, SensorError> {
        if !raw.is_finite() {
            return Err(SensorError::InvalidValue { sensor, value: raw });
        }
        let value = sensor.normalize(raw);
        self.values[sensor as usize] = value;
        Ok(value)
    }

    pub fn set_named(&mut self, name: &str, raw: f64) -> Result<(Sensor, f64), SensorError> {
        let sensor =
            Sensor::from_name(name).ok_or_else(|| SensorError::UnknownSensor(name.to_string()))?;
        let value = self.set(sensor, raw)?;
        Ok((sensor, value))
    }

    // Baselines may sit below a sensor's slider minimum.
    pub fn reset_all(&mut self) {
        self.values = Sensor::ALL.map(|s| s.spec().baseline);
    }

    pub fn get(&self, sensor: Sensor) -> f64 {
        self.values[sensor as usize]
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            values: self.values,
        }
    }
}
