// One publish batch: a message per sensor, delivered independently
use crate::application::broker::Broker;
use crate::application::sensor_state::SensorSnapshot;
use crate::domain::sensor::Sensor;
use serde::Serialize;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub sensor: Sensor,
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendFailure {
    pub topic: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub unit_id: String,
    pub delivered: Vec<String>,
    pub failures: Vec<SendFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PublishBatch {
    unit_id: String,
    messages: Vec<OutboundMessage>,
}

impl PublishBatch {
    pub fn build(namespace: &str, unit_id: &str, snapshot: &SensorSnapshot) -> Self {
        let messages = snapshot
            .iter()
            .map(|(sensor, value)| OutboundMessage {
                sensor,
                topic: topic_for(namespace, unit_id, sensor),
                payload: encode_payload(sensor, value),
            })
            .collect();

        Self {
            unit_id: unit_id.to_string(),
            messages,
        }
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    /// Send every message; a failed send does not stop the rest.
    pub fn deliver(self, broker: &dyn Broker) -> BatchReport {
        let mut delivered = Vec::with_capacity(self.messages.len());
        let mut failures = Vec::new();

        for message in self.messages {
            match broker.send(&message.topic, message.payload.into_bytes()) {
                Ok(()) => {
                    tracing::debug!("Published {} to {}", message.sensor, message.topic);
                    delivered.push(message.topic);
                }
                Err(e) => failures.push(SendFailure {
                    topic: message.topic,
                    error: e.to_string(),
                }),
            }
        }

        BatchReport {
            unit_id: self.unit_id,
            delivered,
            failures,
        }
    }
}

pub fn topic_for(namespace: &str, unit_id: &str, sensor: Sensor) -> String {
    format!("{}/{}{}", namespace, unit_id, sensor.spec().topic_suffix)
}

/// Single-key JSON object, e.g. `{"rpm":1500}`.
pub fn encode_payload(sensor: Sensor, value: f64) -> String {
    let mut object = Map::new();
    object.insert(sensor.spec().field_key.to_string(), json_number(value));
    Value::Object(object).to_string()
}

// Integral readings are written without a fractional part.
fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}
