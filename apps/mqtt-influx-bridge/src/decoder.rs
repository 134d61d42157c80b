use crate::config::Config;
use crate::error::DecodeError;
use crate::flatten::{flatten, FieldValue, FlatFields, NestedValue};
use std::collections::BTreeMap;

const STATUS_FIELD: &str = "status";
const SCALAR_FIELD: &str = "value";

/// One decoded message, ready for a single storage write.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    pub measurement: String,
    pub topic: String,
    pub fields: FlatFields,
}

impl SensorRecord {
    pub fn new(measurement: impl Into<String>, topic: impl Into<String>, fields: FlatFields) -> Self {
        Self {
            measurement: measurement.into(),
            topic: topic.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageDecoder {
    measurement: String,
    status_topic: String,
    separator: String,
}

impl MessageDecoder {
    pub fn new(
        measurement: impl Into<String>,
        status_topic: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            status_topic: status_topic.into(),
            separator: separator.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.measurement.clone(),
            config.status_topic.clone(),
            config.key_separator.clone(),
        )
    }

    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<SensorRecord, DecodeError> {
        let text = std::str::from_utf8(payload)
            .map_err(|err| DecodeError::MalformedPayload(format!("payload is not UTF-8: {err}")))?;

        let node = if topic == self.status_topic {
            // Last-will payloads are bare words like `Online`, never JSON.
            NestedValue::Node(BTreeMap::from([(
                STATUS_FIELD.to_string(),
                NestedValue::Leaf(FieldValue::from(text)),
            )]))
        } else {
            let value: serde_json::Value = serde_json::from_str(text)
                .map_err(|err| DecodeError::MalformedPayload(err.to_string()))?;
            match NestedValue::from_json(value)? {
                Some(leaf @ NestedValue::Leaf(_)) => {
                    NestedValue::Node(BTreeMap::from([(SCALAR_FIELD.to_string(), leaf)]))
                }
                Some(node) => node,
                None => return Err(DecodeError::NoFields),
            }
        };

        let fields = flatten(&node, &self.separator);
        if fields.is_empty() {
            return Err(DecodeError::NoFields);
        }
        if fields.contains_key("") {
            return Err(DecodeError::UnsupportedShape {
                path: String::new(),
                reason: "empty field key",
            });
        }
        Ok(SensorRecord::new(self.measurement.clone(), topic, fields))
    }
}
