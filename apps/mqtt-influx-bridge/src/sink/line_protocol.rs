//! InfluxDB line protocol encoding.
//!
//! ```text
//! measurement,topic=<topic> field1=val1,field2=val2
//! ```
//!
//! The timestamp is left off so the server stamps each point on arrival.

use crate::decoder::SensorRecord;
use crate::flatten::FieldValue;

pub const TOPIC_TAG: &str = "topic";

pub fn encode_record(record: &SensorRecord) -> String {
    let mut line = escape_measurement(&record.measurement);
    line.push(',');
    line.push_str(TOPIC_TAG);
    line.push('=');
    line.push_str(&escape_key(&record.topic));
    line.push(' ');

    for (i, (key, value)) in record.fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&encode_field_value(value));
    }
    line
}

/// - Float: shortest round-trip form (`3.837`, `0`)
/// - Integer: `i` suffix (`42i`)
/// - String: double-quoted, `\`, `"` and newlines escaped
/// - Boolean: `true` / `false`
pub fn encode_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Float(v) => format!("{v}"),
        FieldValue::Integer(v) => format!("{v}i"),
        FieldValue::String(v) => {
            let escaped = v
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n");
            format!("\"{escaped}\"")
        }
        FieldValue::Boolean(v) => v.to_string(),
    }
}

// Backslash goes first so the escapes added after it are not doubled.
fn escape_measurement(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
}

// Tag keys, tag values and field keys share the same rules.
fn escape_key(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
