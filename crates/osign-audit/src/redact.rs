//! Metadata redaction applied before an entry is chained.

use serde_json::Value;

use osign_core::identity::redact_national_id;

/// Metadata keys holding a national id, at any depth.
pub const NATIONAL_ID_KEYS: &[&str] = &["national_id", "cpf", "document_number"];

/// Replace every national id value with its first three digits and `***`.
/// IP addresses and everything else pass through.
pub fn redact_metadata(metadata: &Value) -> Value {
    match metadata {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let redacted = if NATIONAL_ID_KEYS.contains(&key.as_str()) {
                        redact_value(value)
                    } else {
                        redact_metadata(value)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_metadata).collect()),
        other => other.clone(),
    }
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_national_id(s)),
        Value::Number(n) => Value::String(redact_national_id(&n.to_string())),
        Value::Null => Value::Null,
        _ => Value::String("***".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn national_ids_keep_three_digits() {
        let redacted = redact_metadata(&json!({
            "national_id": "529.982.247-25",
            "ip_address": "203.0.113.9",
        }));
        assert_eq!(redacted["national_id"], "529***");
        assert_eq!(redacted["ip_address"], "203.0.113.9");
    }

    #[test]
    fn nested_and_numeric_values_are_redacted() {
        let redacted = redact_metadata(&json!({
            "signers": [{ "cpf": 11144477735u64 }, { "cpf": null }],
            "evidence": { "document_number": { "raw": "x" } },
        }));
        assert_eq!(redacted["signers"][0]["cpf"], "111***");
        assert!(redacted["signers"][1]["cpf"].is_null());
        assert_eq!(redacted["evidence"]["document_number"], "***");
    }
}
