//! Calldata encoding
//!
//! Every calldata value is encoded to the fixed scalar wire form the
//! wallet CLI expects: a hexadecimal numeric string. Booleans map to
//! 0x0/0x1, integers and decimal strings are converted to hex, and
//! existing 0x strings pass through. Anything else fails the whole
//! bundle before any external invocation; struct encoding is
//! deliberately not implemented.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::Call;

/// A value an encoding attempt could not represent as a felt
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot encode calldata value as felt: {value}")]
pub struct UnsupportedValue {
    pub value: String,
}

/// Multi-call bundle file consumed by the wallet CLI
///
/// Shape: `{ "calls": [{ contractAddress, entrypoint, calldata: [hex] }] }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleFile {
    pub calls: Vec<EncodedCall>,
}

/// One fully encoded call inside a bundle file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodedCall {
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    pub entrypoint: String,
    pub calldata: Vec<String>,
}

/// Encode one scalar JSON value to a felt hex string
pub fn to_felt(value: &Value) -> Result<String, UnsupportedValue> {
    match value {
        Value::Bool(true) => Ok("0x1".to_string()),
        Value::Bool(false) => Ok("0x0".to_string()),
        Value::Number(n) => {
            let u = n.as_u64().ok_or_else(|| unsupported(value))?;
            Ok(format!("{:#x}", u))
        }
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x") {
                if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Ok(s.to_string());
                }
                return Err(unsupported(value));
            }
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                let n: u128 = s.parse().map_err(|_| unsupported(value))?;
                return Ok(format!("{:#x}", n));
            }
            Err(unsupported(value))
        }
        // Structured calldata is refused, never guessed at.
        _ => Err(unsupported(value)),
    }
}

/// Encode a list of scalar values
pub fn encode_calldata(calldata: &[Value]) -> Result<Vec<String>, UnsupportedValue> {
    calldata.iter().map(to_felt).collect()
}

/// Encode a whole bundle; any unsupported value fails the bundle
pub fn encode_calls(calls: &[Call]) -> Result<BundleFile, UnsupportedValue> {
    let encoded = calls
        .iter()
        .map(|c| {
            Ok(EncodedCall {
                contract_address: c.contract_address.clone(),
                entrypoint: c.entrypoint.clone(),
                calldata: encode_calldata(&c.calldata)?,
            })
        })
        .collect::<Result<Vec<_>, UnsupportedValue>>()?;
    Ok(BundleFile { calls: encoded })
}

fn unsupported(value: &Value) -> UnsupportedValue {
    UnsupportedValue {
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_encoding() {
        let calldata = vec![json!(true), json!(42), json!("0x2a"), json!("300")];
        let encoded = encode_calldata(&calldata).unwrap();
        assert_eq!(encoded, vec!["0x1", "0x2a", "0x2a", "0x12c"]);
    }

    #[test]
    fn test_false_is_zero() {
        assert_eq!(to_felt(&json!(false)).unwrap(), "0x0");
    }

    #[test]
    fn test_object_calldata_is_rejected() {
        let err = encode_calldata(&[json!({})]).unwrap_err();
        assert!(err.value.contains("{}"));
        assert!(encode_calldata(&[json!([1, 2])]).is_err());
        assert!(to_felt(&json!(null)).is_err());
    }

    #[test]
    fn test_arbitrary_strings_are_rejected() {
        assert!(to_felt(&json!("explore")).is_err());
        assert!(to_felt(&json!("0xzz")).is_err());
        assert!(to_felt(&json!("12.5")).is_err());
        assert!(to_felt(&json!("")).is_err());
    }

    #[test]
    fn test_negative_and_fractional_numbers_are_rejected() {
        assert!(to_felt(&json!(-1)).is_err());
        assert!(to_felt(&json!(1.5)).is_err());
    }

    #[test]
    fn test_bundle_encoding_fails_whole_bundle() {
        let calls = vec![
            Call {
                contract_address: "0xabc".to_string(),
                entrypoint: "explore".to_string(),
                calldata: vec![json!("0x1"), json!(false)],
            },
            Call {
                contract_address: "0xabc".to_string(),
                entrypoint: "attack".to_string(),
                calldata: vec![json!({ "nested": 1 })],
            },
        ];
        assert!(encode_calls(&calls).is_err());
    }

    #[test]
    fn test_bundle_file_shape() {
        let calls = vec![Call {
            contract_address: "0xabc".to_string(),
            entrypoint: "explore".to_string(),
            calldata: vec![json!("7"), json!(false)],
        }];
        let bundle = encode_calls(&calls).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(
            json,
            json!({ "calls": [{
                "contractAddress": "0xabc",
                "entrypoint": "explore",
                "calldata": ["0x7", "0x0"]
            }]})
        );
    }
}
