// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::{normalize, ErrorKind, NormalizedError, ThrownValue};

/// How one execution unit ended, as read back from the sandbox harness.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum UnitReport {
    Returned { value: ReturnedValue },
    Threw { thrown: ThrownValue },
    /// The code's promise never settled and nothing was left to settle it.
    Pending,
}

/// The settled value of the user's code, converted to plain data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ReturnedValue {
    Undefined,
    Null,
    Array(Vec<Value>),
    Object(Map<String, Value>),
    /// Strings, numbers, booleans, and anything else without structure.
    Scalar(Value),
}

impl ReturnedValue {
    /// `null` and `undefined` both mean "no output".
    pub fn is_nullish(&self) -> bool {
        matches!(self, ReturnedValue::Undefined | ReturnedValue::Null)
    }
}

impl UnitReport {
    /// The returned value, or the normalized error the unit failed with.
    pub fn into_result(self) -> Result<ReturnedValue, NormalizedError> {
        match self {
            UnitReport::Returned { value } => Ok(value),
            UnitReport::Threw { thrown } => Err(normalize(thrown)),
            UnitReport::Pending => Err(NormalizedError::new(
                ErrorKind::NativeExecutionFailure,
                "Code never settled: the returned promise is still pending and nothing is scheduled to resolve it",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reports_parse_from_harness_json() {
        let returned: UnitReport = serde_json::from_value(json!({
            "status": "returned",
            "value": {"type": "array", "data": [{"json": {"a": 1}}]}
        }))
        .unwrap();
        assert_eq!(
            returned,
            UnitReport::Returned {
                value: ReturnedValue::Array(vec![json!({"json": {"a": 1}})])
            }
        );

        let undefined: UnitReport =
            serde_json::from_value(json!({"status": "returned", "value": {"type": "undefined"}}))
                .unwrap();
        assert_eq!(
            undefined,
            UnitReport::Returned {
                value: ReturnedValue::Undefined
            }
        );

        let pending: UnitReport = serde_json::from_value(json!({"status": "pending"})).unwrap();
        assert_eq!(pending, UnitReport::Pending);
    }

    #[test]
    fn test_pending_unit_is_an_execution_failure() {
        let err = UnitReport::Pending.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NativeExecutionFailure);
        assert!(err.message.contains("never settled"));
    }

    #[test]
    fn test_thrown_value_is_normalized() {
        let err = UnitReport::Threw {
            thrown: ThrownValue::Other {
                text: "42".to_string(),
            },
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.message, "42");
        assert_eq!(err.kind, ErrorKind::NonErrorThrow);
    }
}
