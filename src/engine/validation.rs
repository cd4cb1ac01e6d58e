// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output validation.
//!
//! Reconciles the value returned by user code with the item contract
//! `{json, binary?, pairedItem?, error?}`. `null`/`undefined` results are handled
//! by the executor before validation runs.

use serde_json::{Map, Value};

use crate::errors::ShapeMismatch;
use crate::sandbox::ReturnedValue;
use crate::task::{ExecutionRecord, PairedItem};

/// Top-level keys an output item may carry.
pub const ITEM_KEYS: [&str; 4] = ["json", "binary", "pairedItem", "error"];

const UNKNOWN_KEY_DESCRIPTION: &str =
    "Access the properties of an item under `.json`, e.g. `item.json`";

fn is_item_key(key: &str) -> bool {
    ITEM_KEYS.contains(&key)
}

/// Validate the result of a RunOnceForAllItems unit.
pub fn validate_all_items(value: ReturnedValue) -> Result<Vec<ExecutionRecord>, ShapeMismatch> {
    let elements = match value {
        ReturnedValue::Array(elements) => elements,
        _ => {
            return Err(ShapeMismatch::new(
                "Code doesn't return items properly",
                "Please return an array of objects, one for each item you would like to output.",
            ))
        }
    };

    let has_item_keys = elements
        .iter()
        .any(|element| element.as_object().is_some_and(|obj| obj.keys().any(|k| is_item_key(k))));
    if has_item_keys {
        for (index, element) in elements.iter().enumerate() {
            if let Some(obj) = element.as_object() {
                check_top_level_keys(obj, index)?;
            }
        }
    }

    normalize_items(elements)?
        .into_iter()
        .enumerate()
        .map(|(index, item)| into_record(item, index))
        .collect()
}

/// Validate the result of the RunOnceForEachItem unit for input item `index`.
pub fn validate_each_item(value: ReturnedValue, index: usize) -> Result<ExecutionRecord, ShapeMismatch> {
    let object = match value {
        ReturnedValue::Object(object) => object,
        ReturnedValue::Array(elements) => {
            let first_sentence = match elements.first() {
                Some(first) => format!("An array of {}s was returned.", js_type_name(first)),
                None => "An empty array was returned.".to_string(),
            };
            return Err(ShapeMismatch::new(
                "Code doesn't return a single object",
                format!(
                    "{} If you need to output multiple items, please use the 'Run Once for All Items' mode instead.",
                    first_sentence
                ),
            )
            .at_item(index));
        }
        ReturnedValue::Scalar(scalar) => {
            return Err(ShapeMismatch::new(
                "Code doesn't return an object",
                format!(
                    "Please return an object representing the output item. ('{}' was returned instead.)",
                    js_text(&scalar)
                ),
            )
            .at_item(index));
        }
        ReturnedValue::Null | ReturnedValue::Undefined => {
            return Err(ShapeMismatch::new(
                "Code doesn't return an object",
                "Please return an object representing the output item.",
            )
            .at_item(index));
        }
    };

    let item = normalize_items(vec![Value::Object(object)])
        .map_err(|err| err.at_item(index))?
        .into_iter()
        .next()
        .unwrap_or_default();

    let record = into_record(item.clone(), index)?;
    check_top_level_keys(&item, index)?;
    Ok(record.paired_with(index))
}

fn check_top_level_keys(item: &Map<String, Value>, index: usize) -> Result<(), ShapeMismatch> {
    match item.keys().find(|key| !is_item_key(key)) {
        Some(key) => Err(ShapeMismatch::new(
            format!("Unknown top-level item key: {}", key),
            UNKNOWN_KEY_DESCRIPTION,
        )
        .at_item(index)),
        None => Ok(()),
    }
}

fn has_key(element: &Value, key: &str) -> bool {
    element.as_object().is_some_and(|obj| obj.contains_key(key))
}

fn inconsistent() -> ShapeMismatch {
    ShapeMismatch::new(
        "Inconsistent item format",
        "Either every returned item has a 'json' key or none of them does.",
    )
}

/// Bring every element into `{json, ...}` form.
///
/// * all elements carry `json`: kept as they are
/// * all elements carry `binary` (and none `json`): the other keys become `json`
/// * no element carries either key: each element becomes the `json` of an item
/// * anything in between is inconsistent
fn normalize_items(elements: Vec<Value>) -> Result<Vec<Map<String, Value>>, ShapeMismatch> {
    if elements.iter().all(|e| has_key(e, "json")) {
        return Ok(elements.into_iter().filter_map(into_object).collect());
    }
    if elements.iter().any(|e| has_key(e, "json")) {
        return Err(inconsistent());
    }

    if elements.iter().all(|e| has_key(e, "binary")) {
        return Ok(elements
            .into_iter()
            .filter_map(into_object)
            .map(|mut obj| {
                let binary = obj.remove("binary").unwrap_or(Value::Null);
                let mut item = Map::new();
                item.insert("json".to_string(), Value::Object(obj));
                item.insert("binary".to_string(), binary);
                item
            })
            .collect());
    }
    if elements.iter().any(|e| has_key(e, "binary")) {
        return Err(inconsistent());
    }

    Ok(elements
        .into_iter()
        .map(|element| {
            let mut item = Map::new();
            item.insert("json".to_string(), element);
            item
        })
        .collect())
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(obj) => Some(obj),
        _ => None,
    }
}

fn into_record(mut item: Map<String, Value>, index: usize) -> Result<ExecutionRecord, ShapeMismatch> {
    let json = match item.remove("json") {
        Some(Value::Object(json)) => json,
        _ => {
            return Err(ShapeMismatch::new(
                "A 'json' property isn't an object",
                "In the returned data, every key named 'json' must point to an object.",
            )
            .at_item(index))
        }
    };

    let binary = match item.remove("binary") {
        None => None,
        Some(Value::Object(binary)) => Some(binary),
        Some(_) => {
            return Err(ShapeMismatch::new(
                "A 'binary' property isn't an object",
                "In the returned data, every key named 'binary' must point to an object.",
            )
            .at_item(index))
        }
    };

    let mut record = ExecutionRecord::new(json);
    record.binary = binary;
    record.paired_item = item.remove("pairedItem").and_then(paired_item);
    record.error = item.remove("error");
    Ok(record)
}

fn paired_item(value: Value) -> Option<PairedItem> {
    match value {
        Value::Number(n) => n.as_u64().map(|item| PairedItem { item: item as usize }),
        other => serde_json::from_value(other).ok(),
    }
}

/// The `typeof` name of a JSON value.
fn js_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Object(_) | Value::Array(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

/// `String(value)` for a scalar.
fn js_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
