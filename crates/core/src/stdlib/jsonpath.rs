//! `ds.jsonpath` — JsonPath selection over values.
//!
//! Evaluation itself is the external library's contract; this module
//! only adapts values in and out.

use jsonpath_rust::JsonPath;

use crate::error::Error;
use crate::value::{Function, Value};

use super::{as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![Function::native("select", &["object", "path"], |_, args| {
        expect_arity("select", args, 2)?;
        let path = as_str(&args[1])?;
        let document = args[0].to_json()?;
        let matches = document
            .query(&path)
            .map_err(|e| Error::Domain(format!("JsonPath error: {e}")))?;
        let mut found: Vec<serde_json::Value> = matches.into_iter().cloned().collect();
        Ok(match found.len() {
            0 => Value::Null,
            1 => Value::from_json(found.remove(0)),
            _ => Value::from_json(serde_json::Value::Array(found)),
        })
    })]
}
