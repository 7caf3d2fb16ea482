use std::path::{Path, PathBuf};

use serde_json::{json, Value};

/// Minimal valid document with the given facilities
#[allow(dead_code)]
pub fn document(facilities: Value) -> Value {
    json!({
        "format_version": 1,
        "ts": 1_700_000_000,
        "refresh_interval": 600,
        "facilities": facilities,
    })
}

/// Write `doc` to `name` inside `dir` and return the full path
#[allow(dead_code)]
pub fn write_document(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(doc).unwrap()).unwrap();
    path
}
