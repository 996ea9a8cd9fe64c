//! Structured JSON-line logging.
//!
//! One line per event on stdout, filterable by `LOG_LEVEL`. The core
//! pipeline is pure and mostly silent; logging exists for the report binary
//! and for skip events inside the insight engine.

use chrono::Utc;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("debug") => Level::Debug,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// RFC3339 timestamp with milliseconds.
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry at an explicit level.
pub fn log(level: Level, module: &str, mut fields: Map<String, Value>) {
    if level < Level::from_env() {
        return;
    }
    fields.insert("ts".to_string(), Value::String(ts_now()));
    fields.insert("lvl".to_string(), Value::String(level.as_str().to_string()));
    fields.insert("module".to_string(), Value::String(module.to_string()));
    println!("{}", Value::Object(fields));
}

/// Info-level structured log entry.
pub fn json_log(module: &str, fields: Map<String, Value>) {
    log(Level::Info, module, fields);
}

/// Short stable fingerprint of an input blob, for correlating runs.
pub fn params_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn v_bool(b: bool) -> Value {
    Value::Bool(b)
}
