//! Raw error signals as the bridge reports them.
//!
//! Bridges are not consistent: geolocation reports a structured code, motion
//! sensors throw named exceptions, the camera hands back a bare string, and
//! some providers pass a bare number. `RawError` captures every one of these
//! shapes without interpreting it; the gateway maps them onto the normalized
//! taxonomy per capability.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code carried by a structured error, numeric or symbolic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    Number(i64),
    Name(String),
}

impl std::fmt::Display for RawCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawCode::Number(n) => write!(f, "{}", n),
            RawCode::Name(s) => write!(f, "{}", s),
        }
    }
}

/// An uninterpreted error from the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawError {
    /// `{ "code": 1, "message": "..." }`
    Coded {
        code: RawCode,
        #[serde(default)]
        message: Option<String>,
    },
    /// `{ "name": "NotAllowedError", "message": "..." }`
    Named {
        name: String,
        #[serde(default)]
        message: String,
    },
    /// A bare numeric value
    Number(i64),
    /// A bare string
    Text(String),
    /// Anything else the bridge decided to send
    Other(Value),
}

impl RawError {
    pub fn coded(code: i64, message: impl Into<String>) -> Self {
        RawError::Coded {
            code: RawCode::Number(code),
            message: Some(message.into()),
        }
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        RawError::Named {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn text(message: impl Into<String>) -> Self {
        RawError::Text(message.into())
    }

    /// Numeric code, whether structured or bare.
    pub fn numeric_code(&self) -> Option<i64> {
        match self {
            RawError::Coded {
                code: RawCode::Number(n),
                ..
            } => Some(*n),
            RawError::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Symbolic code or exception name, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            RawError::Coded {
                code: RawCode::Name(s),
                ..
            } => Some(s.as_str()),
            RawError::Named { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Human-readable message carried by the error, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            RawError::Coded { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
            RawError::Named { message, .. } if !message.is_empty() => Some(message.as_str()),
            RawError::Text(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for RawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawError::Coded {
                code,
                message: Some(m),
            } if !m.is_empty() => write!(f, "{} (code {})", m, code),
            RawError::Coded { code, .. } => write!(f, "error code {}", code),
            RawError::Named { name, message } if message.is_empty() => write!(f, "{}", name),
            RawError::Named { name, message } => write!(f, "{}: {}", name, message),
            RawError::Number(n) => write!(f, "error code {}", n),
            RawError::Text(s) => write!(f, "{}", s),
            RawError::Other(v) => write!(f, "{}", v),
        }
    }
}
