//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IbnError {
    /// Required connection settings are absent or malformed.
    #[error("CONFIG/{0}")]
    Configuration(String),

    #[error("NOTFOUND/{kind} '{name}'")]
    NotFound { kind: &'static str, name: String },

    /// The language-model response could not be used as a policy.
    #[error("TRANSLATE/{0}")]
    Translation(String),

    #[error("CONTROLLER/{method} {path} failed: {status} {body}")]
    ControllerApi {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// Console connect or command failure for one device.
    #[error("DEVICE/{device}: {message}")]
    DeviceOperation { device: String, message: String },

    #[error("VALIDATE/{0}")]
    Validation(String),

    #[error("CONFLICT/policy {policy_id} is at revision {found}, expected {expected}")]
    Conflict {
        policy_id: String,
        expected: u64,
        found: u64,
    },

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),

    #[error("SERIALIZE/{0}")]
    Serialization(String),

    #[error("HTTP/{0}")]
    Http(String),
}

impl IbnError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn device(device: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::DeviceOperation {
            device: device.into(),
            message: message.to_string(),
        }
    }

    /// True for a controller response that reported a missing resource.
    pub fn is_controller_not_found(&self) -> bool {
        matches!(self, Self::ControllerApi { status: 404, .. })
    }
}

impl From<serde_json::Error> for IbnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for IbnError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IbnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_404_detection() {
        let err = IbnError::ControllerApi {
            method: "GET".to_string(),
            path: "/projects/p/nodes/n".to_string(),
            status: 404,
            body: "not found".to_string(),
        };
        assert!(err.is_controller_not_found());
        assert!(err.to_string().contains("404"));

        let err = IbnError::ControllerApi {
            method: "GET".to_string(),
            path: "/projects".to_string(),
            status: 500,
            body: String::new(),
        };
        assert!(!err.is_controller_not_found());
    }

    #[test]
    fn test_device_error_message() {
        let err = IbnError::device("FW-1", "connection refused");
        assert_eq!(err.to_string(), "DEVICE/FW-1: connection refused");
    }
}
