use thiserror::Error;

/// Errors raised while constructing core domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid subnet '{input}': expected a three-octet prefix such as 192.168.1.0/24")]
    InvalidSubnet { input: String },

    #[error("Invalid hardware address: {0}")]
    InvalidHardwareAddress(String),
}
