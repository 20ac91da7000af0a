//! Error types for registry operations

use std::fmt;

use crate::DeviceId;

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur during registry operations
///
/// Validation errors are returned before any state is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The given address is not a valid IPv4 dotted-quad
    InvalidAddress(String),

    /// Another device is already registered under this address
    DuplicateAddress(String),

    /// No device with the given id exists
    NotFound(DeviceId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidAddress(address) => {
                write!(f, "invalid IPv4 address: {}", address)
            }
            RegistryError::DuplicateAddress(address) => {
                write!(f, "a device with address {} already exists", address)
            }
            RegistryError::NotFound(id) => write!(f, "no device with id {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
