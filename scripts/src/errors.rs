//! Definitions of errors that can occur during the execution of the migration scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the migration scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading a local file (secrets, addresses, deployments)
    ReadFile(String),
    /// Error writing a local file
    WriteFile(String),
    /// A compiled artifact or compiler input does not exist
    ArtifactNotFound(String),
    /// Error parsing a compiled artifact or compiler input
    ArtifactParsing(String),
    /// Invalid or missing configuration
    Config(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error constructing calldata for a contract method or constructor
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// An expected event was not emitted by a transaction
    MissingEvent(String),
    /// Error sending a request to the verification service
    VerificationRequest(String),
    /// The verification service rejected a submission
    VerificationRejected {
        /// The `message` field of the service's response
        message: String,
        /// The `result` field of the service's response
        result: String,
    },
    /// Error de/serializing JSON
    Serde(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
            ScriptError::ArtifactNotFound(s) => write!(f, "artifact not found: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::Config(s) => write!(f, "invalid configuration: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::MissingEvent(s) => write!(f, "expected event not found: {}", s),
            ScriptError::VerificationRequest(s) => {
                write!(f, "error submitting verification request: {}", s)
            }
            ScriptError::VerificationRejected { message, result } => {
                write!(f, "verification failed: {}: {}", message, result)
            }
            ScriptError::Serde(s) => write!(f, "error de/serializing JSON: {}", s),
        }
    }
}

impl Error for ScriptError {}
