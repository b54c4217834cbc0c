/// Request-level failures. Each maps to a 400 response with a short message.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No host provided")]
    NoHost,

    #[error("No valid ports found")]
    NoValidPorts,

    #[error("Invalid port")]
    InvalidPort,

    #[error("Invalid action")]
    InvalidAction,

    #[error("Invalid JSON body")]
    InvalidBody,
}
