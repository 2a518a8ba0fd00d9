pub mod password;
pub mod scope;
pub mod token;

pub use scope::AccessScope;
pub use token::Claims;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
