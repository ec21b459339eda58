//! Credential handling: argon2 password hashes and JWT bearer tokens.

mod password;
mod token;

pub use password::{hash_password_blocking, verify_password_blocking, PasswordError};
pub use token::{TokenError, TokenIssuer};
