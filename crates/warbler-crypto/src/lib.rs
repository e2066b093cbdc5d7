/// Warbler credential handling.
///
/// Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$...`),
/// which carry their own salt and parameters.
pub mod password;

pub use password::{hash_password, verify_password};
