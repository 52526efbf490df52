/// Authentication utilities
///
/// This module provides the authentication primitives for Taskfolio:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`token`]: Signed bearer tokens for the login session
/// - [`middleware`]: The request auth gate and the `AuthUser` identity
///
/// The auth gate is deliberately just a guard: it resolves "who is
/// calling" and nothing more. Ownership checks against that identity
/// happen explicitly in each operation.

pub mod middleware;
pub mod password;
pub mod token;
