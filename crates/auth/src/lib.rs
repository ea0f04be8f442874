//! `fintrack-auth`: identity capability.
//!
//! Token claims and HS256 signing, password hashing, the user record and
//! account entitlements. Decoupled from HTTP and storage.

pub mod claims;
pub mod entitlements;
pub mod password;
pub mod token;
pub mod user;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use entitlements::{Entitlement, EntitlementPolicy, require_entitlement};
pub use password::{PasswordError, hash_password, verify_password};
pub use token::{Hs256Jwt, JwtValidator, TokenError, TokenIssuer};
pub use user::{
    Credentials, ProfilePatch, Registration, RegistrationDraft, User, UserProfile,
    derive_public_id,
};
