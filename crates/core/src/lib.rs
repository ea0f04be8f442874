//! `fintrack-core`: domain foundation building blocks.
//!
//! Identifiers, the shared error model and the entity contract. No IO.

pub mod entity;
pub mod error;
pub mod id;
pub mod validate;

pub use entity::{Entity, Owned};
pub use error::{DomainError, DomainResult, FieldError, Violations};
pub use id::{PersonId, TransactionId, UserId};
