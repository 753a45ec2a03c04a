//! Credential and identity model: token secrets, token pairs, user profiles, and JWT claims.

pub mod jwt;
pub mod token;
pub mod user;

pub use jwt::*;
pub use token::{pair::*, secret::*};
pub use user::*;
