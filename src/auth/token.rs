//! Bearer credentials issued by the authentication endpoints.

pub mod pair;
pub mod secret;
