//! Authentication and authorization for townhall
//!
//! Provides:
//! - The `Principal` every action is performed as
//! - JWT identity assertion (bearer token -> principal)
//! - Pure guard predicates deciding who may act on petitions and polls
//! - Jurisdiction (location) normalization shared by every comparison site

pub mod guard;
pub mod jurisdiction;
pub mod jwt;
pub mod principal;

pub use guard::{Decision, DenyReason, OwnerAction};
pub use jurisdiction::{normalize_location, same_jurisdiction};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use principal::{initial_verification_status, Principal, Role};
