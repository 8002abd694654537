//! Application Models
//!
//! The shared-expense application's own labels, built on the mapping layer:
//!
//! - [`schemas`] - `User` and `Pool` records and their schemas
//! - [`social`] - friend requests, user search, pool ownership
//! - [`accounting`] - pool contribution totals

pub mod accounting;
pub mod schemas;
pub mod social;

pub use accounting::{total_paid_excluding, within_debt_ceiling};
pub use schemas::{pool_schema, user_schema, AuthToken, Gender, Pool, User, POOL, USER};
pub use social::AppModels;
