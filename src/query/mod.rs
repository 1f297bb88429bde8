//! Query narrowing: criteria accumulation and SQL dialect rendering.
//!
//! Every pouch hands out queries that carry a [`Criteria`]. SQL pouches
//! render it into the statement; the other backends honour what they can
//! (pagination) and log what they ignore.

pub mod criteria;
#[doc(inline)]
pub use criteria::{Constraint, Criteria, RenderedCriteria};

pub mod dialect;
#[doc(inline)]
pub use dialect::SqlDialect;
