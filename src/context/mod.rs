//! Active conversation tracking and stale-result suppression
//!
//! The user can switch conversations while requests for the previous one are
//! still running. [`ActiveContextGuard`] stamps each operation with a
//! [`ContextToken`] at dispatch time and only lets a result touch shared
//! state if the token still matches when the result arrives.

mod guard;

pub use guard::{ActiveContextGuard, ContextToken, Guarded};
