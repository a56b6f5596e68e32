//! Time units.

pub const MS_SEC: i64 = 1_000;
pub const US_SEC: i64 = 1_000_000;
pub const NS_SEC: i64 = 1_000_000_000;
