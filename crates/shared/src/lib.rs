//! Shared utilities used across the grantbridge workspace.

pub mod period;
pub mod template;
