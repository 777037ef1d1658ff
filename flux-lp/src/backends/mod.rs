//! LP backend implementations.

pub mod microlp;

#[cfg(feature = "clarabel")]
pub mod clarabel;

pub use self::microlp::MicrolpBackend;

#[cfg(feature = "clarabel")]
pub use self::clarabel::ClarabelBackend;
