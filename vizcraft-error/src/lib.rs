//! # vizcraft-error
//!
//! Unified error handling for vizcraft.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., CredentialMissing, SandboxFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use vizcraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::SandboxFailed, "container exited")
//!         .with_operation("sandbox::exec")
//!         .with_context("container", "3f2a9c")
//!         .with_context("command", "ls -la"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, vizcraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using vizcraft Error
pub type Result<T> = std::result::Result<T, Error>;
