//! Verdant Test - Shared test utilities for the Verdant registry.
//!
//! This crate provides mock collaborators and fixtures that can be used
//! across Verdant crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! verdant-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use verdant_test::prelude::*;
//!
//! #[test]
//! fn test_fee_is_charged() {
//!     let ctx = TestRegistry::ready();
//!     ctx.registry.submit_audit(&test_submitter(), test_submission(1)).unwrap();
//!     assert_eq!(ctx.transfer.transfers().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
