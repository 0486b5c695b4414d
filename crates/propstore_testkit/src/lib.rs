//! # propstore testkit
//!
//! Test utilities for propstore.
//!
//! This crate provides:
//! - Fixture keys and pre-populated stores
//! - Property-based operation generators using proptest
//! - A sequential reference model of the transactional store
//! - Stress testing utilities for concurrent transactions
//! - Cross-module integration scenarios
//!
//! ## Usage
//!
//! ```rust,ignore
//! use propstore_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     init_test_logging();
//!     let keys = TestKeys::new();
//!     let store = populated_store(&keys);
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
pub use model::*;
pub use stress::*;
