// File: `crates/ot-core/src/lib.rs`
//! # OT Core
//!
//! The operation algebra behind Carnelia's collaborative text editing.
//!
//! A document is a plain string whose characters may carry formatting
//! attributes. Every change is an [`Operation`] - a canonical sequence of
//! retain / insert / delete steps - and operations can be:
//!
//! - applied to a document ([`Operation::apply`])
//! - composed into one ([`Operation::compose`])
//! - transformed against a concurrent operation ([`Operation::transform`])
//! - inverted for undo ([`Operation::invert`])
//!
//! [`Cursor`]s follow operations with [`Cursor::transform`].
//!
//! ## Example
//!
//! ```
//! use ot_core::Operation;
//!
//! let mut alice = Operation::new();
//! alice.retain(1).insert("X").retain(2);
//!
//! let mut bob = Operation::new();
//! bob.retain(2).delete(1);
//!
//! let (alice_prime, bob_prime) = alice.transform(&bob).unwrap();
//!
//! let left = bob_prime.apply(&alice.apply("abc").unwrap()).unwrap();
//! let right = alice_prime.apply(&bob.apply("abc").unwrap()).unwrap();
//! assert_eq!(left, "aXb");
//! assert_eq!(left, right);
//! ```

pub mod attributes;
pub mod cursor;
pub mod error;
pub mod json;
pub mod operation;
pub mod text_op;
pub mod transform;

pub use attributes::{AttributeValue, Attributes};
pub use cursor::Cursor;
pub use error::{OtError, Result};
pub use operation::Operation;
pub use text_op::TextOp;
pub use transform::OperationalTransform;
