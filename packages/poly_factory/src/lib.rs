#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A name-keyed registry that builds [`Poly`][poly::Poly] containers of default-constructible
//! types.
//!
//! Register each concrete type once, then create fresh objects by name at runtime:
//!
//! ```rust
//! use poly::{Deep, Dynamic, ShortName, upcast};
//! use poly_factory::Factory;
//!
//! trait Codec: Dynamic {
//!     fn extension(&self) -> &'static str;
//! }
//!
//! #[derive(Clone, Default)]
//! struct Png {
//!     compression: u8,
//! }
//!
//! #[derive(Clone, Default)]
//! struct Jpeg {
//!     quality: u8,
//! }
//!
//! impl Codec for Png {
//!     fn extension(&self) -> &'static str {
//!         "png"
//!     }
//! }
//!
//! impl Codec for Jpeg {
//!     fn extension(&self) -> &'static str {
//!         "jpg"
//!     }
//! }
//!
//! upcast!(Png => dyn Codec);
//! upcast!(Jpeg => dyn Codec);
//!
//! let mut codecs: Factory<dyn Codec, Deep<dyn Codec>, ShortName> = Factory::new();
//! codecs.register::<Png>().unwrap();
//! codecs.register::<Jpeg>().unwrap();
//!
//! assert_eq!(codecs.list(), ["Jpeg", "Png"]);
//! assert_eq!(codecs.make("Png").unwrap().extension(), "png");
//! assert!(codecs.make("Gif").is_err());
//! ```
//!
//! Registry keys come from a [`TypeNamer`][poly::TypeNamer] chosen through a type parameter.
//! Registering a second type under a taken name is ignored by default; use
//! [`Factory::builder()`] with [`DuplicatePolicy::Reject`] to treat it as an error.

mod builder;
mod duplicate_policy;
mod error;
mod factory;

pub use builder::*;
pub use duplicate_policy::*;
pub use error::*;
pub use factory::*;
