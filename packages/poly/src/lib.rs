#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! An owning pointer to a polymorphic heap object with value semantics.
//!
//! This crate provides [`Poly`], a container that owns exactly one heap object and exposes it
//! through a declared base type `B`, while remembering the exact type of the object. That lets
//! a holder copy, move, destroy and downcast the object as if it were an ordinary value, without
//! ever naming its exact type.
//!
//! # Key Features
//!
//! - **Deep copies**: cloning a container clones the object as its exact type
//! - **Exact-type queries**: [`Poly::is()`] and [`Poly::downcast_ref()`] match only the exact
//!   type, never a type that merely implements or contains the base
//! - **Field bases**: the base may be a field in the middle of the object, not only a trait
//!   object; the [`OffsetCache`] remembers how to get back from the field to the object
//! - **Compile-time policies**: the policy type parameter decides whether the container can be
//!   copied ([`Deep`], [`DeepOffset`]) or only moved ([`Unique`], [`UniqueOffset`])
//! - **Access qualifiers**: a [`Const`] container hands out shared references only, and a
//!   container may only gain qualification, never lose it
//! - **Rebasing**: [`Poly::transform()`] moves an object into a container over another base
//!   without copying it
//!
//! # Relations
//!
//! A concrete type `D` is related to a base `B` through the [`Upcast`] trait. Declare the
//! relation with [`upcast!`] when the base is a trait object and with [`upcast_field!`] when the
//! base is a field of the object:
//!
//! ```rust
//! use poly::{Dynamic, Poly, Unique, upcast};
//!
//! trait Sensor: Dynamic {
//!     fn read(&self) -> f64;
//! }
//!
//! struct Thermometer {
//!     celsius: f64,
//! }
//!
//! impl Sensor for Thermometer {
//!     fn read(&self) -> f64 {
//!         self.celsius
//!     }
//! }
//!
//! upcast!(Thermometer => dyn Sensor);
//!
//! let sensor: Poly<dyn Sensor, Unique> = Poly::new(Box::new(Thermometer { celsius: 21.5 }));
//!
//! assert_eq!(sensor.read(), 21.5);
//! assert!(sensor.is::<Thermometer>());
//! ```
//!
//! Trait object bases should have [`Dynamic`] as a supertrait so the exact type can be read
//! through the vtable.
//!
//! # Thread safety
//!
//! A container is [`Send`] and [`Sync`] whenever its base and policy are. The only shared state
//! is the process-wide offset cache, which is read without locking once a thread has seen a
//! base and exact type pair.

mod clone_policy;
mod compound;
mod constants;
mod destroy_policy;
mod error;
mod offset;
mod poly;
mod relation;
mod rtti;

pub use clone_policy::*;
pub use compound::*;
pub use destroy_policy::*;
pub use error::*;
pub use offset::*;
pub use poly::*;
pub use relation::*;
pub use rtti::*;
