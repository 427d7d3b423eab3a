//! Compile-time relations between types: "is a base of" and "is at least as qualified as".
//!
//! Both relations are expressed as traits, so a container conversion that would relate two
//! unrelated types simply has no implementation to call and is rejected by the compiler.

use std::ptr::NonNull;

/// Declares that `Self` can be viewed as a `B`, i.e. that `B` is a base of `Self`.
///
/// A view is a pointer into the allocation of the object. It may start at the same address
/// as the object (trait objects, the type itself) or at a sub-object somewhere inside it
/// (a field). In the latter case the distance between the two addresses is what
/// [`OffsetCache`][crate::OffsetCache] learns and uses to get back from the view to the object.
///
/// Prefer the [`upcast!`][crate::upcast] and [`upcast_field!`][crate::upcast_field] macros
/// over writing implementations by hand.
///
/// # Safety
///
/// Implementations must guarantee that:
///
/// 1. The returned pointer points into the allocation of `*this` and is derived from `this`
///    without narrowing its provenance (no intermediate references).
/// 2. The returned pointer is valid for reads and writes of `B` for as long as `*this` is.
/// 3. The distance between `this` and the returned pointer is the same for every object of
///    type `Self`.
pub unsafe trait Upcast<B>: Sized + 'static
where
    B: ?Sized + 'static,
{
    /// Returns the `B` view of the object.
    ///
    /// # Safety
    ///
    /// `this` must point to a live `Self`.
    unsafe fn upcast(this: NonNull<Self>) -> NonNull<B>;
}

/// Marks an [`Upcast`] relation where the `B` view starts at the same address as the object
/// and a `Box<B>` created from the view frees the whole object.
///
/// This holds for unsizing coercions to trait objects and for the identity relation. It is
/// what allows [`VirtualDelete`][crate::VirtualDelete] to drop objects through the base view.
///
/// # Safety
///
/// [`Upcast::upcast`] must return a pointer with the same address as its input, and dropping a
/// `Box<B>` made from that pointer must drop and deallocate the complete `Self`.
pub unsafe trait Coerce<B>: Upcast<B>
where
    B: ?Sized + 'static,
{
}

// SAFETY: The identity view is the object itself.
unsafe impl<T> Upcast<T> for T
where
    T: 'static,
{
    #[inline]
    unsafe fn upcast(this: NonNull<Self>) -> NonNull<T> {
        this
    }
}

// SAFETY: `Box<T>` made from a pointer to `T` frees exactly that `T`.
unsafe impl<T> Coerce<T> for T where T: 'static {}

/// Declares that a type can be viewed as one or more trait objects through unsizing coercion.
///
/// The compiler checks that each coercion is valid, so this cannot relate unrelated types.
///
/// # Example
///
/// ```
/// use poly::{Dynamic, Poly, upcast};
///
/// trait Shape: Dynamic {
///     fn corners(&self) -> u32;
/// }
///
/// #[derive(Clone)]
/// struct Triangle {
///     side: f64,
/// }
///
/// impl Shape for Triangle {
///     fn corners(&self) -> u32 {
///         3
///     }
/// }
///
/// upcast!(Triangle => dyn Shape);
///
/// let shape: Poly<dyn Shape> = Poly::new(Box::new(Triangle { side: 1.5 }));
/// assert_eq!(shape.corners(), 3);
/// ```
#[macro_export]
macro_rules! upcast {
    ($derived:ty => $($base:ty),+ $(,)?) => {
        $(
            // SAFETY: An unsizing coercion keeps the address and the provenance of the object.
            unsafe impl $crate::Upcast<$base> for $derived {
                #[inline]
                unsafe fn upcast(
                    this: ::core::ptr::NonNull<Self>,
                ) -> ::core::ptr::NonNull<$base> {
                    this
                }
            }

            // SAFETY: The trait object vtable drops and deallocates the complete object.
            unsafe impl $crate::Coerce<$base> for $derived {}
        )+
    };
}

/// Declares that a type can be viewed as one of its fields (possibly nested).
///
/// The field may sit at any offset inside the object. Containers that hold such a view must
/// use a destroy policy that goes back to the object before dropping it, such as
/// [`OffsetDelete`][crate::OffsetDelete].
///
/// # Example
///
/// ```
/// use poly::{DeepOffset, Poly, upcast_field};
///
/// #[derive(Clone)]
/// struct Header {
///     id: u32,
/// }
///
/// #[derive(Clone)]
/// struct Packet {
///     payload: Vec<u8>,
///     header: Header,
/// }
///
/// upcast_field!(Packet, header: Header);
///
/// let packet: Poly<Header, DeepOffset<Header>> = Poly::new(Box::new(Packet {
///     payload: vec![1, 2, 3],
///     header: Header { id: 7 },
/// }));
///
/// assert_eq!(packet.id, 7);
/// assert_eq!(packet.downcast_ref::<Packet>().unwrap().payload, [1, 2, 3]);
/// ```
#[macro_export]
macro_rules! upcast_field {
    ($derived:ty, $($field:ident).+ : $base:ty) => {
        // SAFETY: The field lives inside the object and the pointer to it is derived without an
        // intermediate reference, so it keeps the provenance of the whole allocation.
        unsafe impl $crate::Upcast<$base> for $derived {
            #[inline]
            unsafe fn upcast(this: ::core::ptr::NonNull<Self>) -> ::core::ptr::NonNull<$base> {
                // SAFETY: The caller guarantees `this` points to a live object, so the field
                // projection stays in bounds and cannot be null.
                unsafe {
                    ::core::ptr::NonNull::new_unchecked(&raw mut (*this.as_ptr()).$($field).+)
                }
            }
        }
    };
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Mutable {}
    impl Sealed for super::Const {}
}

/// An access qualifier of a container: what the holder may do with the object.
///
/// This trait is sealed; the only qualifiers are [`Mutable`] and [`Const`].
pub trait Qualifier: sealed::Sealed + 'static {
    /// Whether the qualifier forbids mutable access to the object.
    const READ_ONLY: bool;
}

/// Full access: the holder may obtain `&mut` references to the object.
#[derive(Debug)]
pub enum Mutable {}

/// Read-only access: the holder may only obtain shared references to the object.
#[derive(Debug)]
pub enum Const {}

impl Qualifier for Mutable {
    const READ_ONLY: bool = false;
}

impl Qualifier for Const {
    const READ_ONLY: bool = true;
}

/// `Self` is at least as strongly qualified as `Q`, so a container may be converted from a
/// `Q` qualification to `Self` without gaining any capability.
///
/// Promoting [`Mutable`] to [`Const`] is allowed; removing [`Const`] is not.
pub trait AtLeast<Q>: Qualifier
where
    Q: Qualifier,
{
}

impl AtLeast<Mutable> for Mutable {}
impl AtLeast<Mutable> for Const {}
impl AtLeast<Const> for Const {}

/// Whether `A` is at least as strongly qualified as `B`.
///
/// This is the value-level mirror of the [`AtLeast`] relation, for diagnostics and tests.
#[must_use]
pub const fn is_stronger_qualified<A, B>() -> bool
where
    A: Qualifier,
    B: Qualifier,
{
    A::READ_ONLY || !B::READ_ONLY
}
