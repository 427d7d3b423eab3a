use std::any::type_name;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::result;

use crate::constants::ERR_EMPTY;
use crate::{
    AtLeast, Bind, BindUncloneable, CloneObject, Coerce, Const, Deep, DestroyObject, Dynamic,
    Error, FromPolicy, Mutable, OffsetCache, Qualifier, Result, TypeInfo, Upcast,
};

/// An owning pointer to one heap object that is known to the holder only through its base `B`,
/// with value semantics.
///
/// The container remembers the exact type of the object it was given, so it can:
///
/// * copy the object as its exact type (if the policy `P` allows copying),
/// * destroy the object as its exact type, even if `B` is a field in the middle of it,
/// * answer whether it holds exactly some type and hand out references of that type.
///
/// The access qualifier `Q` is [`Mutable`] by default. A [`Const`] container only hands out
/// shared references to its object.
///
/// A container is either empty or holds exactly one object. Moving a container (a plain Rust
/// move or [`take()`][Self::take]) never touches the object.
///
/// Containers compare, order and hash by the address of their object, so every object needs an
/// address of its own. Zero-sized types never get one and are rejected at compile time:
///
/// ```compile_fail
/// use poly::{Dynamic, Poly, make, upcast};
///
/// trait Marker: Dynamic {}
///
/// #[derive(Clone)]
/// struct Empty;
///
/// impl Marker for Empty {}
///
/// upcast!(Empty => dyn Marker);
///
/// let marker: Poly<dyn Marker> = make(Empty);
/// ```
///
/// # Example
///
/// ```
/// use poly::{Dynamic, Poly, upcast};
///
/// trait Animal: Dynamic {
///     fn sound(&self) -> String;
/// }
///
/// #[derive(Clone)]
/// struct Dog {
///     name: String,
/// }
///
/// impl Animal for Dog {
///     fn sound(&self) -> String {
///         format!("{} says woof", self.name)
///     }
/// }
///
/// upcast!(Dog => dyn Animal);
///
/// let rex: Poly<dyn Animal> = Poly::new(Box::new(Dog {
///     name: "Rex".to_string(),
/// }));
///
/// // Copies are deep and keep the exact type.
/// let copy = rex.clone();
/// assert!(copy.is::<Dog>());
/// assert_ne!(copy, rex);
///
/// assert_eq!(copy.sound(), "Rex says woof");
/// assert_eq!(rex.downcast_ref::<Dog>().unwrap().name, "Rex");
/// ```
pub struct Poly<B, P = Deep<B>, Q = Mutable>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    ptr: Option<NonNull<B>>,
    policy: P,
    _qualifier: PhantomData<fn() -> Q>,
}

/// A [`Poly`] that only grants shared access to its object.
pub type ConstPoly<B, P = Deep<B>> = Poly<B, P, Const>;

impl<B, P, Q> Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    /// Creates a container that holds nothing.
    #[must_use]
    pub fn empty() -> Self
    where
        P: Default,
    {
        Self {
            ptr: None,
            policy: P::default(),
            _qualifier: PhantomData,
        }
    }

    /// Takes ownership of a boxed object, binding the policy to its exact type `D`.
    ///
    /// If the policy cannot be bound to `D` (for example, a copying policy and a `D` that is not
    /// [`Clone`]), this does not compile. Use [`new_uncloneable()`][Self::new_uncloneable] to
    /// hold such objects in copying containers.
    #[must_use]
    pub fn new<D>(value: Box<D>) -> Self
    where
        D: Upcast<B>,
        P: Bind<B, D>,
    {
        // SAFETY: A `Box<D>` always holds exactly a `D` and we take over the allocation.
        unsafe { Self::from_object(NonNull::from(Box::leak(value)), P::bind()) }
    }

    /// Takes ownership of a boxed object whose type does not implement [`Clone`].
    ///
    /// The container can still be copied at compile time, but copying it fails at runtime with
    /// [`Error::NotCloneable`]; [`Clone::clone`] panics with the same message.
    #[must_use]
    pub fn new_uncloneable<D>(value: Box<D>) -> Self
    where
        D: Upcast<B>,
        P: BindUncloneable<B, D>,
    {
        // SAFETY: A `Box<D>` always holds exactly a `D` and we take over the allocation.
        unsafe { Self::from_object(NonNull::from(Box::leak(value)), P::bind_uncloneable()) }
    }

    /// Takes ownership of an object that has already been boxed as its base type, claiming that
    /// its exact type is `D`.
    ///
    /// # Panics
    ///
    /// Panics if the exact type of the object is not `D`. The object is dropped first.
    #[must_use]
    pub fn adopt<D>(value: Box<B>) -> Self
    where
        B: Dynamic,
        D: Coerce<B>,
        P: Bind<B, D>,
    {
        Self::try_adopt::<D>(value).unwrap_or_else(|error| panic!("{error}"))
    }

    /// Takes ownership of an object that has already been boxed as its base type, claiming that
    /// its exact type is `D`.
    ///
    /// The claim is verified before anything about the object is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the exact type of the object is not `D`. The object
    /// is dropped in that case.
    pub fn try_adopt<D>(value: Box<B>) -> Result<Self>
    where
        B: Dynamic,
        D: Coerce<B>,
        P: Bind<B, D>,
    {
        let actual = Dynamic::dynamic_type(&*value);

        if !actual.is::<D>() {
            return Err(Error::TypeMismatch {
                declared: type_name::<D>(),
                actual: actual.name(),
            });
        }

        let object = NonNull::from(Box::leak(value)).cast::<D>();

        // SAFETY: The box holds exactly a `D` (checked above) and `Coerce` guarantees that the
        // view starts at the object, so the allocation is that of a `Box<D>`.
        Ok(unsafe { Self::from_object(object, P::bind()) })
    }

    // SAFETY: `object` must point to a live `D` allocated as a `Box<D>`, with ownership passing
    // to the container. `policy` must be bound to `D`.
    unsafe fn from_object<D>(object: NonNull<D>, policy: P) -> Self
    where
        D: Upcast<B>,
    {
        // Identity is the address of the allocation and zero-sized boxes do not allocate.
        const {
            assert!(
                size_of::<D>() > 0,
                "a container can only hold objects with a non-zero size"
            );
        }

        // SAFETY: The caller guarantees the object is alive.
        let base = unsafe { <D as Upcast<B>>::upcast(object) };

        // SAFETY: The view was just created from a live object of the bound type.
        debug_assert!(unsafe { policy.exact_type(base) }.is::<D>());

        OffsetCache::<B, D>::record(base, object);

        Self {
            ptr: Some(base),
            policy,
            _qualifier: PhantomData,
        }
    }

    /// Whether the container holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// The exact type of the held object, or `None` if the container is empty.
    #[must_use]
    pub fn exact_type(&self) -> Option<TypeInfo> {
        // SAFETY: We own the object and the policy is bound to its exact type.
        self.ptr.map(|base| unsafe { self.policy.exact_type(base) })
    }

    /// Whether the container holds an object of exactly the type `T`.
    ///
    /// Holding a type that merely implements or contains `T` does not count, and an empty
    /// container holds no type at all.
    #[must_use]
    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.exact_type().is_some_and(|exact| exact.is::<T>())
    }

    /// The held object as its base, or `None` if the container is empty.
    #[must_use]
    pub fn get(&self) -> Option<&B> {
        // SAFETY: The object lives as long as we own it and we only hand out a shared reference
        // tied to a shared borrow of the container.
        self.ptr.map(|base| unsafe { base.as_ref() })
    }

    /// The held object as its exact type `T`, or `None` if it is something else.
    #[must_use]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Upcast<B>,
    {
        let base = self.ptr.filter(|_| self.is::<T>())?;

        // SAFETY: We hold exactly a `T`, whose offset was recorded when we received it.
        let object = unsafe { OffsetCache::<B, T>::downcast(base) };

        // SAFETY: The reference is tied to a shared borrow of the container.
        Some(unsafe { object.as_ref() })
    }

    /// The base pointer of the held object, or `None` if the container is empty.
    ///
    /// The container keeps ownership; the pointer is valid until the container is dropped,
    /// reset or replaced.
    #[must_use]
    pub fn as_ptr(&self) -> Option<NonNull<B>> {
        self.ptr
    }

    /// Copies the held object as its exact type into a new container with the same policy.
    ///
    /// Copying an empty container produces an empty container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCloneable`] if the object was received through
    /// [`new_uncloneable()`][Self::new_uncloneable].
    pub fn try_clone(&self) -> Result<Self>
    where
        P: CloneObject<B> + Clone,
    {
        let ptr = match self.ptr {
            // SAFETY: We own the object and the policy is bound to its exact type.
            Some(base) => Some(unsafe { self.policy.clone_object(base) }?),
            None => None,
        };

        Ok(Self {
            ptr,
            policy: self.policy.clone(),
            _qualifier: PhantomData,
        })
    }

    /// Moves the object into a new container, leaving this one empty.
    #[must_use]
    pub fn take(&mut self) -> Self
    where
        P: Default,
    {
        Self {
            ptr: self.ptr.take(),
            policy: mem::take(&mut self.policy),
            _qualifier: PhantomData,
        }
    }

    /// Gives up ownership of the held object without destroying it, leaving the container empty.
    ///
    /// The object is leaked unless the caller frees it as its exact type.
    #[must_use = "the released object is leaked unless the caller frees it"]
    pub fn release(&mut self) -> Option<NonNull<B>> {
        self.ptr.take()
    }

    /// Destroys the held object, if any, leaving the container empty.
    pub fn reset(&mut self) {
        if let Some(base) = self.ptr.take() {
            // SAFETY: We owned the object and no longer keep any pointer to it.
            unsafe { self.policy.destroy_object(base) };
        }
    }

    /// Replaces the held object with a new one, destroying the old object only after the new
    /// one has been received.
    pub fn replace<D>(&mut self, value: Box<D>)
    where
        D: Upcast<B>,
        P: Bind<B, D>,
    {
        *self = Self::new(value);
    }

    /// Converts the container to a stronger access qualifier without touching the object.
    #[must_use]
    pub fn requalify<Q2>(self) -> Poly<B, P, Q2>
    where
        Q2: AtLeast<Q>,
    {
        let (ptr, policy) = self.into_parts();

        Poly {
            ptr,
            policy,
            _qualifier: PhantomData,
        }
    }

    /// Moves the object into a container with a different policy and a qualifier that is at
    /// least as strong, without copying it.
    #[must_use]
    pub fn convert<P2, Q2>(self) -> Poly<B, P2, Q2>
    where
        P2: FromPolicy<P> + DestroyObject<B>,
        Q2: AtLeast<Q>,
    {
        let (ptr, policy) = self.into_parts();

        Poly {
            ptr,
            policy: P2::from_policy(policy),
            _qualifier: PhantomData,
        }
    }

    /// Copies the object into a container with a different policy and a qualifier that is at
    /// least as strong.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCloneable`] if the object cannot be copied.
    pub fn try_convert_cloned<P2, Q2>(&self) -> Result<Poly<B, P2, Q2>>
    where
        P: CloneObject<B> + Clone,
        P2: FromPolicy<P> + DestroyObject<B>,
        Q2: AtLeast<Q>,
    {
        Ok(self.try_clone()?.convert())
    }

    /// Moves the object, which must be exactly a `D`, into a container over a different base.
    ///
    /// The object keeps its address, so references obtained from the new container see every
    /// change made through the old one. If the container does not hold exactly a `D`, it is
    /// handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns the original container if it is empty or holds something other than a `D`.
    pub fn transform<D, B2, P2, Q2>(self) -> result::Result<Poly<B2, P2, Q2>, Self>
    where
        D: Upcast<B> + Upcast<B2>,
        B2: ?Sized + 'static,
        P2: Bind<B2, D> + DestroyObject<B2>,
        Q2: AtLeast<Q>,
    {
        let Some(base) = self.ptr.filter(|_| self.is::<D>()) else {
            return Err(self);
        };

        // We take over the object, the old policy has nothing left to do.
        let (_, _policy) = self.into_parts();

        // SAFETY: We held exactly a `D`, whose offset was recorded when we received it.
        let object = unsafe { OffsetCache::<B, D>::downcast(base) };

        // SAFETY: Every object a container holds was allocated as a `Box` of its exact type and
        // ownership moves from the old container to the new one.
        Ok(unsafe { Poly::from_object(object, P2::bind()) })
    }

    /// Copies the object, which must be exactly a `D`, into a container over a different base.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotHolding`] if the container is empty or holds something other than
    /// a `D`.
    pub fn transform_cloned<D, B2, P2, Q2>(&self) -> Result<Poly<B2, P2, Q2>>
    where
        D: Clone + Upcast<B> + Upcast<B2>,
        B2: ?Sized + 'static,
        P2: Bind<B2, D> + DestroyObject<B2>,
        Q2: AtLeast<Q>,
    {
        let object = self
            .downcast_ref::<D>()
            .ok_or_else(|| self.not_holding::<D>())?;

        Ok(Poly::new(Box::new(object.clone())))
    }

    fn not_holding<T>(&self) -> Error {
        Error::NotHolding {
            requested: type_name::<T>(),
            held: self.exact_type().map_or("nothing", |exact| exact.name()),
        }
    }

    fn address(&self) -> usize {
        self.ptr
            .map_or(0, |base| base.cast::<u8>().as_ptr().addr())
    }

    fn into_parts(self) -> (Option<NonNull<B>>, P) {
        let this = ManuallyDrop::new(self);

        // SAFETY: `this` is never dropped, so the policy is moved out exactly once.
        let policy = unsafe { ptr::read(&this.policy) };

        (this.ptr, policy)
    }
}

impl<B, P> Poly<B, P, Mutable>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    /// The held object as its base, or `None` if the container is empty.
    #[must_use]
    pub fn get_mut(&mut self) -> Option<&mut B> {
        // SAFETY: The object lives as long as we own it and the reference is tied to an
        // exclusive borrow of the container.
        self.ptr.map(|mut base| unsafe { base.as_mut() })
    }

    /// The held object as its exact type `T`, or `None` if it is something else.
    #[must_use]
    pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Upcast<B>,
    {
        let base = self.ptr.filter(|_| self.is::<T>())?;

        // SAFETY: We hold exactly a `T`, whose offset was recorded when we received it.
        let mut object = unsafe { OffsetCache::<B, T>::downcast(base) };

        // SAFETY: The reference is tied to an exclusive borrow of the container.
        Some(unsafe { object.as_mut() })
    }

    /// Unwraps the object as its exact type `D`.
    ///
    /// # Errors
    ///
    /// Returns the container unchanged if it is empty or holds something other than a `D`.
    pub fn into_box<D>(self) -> result::Result<Box<D>, Self>
    where
        D: Upcast<B>,
    {
        let Some(base) = self.ptr.filter(|_| self.is::<D>()) else {
            return Err(self);
        };

        let (_, _policy) = self.into_parts();

        // SAFETY: We held exactly a `D`, whose offset was recorded when we received it.
        let object = unsafe { OffsetCache::<B, D>::downcast(base) };

        // SAFETY: The object was allocated as a `Box<D>` and we hand over our ownership.
        Ok(unsafe { Box::from_raw(object.as_ptr()) })
    }
}

/// Allocates `value` and places it in a container over the base `B`.
///
/// ```
/// use poly::{Dynamic, Poly, make, upcast};
///
/// trait Unit: Dynamic {
///     fn symbol(&self) -> &'static str;
/// }
///
/// #[derive(Clone)]
/// struct Meter {
///     scale: f64,
/// }
///
/// impl Unit for Meter {
///     fn symbol(&self) -> &'static str {
///         if self.scale == 1000.0 { "km" } else { "m" }
///     }
/// }
///
/// upcast!(Meter => dyn Unit);
///
/// let unit: Poly<dyn Unit> = make(Meter { scale: 1.0 });
/// assert_eq!(unit.symbol(), "m");
/// ```
#[must_use]
pub fn make<B, P, Q, D>(value: D) -> Poly<B, P, Q>
where
    B: ?Sized + 'static,
    D: Upcast<B>,
    P: Bind<B, D> + DestroyObject<B>,
    Q: Qualifier,
{
    Poly::new(Box::new(value))
}

/// Moves the object, which must be exactly a `D`, from `source` into a container over a
/// different base. See [`Poly::transform()`].
///
/// # Errors
///
/// Returns `source` unchanged if it is empty or holds something other than a `D`.
pub fn transform<D, B2, P2, Q2, B, P, Q>(
    source: Poly<B, P, Q>,
) -> result::Result<Poly<B2, P2, Q2>, Poly<B, P, Q>>
where
    D: Upcast<B> + Upcast<B2>,
    B: ?Sized + 'static,
    B2: ?Sized + 'static,
    P: DestroyObject<B>,
    P2: Bind<B2, D> + DestroyObject<B2>,
    Q: Qualifier,
    Q2: AtLeast<Q>,
{
    source.transform::<D, B2, P2, Q2>()
}

impl<B, P, Q> Drop for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    fn drop(&mut self) {
        self.reset();
    }
}

impl<B, P, Q> Default for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B> + Default,
    Q: Qualifier,
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<B, P, Q> Clone for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: CloneObject<B> + DestroyObject<B> + Clone,
    Q: Qualifier,
{
    /// # Panics
    ///
    /// Panics if the object was received through [`Poly::new_uncloneable()`]. Use
    /// [`Poly::try_clone()`] to handle that case.
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|error| panic!("{error}"))
    }
}

impl<B, P> From<Poly<B, P, Mutable>> for Poly<B, P, Const>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    fn from(value: Poly<B, P, Mutable>) -> Self {
        value.requalify()
    }
}

impl<B, P, Q, P2, Q2> TryFrom<&Poly<B, P, Q>> for Poly<B, P2, Q2>
where
    B: ?Sized + 'static,
    P: CloneObject<B> + DestroyObject<B> + Clone,
    Q: Qualifier,
    P2: FromPolicy<P> + DestroyObject<B>,
    Q2: AtLeast<Q>,
{
    type Error = Error;

    fn try_from(value: &Poly<B, P, Q>) -> Result<Self> {
        value.try_convert_cloned()
    }
}

impl<B, P, Q> Deref for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    type Target = B;

    fn deref(&self) -> &B {
        self.get().expect(ERR_EMPTY)
    }
}

impl<B, P> DerefMut for Poly<B, P, Mutable>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    fn deref_mut(&mut self) -> &mut B {
        self.get_mut().expect(ERR_EMPTY)
    }
}

impl<B, P, Q, P2, Q2> PartialEq<Poly<B, P2, Q2>> for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
    P2: DestroyObject<B>,
    Q2: Qualifier,
{
    fn eq(&self, other: &Poly<B, P2, Q2>) -> bool {
        self.address() == other.address()
    }
}

impl<B, P, Q> Eq for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
}

impl<B, P, Q, P2, Q2> PartialOrd<Poly<B, P2, Q2>> for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
    P2: DestroyObject<B>,
    Q2: Qualifier,
{
    fn partial_cmp(&self, other: &Poly<B, P2, Q2>) -> Option<Ordering> {
        Some(self.address().cmp(&other.address()))
    }
}

impl<B, P, Q> Ord for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

impl<B, P, Q> Hash for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl<B, P, Q> fmt::Debug for Poly<B, P, Q>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
    Q: Qualifier,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poly")
            .field("base", &type_name::<B>())
            .field("exact_type", &self.exact_type())
            .field("address", &format_args!("{:#x}", self.address()))
            .finish()
    }
}

// SAFETY: The container owns its object exclusively, like a `Box<B>` does, so moving it to
// another thread is fine as long as the object and the policy can move there. `B: Send` covers
// the whole object: a trait object view carries the auto traits of the object it was coerced
// from, and `OffsetDelete` only binds to objects that are `Send` and `Sync`.
unsafe impl<B, P, Q> Send for Poly<B, P, Q>
where
    B: ?Sized + Send + 'static,
    P: DestroyObject<B> + Send,
    Q: Qualifier,
{
}

// SAFETY: Shared access only hands out `&B`, `&D` and calls `&self` methods of the policy, so
// sharing the container is fine as long as the object and the policy can be shared. `B: Sync`
// covers the whole object for the same reasons as for `Send`.
unsafe impl<B, P, Q> Sync for Poly<B, P, Q>
where
    B: ?Sized + Sync + 'static,
    P: DestroyObject<B> + Sync,
    Q: Qualifier,
{
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use static_assertions::{assert_eq_size, assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{DeepOffset, Unique, UniqueOffset};

    trait Shape: Dynamic + Send + Sync {
        fn corners(&self) -> u32;
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Square {
        side: u32,
    }

    impl Shape for Square {
        fn corners(&self) -> u32 {
            4
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Triangle(u32);

    impl Shape for Triangle {
        fn corners(&self) -> u32 {
            self.0
        }
    }

    #[derive(Debug)]
    struct Lock {
        drops: Arc<AtomicUsize>,
    }

    impl Shape for Lock {
        fn corners(&self) -> u32 {
            0
        }
    }

    impl Drop for Lock {
        fn drop(&mut self) {
            self.drops.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    // Only ever named as a claimed type that does not match, so no offset is recorded for it.
    #[allow(dead_code, reason = "only named as a claimed type, never constructed")]
    struct Pentagon(u32);

    impl Shape for Pentagon {
        fn corners(&self) -> u32 {
            5
        }
    }

    #[derive(Debug)]
    struct Fragile(u32);

    impl Clone for Fragile {
        fn clone(&self) -> Self {
            panic!("refusing to copy");
        }
    }

    impl Shape for Fragile {
        fn corners(&self) -> u32 {
            self.0
        }
    }

    crate::upcast!(Square => dyn Shape);
    crate::upcast!(Triangle => dyn Shape);
    crate::upcast!(Lock => dyn Shape);
    crate::upcast!(Pentagon => dyn Shape);
    crate::upcast!(Fragile => dyn Shape);

    #[derive(Clone, Debug, PartialEq)]
    struct Label {
        text: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Sign {
        height: u64,
        label: Label,
    }

    impl Shape for Sign {
        fn corners(&self) -> u32 {
            8
        }
    }

    crate::upcast!(Sign => dyn Shape);
    crate::upcast_field!(Sign, label: Label);

    assert_eq_size!(Poly<dyn Shape, Unique>, Box<dyn Shape>);
    assert_eq_size!(Poly<dyn Shape>, [usize; 3]);

    assert_impl_all!(Poly<dyn Shape>: Clone, Send, Sync, Default);
    assert_impl_all!(Poly<dyn Shape, Unique>: Send, Sync, Default);
    assert_impl_all!(Poly<Label, DeepOffset<Label>>: Clone);
    assert_not_impl_any!(Poly<dyn Shape, Unique>: Clone);
    assert_not_impl_any!(Poly<dyn Dynamic>: Send, Sync);
    assert_not_impl_any!(ConstPoly<dyn Shape>: DerefMut);
    assert_not_impl_any!(Poly<dyn Shape, Unique, Mutable>: From<Poly<dyn Shape, Unique, Const>>);

    #[test]
    fn empty_holds_nothing() {
        let poly = Poly::<dyn Shape>::empty();

        assert!(poly.is_empty());
        assert!(poly.get().is_none());
        assert!(poly.exact_type().is_none());
        assert!(!poly.is::<Square>());
        assert!(poly.as_ptr().is_none());
        assert_eq!(poly, Poly::<dyn Shape, Unique>::default());
    }

    #[test]
    #[should_panic(expected = "empty container")]
    fn deref_of_empty_panics() {
        let poly = Poly::<dyn Shape>::default();

        _ = poly.corners();
    }

    #[test]
    fn new_holds_exact_type() {
        let poly: Poly<dyn Shape> = Poly::new(Box::new(Square { side: 2 }));

        assert!(!poly.is_empty());
        assert!(poly.is::<Square>());
        assert!(!poly.is::<Triangle>());
        assert!(!poly.is::<dyn Shape>());
        assert_eq!(poly.corners(), 4);
        assert_eq!(poly.exact_type(), Some(TypeInfo::of::<Square>()));
        assert_eq!(poly.downcast_ref::<Square>(), Some(&Square { side: 2 }));
        assert!(poly.downcast_ref::<Triangle>().is_none());
    }

    #[test]
    fn clone_is_deep() {
        let original: Poly<dyn Shape> = make(Square { side: 5 });

        let copy = original.clone();

        assert!(copy.is::<Square>());
        assert_ne!(copy, original);
        assert_eq!(copy.downcast_ref::<Square>(), original.downcast_ref::<Square>());
    }

    #[test]
    fn clone_of_empty_is_empty() {
        let original = Poly::<dyn Shape>::empty();

        assert!(original.clone().is_empty());
    }

    #[test]
    fn clone_from_replaces_object() {
        let source: Poly<dyn Shape> = make(Triangle(3));
        let mut target: Poly<dyn Shape> = make(Square { side: 1 });

        target.clone_from(&source);

        assert!(target.is::<Triangle>());
        assert_ne!(target, source);
    }

    #[test]
    fn clone_from_keeps_target_when_copy_panics() {
        let drops = Arc::new(AtomicUsize::new(0));
        let source: Poly<dyn Shape> = make(Fragile(1));
        let mut target: Poly<dyn Shape> = Poly::new_uncloneable(Box::new(Lock {
            drops: Arc::clone(&drops),
        }));
        let address = target.as_ptr();

        let result = panic::catch_unwind(AssertUnwindSafe(|| target.clone_from(&source)));

        assert!(result.is_err());
        assert!(target.is::<Lock>());
        assert_eq!(target.as_ptr(), address);
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 0);
    }

    #[test]
    fn uncloneable_object_fails_to_copy() {
        let drops = Arc::new(AtomicUsize::new(0));
        let poly: Poly<dyn Shape> = Poly::new_uncloneable(Box::new(Lock {
            drops: Arc::clone(&drops),
        }));

        let error = poly.try_clone().unwrap_err();
        assert!(matches!(error, Error::NotCloneable { .. }));
        assert!(error.to_string().contains("Lock"));

        drop(poly);
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    #[should_panic(expected = "not cloneable")]
    fn clone_of_uncloneable_object_panics() {
        let poly: Poly<dyn Shape> = Poly::new_uncloneable(Box::new(Lock {
            drops: Arc::new(AtomicUsize::new(0)),
        }));

        _ = poly.clone();
    }

    #[test]
    fn take_moves_without_copying() {
        let mut source: Poly<dyn Shape, Unique> = make(Square { side: 3 });
        let address = source.as_ptr();

        let destination = source.take();

        assert!(source.is_empty());
        assert_eq!(destination.as_ptr(), address);
        assert!(destination.is::<Square>());
    }

    #[test]
    fn reset_destroys_object() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut poly: Poly<dyn Shape, Unique> = make(Lock {
            drops: Arc::clone(&drops),
        });

        poly.reset();
        assert!(poly.is_empty());
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);

        poly.reset();
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn replace_destroys_old_object() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut poly: Poly<dyn Shape, Unique> = make(Lock {
            drops: Arc::clone(&drops),
        });

        poly.replace(Box::new(Triangle(3)));

        assert!(poly.is::<Triangle>());
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn release_gives_up_ownership() {
        let mut poly: Poly<dyn Shape, Unique> = make(Square { side: 9 });

        let released = poly.release().unwrap();
        assert!(poly.is_empty());

        // SAFETY: The object was allocated as a box and coerced to the trait object in place.
        let boxed = unsafe { Box::from_raw(released.as_ptr()) };
        assert_eq!(boxed.corners(), 4);
    }

    #[test]
    fn adopt_accepts_matching_type() {
        let boxed: Box<dyn Shape> = Box::new(Square { side: 4 });

        let poly = Poly::<dyn Shape>::try_adopt::<Square>(boxed).unwrap();

        assert!(poly.is::<Square>());
        assert_eq!(poly.clone().downcast_ref::<Square>().unwrap().side, 4);
    }

    #[test]
    fn adopt_rejects_other_type_and_drops_it() {
        let drops = Arc::new(AtomicUsize::new(0));
        let boxed: Box<dyn Shape> = Box::new(Lock {
            drops: Arc::clone(&drops),
        });

        let error = Poly::<dyn Shape, Unique>::try_adopt::<Square>(boxed).unwrap_err();

        assert!(matches!(
            error,
            Error::TypeMismatch { declared, actual }
                if declared.ends_with("Square") && actual.ends_with("Lock")
        ));
        assert_eq!(drops.load(AtomicOrdering::Relaxed), 1);
    }

    #[test]
    fn rejected_adopt_records_no_offset() {
        let boxed: Box<dyn Shape> = Box::new(Square { side: 2 });

        _ = Poly::<dyn Shape, Unique>::try_adopt::<Pentagon>(boxed).unwrap_err();

        assert!(OffsetCache::<dyn Shape, Pentagon>::get().is_none());
    }

    #[test]
    #[should_panic(expected = "must hold an object of exactly that type")]
    fn adopt_panics_on_mismatch() {
        let boxed: Box<dyn Shape> = Box::new(Triangle(3));

        _ = Poly::<dyn Shape, Unique>::adopt::<Square>(boxed);
    }

    #[test]
    fn downcast_mut_changes_object() {
        let mut poly: Poly<dyn Shape> = make(Square { side: 1 });

        poly.downcast_mut::<Square>().unwrap().side = 10;

        assert_eq!(poly.downcast_ref::<Square>().unwrap().side, 10);
        assert!(poly.downcast_mut::<Triangle>().is_none());
    }

    #[test]
    fn into_box_returns_exact_object() {
        let poly: Poly<dyn Shape> = make(Square { side: 6 });

        let poly = poly.into_box::<Triangle>().unwrap_err();
        let square = poly.into_box::<Square>().unwrap();

        assert_eq!(*square, Square { side: 6 });
    }

    #[test]
    fn requalify_keeps_object() {
        let poly: Poly<dyn Shape> = make(Triangle(3));
        let address = poly.as_ptr();

        let constant: ConstPoly<dyn Shape> = poly.into();

        assert_eq!(constant.as_ptr(), address);
        assert_eq!(constant.corners(), 3);
        assert_eq!(constant.downcast_ref::<Triangle>(), Some(&Triangle(3)));
    }

    #[test]
    fn convert_drops_clone_capability() {
        let deep: Poly<dyn Shape> = make(Square { side: 8 });
        let address = deep.as_ptr();

        let unique: Poly<dyn Shape, Unique, Const> = deep.convert();

        assert_eq!(unique.as_ptr(), address);
        assert!(unique.is::<Square>());
    }

    #[test]
    fn try_from_reference_copies() {
        let deep: Poly<dyn Shape> = make(Square { side: 8 });

        let copy = ConstPoly::<dyn Shape, Unique>::try_from(&deep).unwrap();

        assert_ne!(copy, deep);
        assert_eq!(copy.downcast_ref::<Square>(), deep.downcast_ref::<Square>());
    }

    #[test]
    fn field_view_round_trips() {
        let mut poly: Poly<Label, DeepOffset<Label>> = make(Sign {
            height: 200,
            label: Label {
                text: "stop".to_string(),
            },
        });

        assert_eq!(poly.text, "stop");
        assert!(poly.is::<Sign>());
        assert!(!poly.is::<Label>());

        poly.text.push('!');

        let copy = poly.clone();
        let sign = copy.downcast_ref::<Sign>().unwrap();
        assert_eq!(sign.height, 200);
        assert_eq!(sign.label.text, "stop!");

        let sign = poly.into_box::<Sign>().unwrap();
        assert_eq!(sign.label.text, "stop!");
    }

    #[test]
    fn transform_moves_between_bases() {
        let sign: Poly<dyn Shape> = make(Sign {
            height: 1,
            label: Label {
                text: "yield".to_string(),
            },
        });

        let label = sign
            .transform_cloned::<Sign, Label, DeepOffset<Label>, Mutable>()
            .unwrap();
        assert_eq!(label.text, "yield");

        let exact = label.transform::<Sign, Sign, Deep<Sign>, Mutable>().unwrap();
        assert_eq!(exact.height, 1);

        let poly = exact
            .transform::<Sign, dyn Shape, Deep<dyn Shape>, Const>()
            .unwrap();

        assert!(poly.is::<Sign>());
        assert_eq!(poly.corners(), 8);
        assert!(sign.is::<Sign>());
        assert_ne!(poly, sign);
    }

    #[test]
    fn transform_of_wrong_type_returns_source() {
        let source: Poly<dyn Shape, Unique> = make(Triangle(3));
        let address = source.as_ptr();

        let source = transform::<Square, Square, UniqueOffset<Square>, Mutable, _, _, _>(source)
            .unwrap_err();

        assert_eq!(source.as_ptr(), address);
    }

    #[test]
    fn transform_cloned_of_empty_reports_nothing() {
        let source = Poly::<dyn Shape>::empty();

        let error = source
            .transform_cloned::<Square, Square, DeepOffset<Square>, Const>()
            .unwrap_err();

        assert!(error.to_string().ends_with("holds nothing"));
    }

    #[test]
    fn compares_and_hashes_by_address() {
        let empty = Poly::<dyn Shape>::empty();
        let first: Poly<dyn Shape> = make(Triangle(3));
        let second = first.clone();
        let first_unique: Poly<dyn Shape, Unique, Const> = first.clone().convert();

        assert!(empty < first);
        assert!(empty < second);
        assert_ne!(first, second);
        assert_eq!(first.cmp(&second), first.address().cmp(&second.address()));
        assert_ne!(first, first_unique);

        let set: HashSet<_> = [first.clone(), first.clone(), empty.clone()]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn debug_shows_exact_type() {
        let poly: Poly<dyn Shape> = make(Triangle(3));

        let text = format!("{poly:?}");

        assert!(text.contains("Triangle"));
        assert!(text.contains("dyn"));
    }
}
