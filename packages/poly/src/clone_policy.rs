use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

use crate::constants::ERR_UNBOUND_POLICY;
use crate::{Bind, BindUncloneable, Error, FromPolicy, OffsetCache, Result, Upcast};

/// Copies the object behind a base pointer, producing a new, independently owned object of
/// the same exact type.
pub trait CloneObject<B>
where
    B: ?Sized,
{
    /// Allocates a copy of the object that `base` views and returns the `B` view of the copy.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `base` is the `B` view of a live object of the exact type
    /// this policy was bound to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCloneable`] if the policy was bound to a type that cannot be copied.
    unsafe fn clone_object(&self, base: NonNull<B>) -> Result<NonNull<B>>;
}

/// A clone policy for containers that can never be copied.
///
/// This policy deliberately does not implement [`CloneObject`], so any attempt to copy a
/// container that uses it fails to compile:
///
/// ```compile_fail
/// use poly::{Dynamic, Poly, Unique, upcast};
///
/// trait Port: Dynamic {}
///
/// #[derive(Clone)]
/// struct Serial {
///     baud: u32,
/// }
///
/// impl Port for Serial {}
///
/// upcast!(Serial => dyn Port);
///
/// let original: Poly<dyn Port, Unique> = Poly::new(Box::new(Serial { baud: 9600 }));
/// let copy = original.clone();
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct NoClone;

impl<B, D> Bind<B, D> for NoClone
where
    B: ?Sized,
{
    fn bind() -> Self {
        Self
    }
}

impl<B, D> BindUncloneable<B, D> for NoClone
where
    B: ?Sized,
{
    fn bind_uncloneable() -> Self {
        Self
    }
}

impl FromPolicy<Self> for NoClone {
    fn from_policy(policy: Self) -> Self {
        policy
    }
}

impl<B> FromPolicy<DeepClone<B>> for NoClone
where
    B: ?Sized,
{
    fn from_policy(_policy: DeepClone<B>) -> Self {
        Self
    }
}

type CloneFn<B> = unsafe fn(NonNull<B>) -> Result<NonNull<B>>;

/// A clone policy that copies the held object with the [`Clone`] implementation of its exact
/// type, even though the container only knows it as a `B`.
///
/// The policy is one function pointer, bound when the container first receives an object.
/// Types that do not implement [`Clone`] can still be held by binding the policy with
/// [`BindUncloneable`], in which case copying fails at runtime with
/// [`Error::NotCloneable`] instead of at compile time.
pub struct DeepClone<B>
where
    B: ?Sized,
{
    clone_fn: Option<CloneFn<B>>,
}

impl<B, D> Bind<B, D> for DeepClone<B>
where
    B: ?Sized + 'static,
    D: Clone + Upcast<B>,
{
    fn bind() -> Self {
        Self {
            clone_fn: Some(clone_as::<B, D>),
        }
    }
}

impl<B, D> BindUncloneable<B, D> for DeepClone<B>
where
    B: ?Sized + 'static,
    D: Upcast<B>,
{
    fn bind_uncloneable() -> Self {
        Self {
            clone_fn: Some(refuse_clone::<B, D>),
        }
    }
}

impl<B> CloneObject<B> for DeepClone<B>
where
    B: ?Sized,
{
    unsafe fn clone_object(&self, base: NonNull<B>) -> Result<NonNull<B>> {
        let clone_fn = self.clone_fn.expect(ERR_UNBOUND_POLICY);

        // SAFETY: The function was bound to the exact type of the object, which the caller
        // guarantees `base` views.
        unsafe { clone_fn(base) }
    }
}

impl<B> FromPolicy<Self> for DeepClone<B>
where
    B: ?Sized,
{
    fn from_policy(policy: Self) -> Self {
        policy
    }
}

impl<B> Default for DeepClone<B>
where
    B: ?Sized,
{
    fn default() -> Self {
        Self { clone_fn: None }
    }
}

impl<B> Clone for DeepClone<B>
where
    B: ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for DeepClone<B> where B: ?Sized {}

impl<B> fmt::Debug for DeepClone<B>
where
    B: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("bound", &self.clone_fn.is_some())
            .finish()
    }
}

// SAFETY: `base` must be the `B` view of a live `D` whose offset has been recorded.
unsafe fn clone_as<B, D>(base: NonNull<B>) -> Result<NonNull<B>>
where
    B: ?Sized + 'static,
    D: Clone + Upcast<B>,
{
    // SAFETY: Forwarding the guarantee from our caller.
    let original = unsafe { OffsetCache::<B, D>::downcast(base) };

    // SAFETY: The original is alive for the duration of this call and we only read from it.
    let copy = unsafe { original.as_ref() }.clone();

    let copy = NonNull::from(Box::leak(Box::new(copy)));

    // SAFETY: The copy was just allocated and is alive.
    Ok(unsafe { <D as Upcast<B>>::upcast(copy) })
}

fn refuse_clone<B, D>(_base: NonNull<B>) -> Result<NonNull<B>>
where
    B: ?Sized,
{
    Err(Error::NotCloneable {
        base: type_name::<B>(),
        derived: type_name::<D>(),
    })
}
