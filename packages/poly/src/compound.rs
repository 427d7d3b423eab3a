use std::ptr::NonNull;

use crate::{
    CloneObject, DeepClone, DestroyObject, NoClone, OffsetDelete, Result, TypeInfo, VirtualDelete,
};

/// Creates a policy bound to the exact type `D` of an object viewed as `B`.
///
/// A policy that needs nothing from `D` implements this for every `D`. A policy that needs a
/// capability of `D` (such as [`Clone`]) implements it only where `D` has that capability, so
/// binding an unsuitable type is a compile-time error.
pub trait Bind<B, D>: Sized
where
    B: ?Sized,
{
    /// Returns the policy bound to `D`.
    fn bind() -> Self;
}

/// Creates a policy bound to an exact type `D` that does not implement [`Clone`].
///
/// Clone policies bound this way refuse to copy at runtime instead of refusing to compile.
pub trait BindUncloneable<B, D>: Sized
where
    B: ?Sized,
{
    /// Returns the policy bound to `D`, with copying disabled.
    fn bind_uncloneable() -> Self;
}

/// Converts a policy into another policy bound to the same exact type.
///
/// Used when a container changes its policy without changing its object. Conversions can only
/// drop capabilities (for example, [`NoClone`] from [`DeepClone`]), never invent them.
pub trait FromPolicy<P>: Sized {
    /// Converts `policy` into `Self`.
    fn from_policy(policy: P) -> Self;
}

/// A policy made of one clone policy and one destroy policy.
///
/// Each part binds, clones and destroys through its own implementation. Stateless parts are
/// zero-sized, so the compound is never larger than its stateful parts.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compound<C, X> {
    cloner: C,
    destroyer: X,
}

impl<C, X> Compound<C, X> {
    /// The clone policy of this compound.
    #[must_use]
    pub fn cloner(&self) -> &C {
        &self.cloner
    }

    /// The destroy policy of this compound.
    #[must_use]
    pub fn destroyer(&self) -> &X {
        &self.destroyer
    }
}

impl<B, D, C, X> Bind<B, D> for Compound<C, X>
where
    B: ?Sized,
    C: Bind<B, D>,
    X: Bind<B, D>,
{
    fn bind() -> Self {
        Self {
            cloner: C::bind(),
            destroyer: X::bind(),
        }
    }
}

impl<B, D, C, X> BindUncloneable<B, D> for Compound<C, X>
where
    B: ?Sized,
    C: BindUncloneable<B, D>,
    X: Bind<B, D>,
{
    fn bind_uncloneable() -> Self {
        Self {
            cloner: C::bind_uncloneable(),
            destroyer: X::bind(),
        }
    }
}

impl<C, X, C2, X2> FromPolicy<Compound<C, X>> for Compound<C2, X2>
where
    C2: FromPolicy<C>,
    X2: FromPolicy<X>,
{
    fn from_policy(policy: Compound<C, X>) -> Self {
        Self {
            cloner: C2::from_policy(policy.cloner),
            destroyer: X2::from_policy(policy.destroyer),
        }
    }
}

impl<B, C, X> CloneObject<B> for Compound<C, X>
where
    B: ?Sized,
    C: CloneObject<B>,
{
    unsafe fn clone_object(&self, base: NonNull<B>) -> Result<NonNull<B>> {
        // SAFETY: Forwarding the guarantees of our caller.
        unsafe { self.cloner.clone_object(base) }
    }
}

impl<B, C, X> DestroyObject<B> for Compound<C, X>
where
    B: ?Sized,
    X: DestroyObject<B>,
{
    unsafe fn destroy_object(&self, base: NonNull<B>) {
        // SAFETY: Forwarding the guarantees of our caller.
        unsafe { self.destroyer.destroy_object(base) }
    }

    unsafe fn exact_type(&self, base: NonNull<B>) -> TypeInfo {
        // SAFETY: Forwarding the guarantees of our caller.
        unsafe { self.destroyer.exact_type(base) }
    }
}

/// Move-only ownership of an object behind a trait object base.
pub type Unique = Compound<NoClone, VirtualDelete>;

/// Copyable ownership of an object behind a trait object base. This is the default policy.
pub type Deep<B> = Compound<DeepClone<B>, VirtualDelete>;

/// Move-only ownership of an object behind any base, including a field at a non-zero offset.
pub type UniqueOffset<B> = Compound<NoClone, OffsetDelete<B>>;

/// Copyable ownership of an object behind any base, including a field at a non-zero offset.
pub type DeepOffset<B> = Compound<DeepClone<B>, OffsetDelete<B>>;
