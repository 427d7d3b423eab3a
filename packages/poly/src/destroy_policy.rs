use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

use crate::constants::ERR_UNBOUND_POLICY;
use crate::{Bind, Coerce, Dynamic, FromPolicy, OffsetCache, TypeInfo, Upcast};

/// Destroys the object behind a base pointer and reports its exact type.
///
/// Both operations need to know the exact type of the object, so they live on the same policy.
pub trait DestroyObject<B>
where
    B: ?Sized,
{
    /// Drops the object that `base` views and frees its allocation.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// 1. `base` is the `B` view of a live, uniquely owned object of the exact type this policy
    ///    was bound to, allocated as a `Box` of that type.
    /// 2. Neither the object nor `base` is used after this call.
    unsafe fn destroy_object(&self, base: NonNull<B>);

    /// The exact type of the object that `base` views.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `base` is the `B` view of a live object of the exact type
    /// this policy was bound to.
    unsafe fn exact_type(&self, base: NonNull<B>) -> TypeInfo;
}

/// A destroy policy that drops the object through its base view, relying on the vtable of a
/// trait object base to reach the destructor of the exact type.
///
/// Only objects whose base view covers the whole object (see [`Coerce`]) can be bound to this
/// policy. The base must implement [`Dynamic`] so the exact type can be read from the vtable.
#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualDelete;

impl<B, D> Bind<B, D> for VirtualDelete
where
    B: ?Sized + Dynamic,
    D: Coerce<B>,
{
    fn bind() -> Self {
        Self
    }
}

impl<B> DestroyObject<B> for VirtualDelete
where
    B: ?Sized + Dynamic,
{
    unsafe fn destroy_object(&self, base: NonNull<B>) {
        // SAFETY: The caller guarantees we own the object and that it was allocated as a box of
        // its exact type. `Coerce` guarantees a `Box<B>` of the view frees exactly that box.
        drop(unsafe { Box::from_raw(base.as_ptr()) });
    }

    unsafe fn exact_type(&self, base: NonNull<B>) -> TypeInfo {
        // SAFETY: The caller guarantees the object is alive.
        Dynamic::dynamic_type(unsafe { base.as_ref() })
    }
}

impl FromPolicy<Self> for VirtualDelete {
    fn from_policy(policy: Self) -> Self {
        policy
    }
}

/// What an [`OffsetDelete`] policy needs to know about the exact type it was bound to.
struct DestroyBinding<B>
where
    B: ?Sized + 'static,
{
    exact_type: fn() -> TypeInfo,
    destroy: unsafe fn(NonNull<B>),
}

trait HasDestroyBinding<B>
where
    B: ?Sized + 'static,
{
    const BINDING: &'static DestroyBinding<B>;
}

impl<B, D> HasDestroyBinding<B> for D
where
    B: ?Sized + 'static,
    D: Upcast<B>,
{
    const BINDING: &'static DestroyBinding<B> = &DestroyBinding {
        exact_type: TypeInfo::of::<D>,
        destroy: destroy_as::<B, D>,
    };
}

/// A destroy policy that converts the base view back to the exact type through the
/// [`OffsetCache`] before dropping the object.
///
/// This works for every [`Upcast`] relation, including views of fields at a non-zero offset
/// that cannot be freed through the view itself. The policy is a single reference to a static
/// table generated for the exact type it is bound to.
///
/// The exact type must be [`Send`] and [`Sync`], because a container over a field view is as
/// thread-safe as the field, not as the object around it:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use poly::{Poly, UniqueOffset, make, upcast_field};
///
/// struct Holder {
///     shared: Rc<u32>,
///     header: u32,
/// }
///
/// upcast_field!(Holder, header: u32);
///
/// let holder: Poly<u32, UniqueOffset<u32>> = make(Holder {
///     shared: Rc::new(1),
///     header: 2,
/// });
/// ```
pub struct OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    binding: Option<&'static DestroyBinding<B>>,
}

impl<B> OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    fn binding(&self) -> &'static DestroyBinding<B> {
        self.binding.expect(ERR_UNBOUND_POLICY)
    }
}

// A field view says nothing about the thread safety of the rest of the object, while the
// container is `Send` and `Sync` whenever the view is. Only objects that are both can be bound.
impl<B, D> Bind<B, D> for OffsetDelete<B>
where
    B: ?Sized + 'static,
    D: Upcast<B> + Send + Sync,
{
    fn bind() -> Self {
        Self {
            binding: Some(<D as HasDestroyBinding<B>>::BINDING),
        }
    }
}

impl<B> DestroyObject<B> for OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    unsafe fn destroy_object(&self, base: NonNull<B>) {
        // SAFETY: Forwarding the guarantees of our caller to a function bound to the exact type.
        unsafe { (self.binding().destroy)(base) }
    }

    unsafe fn exact_type(&self, _base: NonNull<B>) -> TypeInfo {
        (self.binding().exact_type)()
    }
}

impl<B> FromPolicy<Self> for OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    fn from_policy(policy: Self) -> Self {
        policy
    }
}

impl<B> Default for OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    fn default() -> Self {
        Self { binding: None }
    }
}

impl<B> Clone for OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for OffsetDelete<B> where B: ?Sized + 'static {}

impl<B> fmt::Debug for OffsetDelete<B>
where
    B: ?Sized + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct(type_name::<Self>());

        match self.binding {
            Some(binding) => debug.field("exact_type", &(binding.exact_type)()),
            None => debug.field("exact_type", &format_args!("unbound")),
        };

        debug.finish()
    }
}

// SAFETY: `base` must be the `B` view of a live, boxed `D` whose offset has been recorded.
unsafe fn destroy_as<B, D>(base: NonNull<B>)
where
    B: ?Sized + 'static,
    D: Upcast<B>,
{
    // SAFETY: Forwarding the guarantee from our caller.
    let object = unsafe { OffsetCache::<B, D>::downcast(base) };

    // SAFETY: The object was allocated as a `Box<D>` and the caller hands over ownership.
    drop(unsafe { Box::from_raw(object.as_ptr()) });
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::{assert_eq_size, assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_eq_size!(OffsetDelete<dyn Dynamic>, usize);
    assert_eq_size!(VirtualDelete, ());

    assert_impl_all!(OffsetDelete<u32>: DestroyObject<u32>, Send, Sync, Copy);
    assert_impl_all!(VirtualDelete: DestroyObject<dyn Dynamic>, Send, Sync, Copy);
    assert_impl_all!(OffsetDelete<u64>: Bind<u64, Counted>);
    assert_not_impl_any!(OffsetDelete<u32>: Bind<u32, LocalOnly>);

    struct Counted {
        drops: Arc<AtomicUsize>,
        marker: u64,
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::Relaxed);
        }
    }

    crate::upcast!(Counted => dyn Dynamic);
    crate::upcast_field!(Counted, marker: u64);

    // Not `Send` or `Sync`, while its field is both.
    #[allow(dead_code, reason = "only the type matters")]
    struct LocalOnly {
        shared: Rc<u32>,
        header: u32,
    }

    crate::upcast_field!(LocalOnly, header: u32);

    fn boxed(drops: &Arc<AtomicUsize>) -> NonNull<Counted> {
        NonNull::from(Box::leak(Box::new(Counted {
            drops: Arc::clone(drops),
            marker: 17,
        })))
    }

    #[test]
    fn virtual_delete_drops_through_trait_object() {
        let drops = Arc::new(AtomicUsize::new(0));
        let object = boxed(&drops);

        let base: NonNull<dyn Dynamic> = object;
        let policy = <VirtualDelete as Bind<dyn Dynamic, Counted>>::bind();

        // SAFETY: `base` views a live counted object.
        assert!(unsafe { policy.exact_type(base) }.is::<Counted>());

        // SAFETY: We own the object and never use it again.
        unsafe { policy.destroy_object(base) };

        assert_eq!(drops.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn offset_delete_drops_through_field_view() {
        let drops = Arc::new(AtomicUsize::new(0));
        let object = boxed(&drops);

        // SAFETY: `object` is live.
        let base = unsafe { <Counted as Upcast<u64>>::upcast(object) };
        OffsetCache::<u64, Counted>::record(base, object);

        let policy = <OffsetDelete<u64> as Bind<u64, Counted>>::bind();

        // SAFETY: `base` views a live counted object.
        assert!(unsafe { policy.exact_type(base) }.is::<Counted>());
        // SAFETY: `base` views a live counted object.
        assert_eq!(unsafe { *base.as_ref() }, 17);

        // SAFETY: We own the object and never use it again.
        unsafe { policy.destroy_object(base) };

        assert_eq!(drops.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn debug_names_bound_type() {
        let bound = <OffsetDelete<u64> as Bind<u64, Counted>>::bind();

        assert!(format!("{bound:?}").contains("Counted"));
        assert!(format!("{:?}", OffsetDelete::<u64>::default()).contains("unbound"));
    }

    #[test]
    #[should_panic(expected = "not bound")]
    fn unbound_offset_delete_panics() {
        let mut value = 3_u64;

        // SAFETY: The policy panics before touching the pointer.
        _ = unsafe { OffsetDelete::<u64>::default().exact_type(NonNull::from(&mut value)) };
    }
}
