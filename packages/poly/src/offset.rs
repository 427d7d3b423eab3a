use std::any::{TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{LazyLock, RwLock};

use foldhash::{HashMap, HashMapExt};
use tracing::trace;

use crate::constants::{ERR_OFFSET_NOT_RECORDED, ERR_POISONED_LOCK};

/// Process-wide memory of the byte offset between a `B` view of an object and the `D` object
/// itself, so that a `NonNull<B>` can be turned back into a `NonNull<D>` without any dynamic
/// introspection.
///
/// For trait object views and the identity view the offset is always zero. For views created
/// by projecting to a field it is the (negated) position of that field inside `D`. The offset
/// is captured the first time a container is built from a concrete `D`, at the one moment
/// when both the object pointer and its view are known, and reused for every later downcast
/// of the same `(B, D)` pair from any thread.
///
/// Entries are never removed: object layout does not change while the process runs.
///
/// This type is never instantiated; it only groups the operations on one `(B, D)` pair.
///
/// # Example
///
/// ```
/// use std::ptr::NonNull;
///
/// use poly::{OffsetCache, Upcast, upcast_field};
///
/// #[repr(C)]
/// struct Header {
///     len: u32,
/// }
///
/// #[repr(C)]
/// struct Frame {
///     crc: u64,
///     header: Header,
/// }
///
/// upcast_field!(Frame, header: Header);
///
/// let mut frame = Frame {
///     crc: 0xfeed,
///     header: Header { len: 3 },
/// };
/// let derived = NonNull::from(&mut frame);
/// // SAFETY: `derived` points to a live frame.
/// let base = unsafe { <Frame as Upcast<Header>>::upcast(derived) };
///
/// OffsetCache::<Header, Frame>::record(base, derived);
/// assert_eq!(OffsetCache::<Header, Frame>::get(), Some(-8));
///
/// // SAFETY: The offset is recorded and `base` views a live frame.
/// let recovered = unsafe { OffsetCache::<Header, Frame>::downcast(base) };
/// assert_eq!(recovered, derived);
/// ```
pub struct OffsetCache<B, D>
where
    B: ?Sized,
{
    _types: PhantomData<(fn(&B), fn(&D))>,
}

impl<B, D> OffsetCache<B, D>
where
    B: ?Sized + 'static,
    D: 'static,
{
    /// Records the distance from `base` to `derived` for the `(B, D)` pair and returns it.
    ///
    /// Recording the same pair again is allowed and cheap, as long as the distance is the
    /// same, which it always is when `base` is the view of `derived` produced by a correct
    /// [`Upcast`][crate::Upcast] implementation.
    ///
    /// # Panics
    ///
    /// Panics if a different offset was recorded earlier for the same pair. That can only
    /// happen if an `Upcast` implementation does not place the view at a fixed position.
    pub fn record(base: NonNull<B>, derived: NonNull<D>) -> isize {
        let offset = byte_distance(base, derived);

        let (slot, inserted) = slot_or_insert(key::<B, D>(), offset);

        if inserted {
            trace!(
                base = type_name::<B>(),
                derived = type_name::<D>(),
                offset,
                "recorded base-to-derived offset"
            );
        }

        let published = slot.load(Ordering::Relaxed);
        assert_eq!(
            published,
            offset,
            "the view of '{}' as '{}' must sit at a fixed offset",
            type_name::<D>(),
            type_name::<B>()
        );

        offset
    }

    /// The recorded offset for the `(B, D)` pair, if any container has recorded it yet.
    #[must_use]
    pub fn get() -> Option<isize> {
        find_slot(key::<B, D>()).map(|slot| slot.load(Ordering::Relaxed))
    }

    /// Converts a `B` view back into a pointer to the `D` object it belongs to.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `base` is the `B` view of a live `D` object.
    ///
    /// # Panics
    ///
    /// Panics if no offset has been recorded for the pair. Containers always record the
    /// offset before they can hold a `D`, so this indicates a pointer that did not come
    /// from a container.
    #[must_use]
    pub unsafe fn downcast(base: NonNull<B>) -> NonNull<D> {
        let offset = Self::get().expect(ERR_OFFSET_NOT_RECORDED);

        // SAFETY: The offset was measured between a view and its object, and the caller
        // guarantees `base` is such a view, so the result stays inside the same allocation.
        unsafe { base.cast::<u8>().offset(offset).cast::<D>() }
    }
}

impl<B, D> fmt::Debug for OffsetCache<B, D>
where
    B: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>()).finish_non_exhaustive()
    }
}

type Key = (TypeId, TypeId);

// Values are leaked so that the thread-local memo can keep `'static` references to them.
type OffsetRegistry = HashMap<Key, &'static AtomicIsize>;

// The authority on all offsets. Only touched the first time a thread sees a pair.
static GLOBAL_OFFSETS: LazyLock<RwLock<OffsetRegistry>> =
    LazyLock::new(|| RwLock::new(OffsetRegistry::new()));

thread_local! {
    // Offsets this thread has already looked up, so the steady state takes no lock.
    static LOCAL_OFFSETS: RefCell<OffsetRegistry> = RefCell::new(OffsetRegistry::new());
}

fn key<B, D>() -> Key
where
    B: ?Sized + 'static,
    D: 'static,
{
    (TypeId::of::<B>(), TypeId::of::<D>())
}

fn byte_distance<B, D>(base: NonNull<B>, derived: NonNull<D>) -> isize
where
    B: ?Sized,
{
    let base = base.cast::<u8>().as_ptr().addr();
    let derived = derived.cast::<u8>().as_ptr().addr();

    #[expect(
        clippy::cast_possible_wrap,
        reason = "both addresses are in one allocation, which is at most isize::MAX bytes"
    )]
    let distance = derived.wrapping_sub(base) as isize;

    distance
}

fn find_slot(key: Key) -> Option<&'static AtomicIsize> {
    if let Some(slot) = LOCAL_OFFSETS.with_borrow(|local| local.get(&key).copied()) {
        return Some(slot);
    }

    let slot = GLOBAL_OFFSETS
        .read()
        .expect(ERR_POISONED_LOCK)
        .get(&key)
        .copied()?;

    LOCAL_OFFSETS.with_borrow_mut(|local| local.insert(key, slot));

    Some(slot)
}

// Returns the slot for `key`, creating it with `offset` as its value if the pair has never
// been seen by any thread. The boolean is true if this call created the slot.
#[cfg_attr(test, mutants::skip)] // The flag only decides whether the first recording is logged.
fn slot_or_insert(key: Key, offset: isize) -> (&'static AtomicIsize, bool) {
    if let Some(slot) = find_slot(key) {
        return (slot, false);
    }

    let mut inserted = false;

    let slot = *GLOBAL_OFFSETS
        .write()
        .expect(ERR_POISONED_LOCK)
        .entry(key)
        .or_insert_with(|| {
            inserted = true;
            Box::leak(Box::new(AtomicIsize::new(offset)))
        });

    LOCAL_OFFSETS.with_borrow_mut(|local| local.insert(key, slot));

    (slot, inserted)
}
