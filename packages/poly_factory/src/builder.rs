use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use poly::{Deep, DestroyObject, FullName};

use crate::{DuplicatePolicy, Factory};

/// Builder for creating an instance of [`Factory`].
///
/// All settings are optional. A factory built without changing any of them is the same as
/// [`Factory::new()`].
///
/// # Examples
///
/// ```
/// use poly::Dynamic;
/// use poly_factory::{DuplicatePolicy, Factory};
///
/// let factory: Factory<dyn Dynamic> = Factory::builder()
///     .duplicates(DuplicatePolicy::Reject)
///     .build();
///
/// assert!(factory.is_empty());
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing factory configuration to happen on different threads than where the factory is
/// used. However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[must_use]
pub struct FactoryBuilder<B, P = Deep<B>, N = FullName>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    duplicates: DuplicatePolicy,

    _factory: PhantomData<fn() -> Factory<B, P, N>>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl<B, P, N> FactoryBuilder<B, P, N>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    pub(crate) fn new() -> Self {
        Self {
            duplicates: DuplicatePolicy::default(),
            _factory: PhantomData,
            _not_sync: PhantomData,
        }
    }

    /// Sets the [duplicate policy][DuplicatePolicy] of the factory. This governs what happens
    /// when a second type is registered under a name that is already taken.
    ///
    /// # Examples
    ///
    /// ```
    /// use poly::Dynamic;
    /// use poly_factory::{DuplicatePolicy, Factory};
    ///
    /// let factory: Factory<dyn Dynamic> = Factory::builder()
    ///     .duplicates(DuplicatePolicy::Ignore)
    ///     .build();
    ///
    /// assert_eq!(factory.duplicates(), DuplicatePolicy::Ignore);
    /// ```
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Builds a new, empty factory with the configured settings.
    #[must_use]
    pub fn build(self) -> Factory<B, P, N> {
        Factory::with_duplicates(self.duplicates)
    }
}

impl<B, P, N> fmt::Debug for FactoryBuilder<B, P, N>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryBuilder")
            .field("duplicates", &self.duplicates)
            .finish_non_exhaustive()
    }
}
