/// Determines what a [`Factory`][crate::Factory] does when a second type is registered under a
/// name that is already taken.
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
/// assert_eq!(factory.duplicates(), DuplicatePolicy::Reject);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DuplicatePolicy {
    /// The first registration under a name wins and later ones are logged and skipped. This is
    /// the default.
    #[default]
    Ignore,

    /// A registration under a taken name fails with [`Error::Duplicate`][crate::Error::Duplicate].
    Reject,
}
