use std::any::type_name;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::marker::PhantomData;

use poly::{Bind, Deep, DestroyObject, FullName, Poly, TypeNamer, Upcast, make};
use tracing::{debug, warn};

use crate::{DuplicatePolicy, Error, FactoryBuilder, Result};

/// Creates fresh [`Poly`] containers over the base `B` from a registered name.
///
/// Each registered type must be [`Default`] and related to `B` through [`Upcast`]. Every call to
/// [`make()`][Self::make] creates a new default-constructed object in a new container with the
/// policy `P`. Names are produced by the [`TypeNamer`] `N`, unless the caller supplies one
/// through [`register_as()`][Self::register_as].
///
/// Names are kept sorted, so [`list()`][Self::list] is deterministic.
///
/// # Examples
///
/// ```
/// use poly::{Dynamic, Poly, upcast};
/// use poly_factory::Factory;
///
/// trait Plugin: Dynamic {
///     fn run(&self) -> u32;
/// }
///
/// #[derive(Clone, Default)]
/// struct Counter(u32);
///
/// impl Plugin for Counter {
///     fn run(&self) -> u32 {
///         self.0 + 1
///     }
/// }
///
/// upcast!(Counter => dyn Plugin);
///
/// let mut plugins: Factory<dyn Plugin> = Factory::new();
/// plugins.register_as::<Counter>("counter").unwrap();
///
/// let plugin: Poly<dyn Plugin> = plugins.make("counter").unwrap();
/// assert_eq!(plugin.run(), 1);
/// assert!(plugin.is::<Counter>());
/// ```
///
/// # Thread safety
///
/// The factory holds only names and function pointers. It is [`Send`] and [`Sync`], so a
/// populated factory can be shared between threads for building objects.
pub struct Factory<B, P = Deep<B>, N = FullName>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    constructors: BTreeMap<String, fn() -> Poly<B, P>>,
    duplicates: DuplicatePolicy,

    _namer: PhantomData<fn() -> N>,
}

impl<B, P, N> Factory<B, P, N>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    /// Creates an empty factory with default settings.
    ///
    /// Use [`builder()`][Self::builder] to customize the factory.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a new factory.
    pub fn builder() -> FactoryBuilder<B, P, N> {
        FactoryBuilder::new()
    }

    pub(crate) fn with_duplicates(duplicates: DuplicatePolicy) -> Self {
        Self {
            constructors: BTreeMap::new(),
            duplicates,
            _namer: PhantomData,
        }
    }

    /// What the factory does when a name is registered twice.
    #[must_use]
    pub fn duplicates(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Registers `D` under the name the [`TypeNamer`] `N` gives it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if the name is taken and the factory rejects duplicates.
    /// With [`DuplicatePolicy::Ignore`], the earlier registration is kept and this succeeds.
    pub fn register<D>(&mut self) -> Result<()>
    where
        D: Default + Upcast<B>,
        P: Bind<B, D>,
        N: TypeNamer,
    {
        self.register_as::<D>(N::name_of::<D>())
    }

    /// Registers `D` under an explicit name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if the name is taken and the factory rejects duplicates.
    /// With [`DuplicatePolicy::Ignore`], the earlier registration is kept and this succeeds.
    pub fn register_as<D>(&mut self, name: impl Into<String>) -> Result<()>
    where
        D: Default + Upcast<B>,
        P: Bind<B, D>,
    {
        match self.constructors.entry(name.into()) {
            Entry::Vacant(entry) => {
                debug!(name = %entry.key(), exact_type = type_name::<D>(), "registered type");
                entry.insert(construct::<B, P, D>);
                Ok(())
            }
            Entry::Occupied(entry) => match self.duplicates {
                DuplicatePolicy::Ignore => {
                    warn!(
                        name = %entry.key(),
                        exact_type = type_name::<D>(),
                        "name is already registered; keeping the earlier registration"
                    );
                    Ok(())
                }
                DuplicatePolicy::Reject => Err(Error::Duplicate {
                    name: entry.key().clone(),
                }),
            },
        }
    }

    /// The registered names, in ascending order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Creates a default-constructed object of the type registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unregistered`] if nothing is registered under `name`.
    pub fn make(&self, name: &str) -> Result<Poly<B, P>> {
        let construct = self
            .constructors
            .get(name)
            .ok_or_else(|| Error::Unregistered {
                name: name.to_owned(),
            })?;

        Ok(construct())
    }

    /// Whether a type is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// The number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether nothing has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<B, P, N> Default for Factory<B, P, N>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B, P, N> fmt::Debug for Factory<B, P, N>
where
    B: ?Sized + 'static,
    P: DestroyObject<B>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .field("duplicates", &self.duplicates)
            .finish_non_exhaustive()
    }
}

fn construct<B, P, D>() -> Poly<B, P>
where
    B: ?Sized + 'static,
    D: Default + Upcast<B>,
    P: Bind<B, D> + DestroyObject<B>,
{
    make(D::default())
}
