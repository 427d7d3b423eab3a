use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity and display name of a Rust type.
///
/// Equality and hashing only consider the [`TypeId`]; the name is carried along for
/// diagnostics and is never used to make decisions.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Describes the type `T`.
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The unique identifier of the type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified name of the type, as reported by [`std::any::type_name`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this describes exactly the type `T`.
    #[must_use]
    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeInfo").field(&self.name).finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Reports the exact (most derived) type of a value, even when it is only seen through a
/// trait object.
///
/// Every sized `'static` type implements this trait automatically. To make the exact type of
/// an object recoverable through a trait object, make `Dynamic` a supertrait:
///
/// ```
/// use poly::{Dynamic, TypeInfo};
///
/// trait Shape: Dynamic {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.0 * self.0
///     }
/// }
///
/// let shape: Box<dyn Shape> = Box::new(Square(2.0));
/// assert_eq!(shape.as_ref().dynamic_type(), TypeInfo::of::<Square>());
/// ```
///
/// Containers whose base is a trait object use this to answer exact-type queries. Containers
/// whose base is a projected sub-object get the answer from their bound destroy policy instead.
pub trait Dynamic: Any {
    /// The exact type of `self`.
    fn dynamic_type(&self) -> TypeInfo;
}

impl<T: Any> Dynamic for T {
    fn dynamic_type(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }
}

/// Maps a type to the display name used for registry keys.
///
/// The mapping is selected at compile time through a type parameter of the consumer (for
/// example the factory in the `poly_factory` package). It is never used for anything
/// correctness-critical.
pub trait TypeNamer {
    /// The display name of `T`.
    fn name_of<T>() -> String
    where
        T: ?Sized + 'static;
}

/// Names types by their full path, exactly as [`std::any::type_name`] reports them.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullName;

impl TypeNamer for FullName {
    fn name_of<T>() -> String
    where
        T: ?Sized + 'static,
    {
        type_name::<T>().to_owned()
    }
}

/// Names types without their module paths, so `app::shapes::Circle<app::units::Mm>` becomes
/// `Circle<Mm>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShortName;

impl TypeNamer for ShortName {
    fn name_of<T>() -> String
    where
        T: ?Sized + 'static,
    {
        strip_paths(type_name::<T>())
    }
}

fn strip_paths(full: &str) -> String {
    let mut result = String::with_capacity(full.len());

    // Byte index in `result` where the path segment currently being written began.
    let mut segment_start = 0;

    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            result.truncate(segment_start);
        } else if c.is_alphanumeric() || c == '_' {
            result.push(c);
        } else {
            result.push(c);
            segment_start = result.len();
        }
    }

    result
}
