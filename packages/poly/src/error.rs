use thiserror::Error;

/// Errors that can occur when constructing or copying a [`Poly`][crate::Poly].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The object handed to a container is not exactly of the type it was declared as.
    ///
    /// Accepting it would record a base-to-derived offset for the wrong type pair, so the
    /// object is rejected and dropped before anything is recorded.
    #[error(
        "a pointer declared as '{declared}' must hold an object of exactly that type, not '{actual}'"
    )]
    TypeMismatch {
        /// The type the caller claimed the object has.
        declared: &'static str,

        /// The exact type the object reported for itself.
        actual: &'static str,
    },

    /// A container attempted to copy an object whose exact type does not implement [`Clone`].
    #[error("Poly<{base}> is attempting to copy '{derived}', which is not cloneable")]
    NotCloneable {
        /// The declared base type of the container.
        base: &'static str,

        /// The exact type of the object that could not be copied.
        derived: &'static str,
    },

    /// A container was asked for its object as a specific exact type that it does not hold.
    #[error("expected the container to hold a '{requested}' but it holds {held}")]
    NotHolding {
        /// The exact type that was requested.
        requested: &'static str,

        /// The exact type of the held object, or `nothing` if the container is empty.
        held: &'static str,
    },
}

/// A specialized `Result` type for container operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
