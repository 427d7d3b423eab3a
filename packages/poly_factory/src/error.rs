use thiserror::Error;

/// Errors that can occur when registering types in a [`Factory`][crate::Factory] or building
/// objects from it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No type is registered under the requested name.
    #[error("'{name}' is not registered in this factory")]
    Unregistered {
        /// The name that was looked up.
        name: String,
    },

    /// A type was registered under a name that is already taken, and the factory is configured
    /// to reject duplicates.
    #[error("'{name}' is already registered in this factory")]
    Duplicate {
        /// The name that was already taken.
        name: String,
    },
}

/// A specialized `Result` type for factory operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
