//! Terminal result of fetching one candidate URL.

/// What the server said about a candidate file.
///
/// Transient failures are not outcomes; they are retried until one of these
/// two answers is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// The file exists; its full body.
    Found(Vec<u8>),
    /// The server answered 404.
    NotFound,
}

impl RetrievalOutcome {
    /// Returns true for [`RetrievalOutcome::Found`].
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Consumes the outcome, returning the body if the file was found.
    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Found(bytes) => Some(bytes),
            Self::NotFound => None,
        }
    }
}
