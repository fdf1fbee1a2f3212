//! Terminal signals delivered at the end of a connection.

/// How a producer ended its emission.
///
/// A completion is terminal: once delivered on an attachment, nothing else
/// may follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<E> {
    /// The producer emitted everything it had.
    Finished,
    /// The producer failed with an opaque error.
    Failed(E),
}

impl<E> Completion<E> {
    /// Returns true for [`Completion::Finished`].
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true for [`Completion::Failed`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure payload, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&E> {
        match self {
            Self::Finished => None,
            Self::Failed(e) => Some(e),
        }
    }

    /// Maps the failure payload, leaving `Finished` untouched.
    pub fn map_failure<F, E2>(self, f: F) -> Completion<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Finished => Completion::Finished,
            Self::Failed(e) => Completion::Failed(f(e)),
        }
    }

    /// Converts into a `Result`, `Finished` becoming `Ok(())`.
    pub fn into_result(self) -> Result<(), E> {
        match self {
            Self::Finished => Ok(()),
            Self::Failed(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let done: Completion<String> = Completion::Finished;
        assert!(done.is_finished());
        assert!(!done.is_failure());
        assert!(done.failure().is_none());

        let failed = Completion::Failed("boom".to_string());
        assert!(failed.is_failure());
        assert_eq!(failed.failure(), Some(&"boom".to_string()));
    }

    #[test]
    fn test_map_failure() {
        let failed: Completion<&str> = Completion::Failed("boom");
        assert_eq!(failed.map_failure(str::len), Completion::Failed(4));

        let done: Completion<&str> = Completion::Finished;
        assert_eq!(done.map_failure(str::len), Completion::Finished);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Completion::<u8>::Finished.into_result(), Ok(()));
        assert_eq!(Completion::Failed(3u8).into_result(), Err(3));
    }
}
