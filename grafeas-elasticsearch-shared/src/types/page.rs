//! Result containers for list and batch operations.

/// One page of a listing.
///
/// An empty `next_page_token` means there are no further pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: String,
}

impl<T> Page<T> {
    /// Create a page with the given items and continuation token.
    pub fn new(items: Vec<T>, next_page_token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.into(),
        }
    }

    /// Whether this is the final page of the listing.
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_empty()
    }
}

/// Outcome of a batch create operation.
///
/// Items that were persisted are returned in `created`; every item that was
/// not persisted contributes exactly one entry to `errors`. A batch that failed
/// as a whole has no created items and a single error.
#[derive(Debug, Clone)]
pub struct BatchCreateResult<T, E> {
    pub created: Vec<T>,
    pub errors: Vec<E>,
}

impl<T, E> BatchCreateResult<T, E> {
    /// A batch that failed as a whole.
    pub fn failed(error: E) -> Self {
        Self {
            created: Vec::new(),
            errors: vec![error],
        }
    }

    /// Whether every item in the batch was persisted.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<T, E> Default for BatchCreateResult<T, E> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_is_last() {
        assert!(Page::<u8>::new(vec![], "").is_last());
        assert!(!Page::new(vec![1u8], "pit:50").is_last());
    }

    #[test]
    fn test_failed_batch() {
        let result: BatchCreateResult<u8, String> = BatchCreateResult::failed("boom".to_string());
        assert!(result.created.is_empty());
        assert_eq!(result.errors, vec!["boom".to_string()]);
        assert!(!result.is_complete());
    }
}
