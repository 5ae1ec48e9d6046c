//! Sequential fallback executor
//!
//! Tries asynchronous candidates strictly one after another and returns the first
//! success. A candidate is never started before the previous one has settled, and
//! nothing after the first success is invoked.

use futures::future::BoxFuture;
use std::future::Future;

/// Failure of a fallback run
#[derive(Debug, thiserror::Error)]
pub enum FallbackError<E> {
    /// Every candidate failed; carries the last failure
    #[error(transparent)]
    Failed(E),
    /// The candidate sequence was empty
    #[error("no fallback candidates supplied")]
    NoCandidates,
    /// A supplied element cannot be invoked
    #[error("expected element to be a function, received `{kind}` instead")]
    InvalidCandidate { kind: &'static str },
}

impl<E> FallbackError<E> {
    /// The last candidate failure, if the run got that far
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::NoCandidates | Self::InvalidCandidate { .. } => None,
        }
    }
}

/// Boxed zero-argument async operation
pub type BoxedCandidate<'a, T, E> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T, E>> + Send + 'a>;

/// Element of a candidate list assembled at a dynamic boundary
pub enum Candidate<'a, T, E> {
    /// An operation that can be tried
    Invocable(BoxedCandidate<'a, T, E>),
    /// Something that was supplied in place of an operation; `kind` names what it was
    Inert { kind: &'static str },
}

impl<'a, T, E> Candidate<'a, T, E> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        Self::Invocable(Box::new(move || Box::pin(f())))
    }
}

/// Try each candidate in order, returning the first success.
///
/// Fails with the most recent failure when all candidates fail, or with
/// [`FallbackError::NoCandidates`] when there is nothing to try.
pub async fn try_each<T, E, I, F, Fut>(candidates: I) -> Result<T, FallbackError<E>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;

    for candidate in candidates {
        match candidate().await {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.map_or(FallbackError::NoCandidates, FallbackError::Failed))
}

/// Like [`try_each`], for candidate lists that may hold non-invocable elements.
///
/// Each element is checked only when it is reached, so an inert element after a
/// successful candidate is never looked at.
pub async fn try_each_candidate<'a, T, E, I>(candidates: I) -> Result<T, FallbackError<E>>
where
    I: IntoIterator<Item = Candidate<'a, T, E>>,
{
    let mut last_error = None;

    for candidate in candidates {
        let op = match candidate {
            Candidate::Invocable(op) => op,
            Candidate::Inert { kind } => return Err(FallbackError::InvalidCandidate { kind }),
        };
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.map_or(FallbackError::NoCandidates, FallbackError::Failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let make = |result: Result<u32, &'static str>| {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                result
            }
        };

        let result = try_each(vec![make(Err("one")), make(Err("two")), make(Ok(7)), make(Ok(8))]).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_fail_returns_last_error() {
        let fail = |msg: &'static str| move || async move { Err::<(), _>(msg) };
        match try_each(vec![fail("fail1"), fail("fail2")]).await {
            Err(FallbackError::Failed(e)) => assert_eq!(e, "fail2"),
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let candidates: Vec<fn() -> std::future::Ready<Result<u8, String>>> = Vec::new();
        let result = try_each(candidates).await;
        assert!(matches!(result, Err(FallbackError::NoCandidates)));
        assert!(result.unwrap_err().into_failure().is_none());
    }

    #[tokio::test]
    async fn test_inert_candidate_rejected() {
        let candidates: Vec<Candidate<'_, u8, String>> = vec![
            Candidate::new(|| async { Err("nope".to_string()) }),
            Candidate::Inert { kind: "string" },
            Candidate::new(|| async { Ok(1) }),
        ];
        let err = try_each_candidate(candidates).await.unwrap_err();
        assert!(matches!(err, FallbackError::InvalidCandidate { kind: "string" }));
        assert!(err.to_string().contains("`string`"));
    }

    #[tokio::test]
    async fn test_inert_after_success_is_never_checked() {
        let candidates: Vec<Candidate<'_, u8, String>> = vec![
            Candidate::new(|| async { Ok(3) }),
            Candidate::Inert { kind: "number" },
        ];
        assert_eq!(try_each_candidate(candidates).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_candidate_list_last_failure() {
        let candidates: Vec<Candidate<'_, u8, String>> = vec![
            Candidate::new(|| async { Err("first".to_string()) }),
            Candidate::new(|| async { Err("second".to_string()) }),
        ];
        let err = try_each_candidate(candidates).await.unwrap_err();
        assert_eq!(err.into_failure().as_deref(), Some("second"));
    }
}
