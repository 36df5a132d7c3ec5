//! # Never-resolve guard.
//!
//! Some waits are only ever meant to end in failure (a server loop, a stream
//! that should stay open). [`never_resolve`] turns an `Ok` completion into
//! [`NeverResolveError::UnexpectedResolve`] and passes any `Err` through untouched.

use std::convert::Infallible;
use std::future::Future;

use crate::error::NeverResolveError;

/// Awaits `fut`, which must never complete successfully.
///
/// - `Ok(_)` → `Err(NeverResolveError::UnexpectedResolve)`
/// - `Err(e)` → `Err(NeverResolveError::Rejected(e))` with `e` unchanged
pub async fn never_resolve<F, T, E>(fut: F) -> Result<Infallible, NeverResolveError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match fut.await {
        Ok(_) => Err(NeverResolveError::UnexpectedResolve),
        Err(e) => Err(NeverResolveError::Rejected(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::ready;

    #[derive(Debug, PartialEq, Eq)]
    struct Marker(u8);

    #[tokio::test]
    async fn raises_if_the_future_resolves() {
        let res = never_resolve(ready(Ok::<_, Marker>(42))).await;
        assert!(matches!(res, Err(NeverResolveError::UnexpectedResolve)));
    }

    #[tokio::test]
    async fn passes_the_original_failure_through() {
        let res = never_resolve(ready(Err::<(), _>(Marker(7)))).await;
        match res {
            Err(err) => assert_eq!(err.into_rejection(), Some(Marker(7))),
            Ok(never) => match never {},
        }
    }

    #[tokio::test]
    async fn passes_io_errors_through_with_their_kind() {
        let failing = async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            ))
        };
        let err = never_resolve(failing).await.unwrap_err();
        assert!(!err.is_unexpected_resolve());
        let inner = err.into_rejection().unwrap();
        assert_eq!(inner.kind(), std::io::ErrorKind::ConnectionRefused);
    }
}
