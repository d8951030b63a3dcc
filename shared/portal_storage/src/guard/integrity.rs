//! Declarative referential-integrity rules for delete paths

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{GuardError, GuardResult};

type CheckFn<'a> = Box<dyn FnOnce() -> BoxFuture<'a, GuardResult<bool>> + Send + 'a>;

/// One dependency rule: "if `check` finds dependents, fail with `error_message`"
pub struct IntegrityCheck<'a> {
    description: String,
    error_message: String,
    check: CheckFn<'a>,
}

impl<'a> IntegrityCheck<'a> {
    /// Creates a rule
    ///
    /// # Arguments
    ///
    /// * `description` - Collection holding the dependents, reported to the caller
    /// * `error_message` - Message returned when dependents exist
    /// * `check` - Probe answering whether dependents exist; only invoked when reached
    pub fn new<F, Fut>(
        description: impl Into<String>,
        error_message: impl Into<String>,
        check: F,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = GuardResult<bool>> + Send + 'a,
    {
        Self {
            description: description.into(),
            error_message: error_message.into(),
            check: Box::new(move || check().boxed()),
        }
    }
}

impl std::fmt::Debug for IntegrityCheck<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityCheck")
            .field("description", &self.description)
            .field("error_message", &self.error_message)
            .finish_non_exhaustive()
    }
}

/// Runs `checks` in order and fails on the first one that finds dependents
///
/// Later checks are not invoked once one fails.
///
/// # Errors
///
/// Returns `GuardError::ReferentialIntegrityViolation` carrying the failing
/// rule's description and message, or the error of a probe that failed
pub async fn validate_referential_integrity(checks: Vec<IntegrityCheck<'_>>) -> GuardResult<()> {
    for IntegrityCheck {
        description,
        error_message,
        check,
    } in checks
    {
        if check().await? {
            tracing::info!(dependents = %description, "blocked by existing dependents");
            return Err(GuardError::ReferentialIntegrityViolation {
                dependents: description,
                message: error_message,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_positive_check_wins_and_short_circuits() {
        let third_called = AtomicBool::new(false);
        let third = &third_called;

        let result = validate_referential_integrity(vec![
            IntegrityCheck::new("news", "has news", || async { Ok(false) }),
            IntegrityCheck::new("sub-industries", "has sub-industries", || async { Ok(true) }),
            IntegrityCheck::new("use cases", "has use cases", move || async move {
                third.store(true, Ordering::SeqCst);
                Ok(true)
            }),
        ])
        .await;

        match result {
            Err(GuardError::ReferentialIntegrityViolation {
                dependents,
                message,
            }) => {
                assert_eq!(dependents, "sub-industries");
                assert_eq!(message, "has sub-industries");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!third_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_all_clear_runs_every_check() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let probe = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, GuardError>(false)
        };

        validate_referential_integrity(vec![
            IntegrityCheck::new("a", "a", probe),
            IntegrityCheck::new("b", "b", probe),
        ])
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_errors_propagate() {
        let result = validate_referential_integrity(vec![IntegrityCheck::new(
            "mappings",
            "has mappings",
            || async { Err(GuardError::Serialization("broken".to_string())) },
        )])
        .await;

        assert!(matches!(result, Err(GuardError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_no_checks_is_ok() {
        validate_referential_integrity(Vec::new()).await.unwrap();
    }
}
