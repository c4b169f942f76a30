use std::fmt::Display;
use std::future::Future;
use thiserror::Error;

/// Every source failed. Holds one `"<source>: <error>"` line per attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("all sources failed: {}", describe(.failures))]
pub struct FallbackError {
    pub failures: Vec<String>,
}

fn describe(failures: &[String]) -> String {
    if failures.is_empty() {
        "no sources configured".to_string()
    } else {
        failures.join("; ")
    }
}

/// Anything that can be tried as one alternative in an ordered fallback.
pub trait Source {
    fn name(&self) -> &str;
}

/// Try each source in order and return the first success together with the
/// source that produced it. Later sources are never touched once one succeeds.
pub async fn first_success<'a, S, T, E, F, Fut>(
    sources: &'a [S],
    mut attempt: F,
) -> Result<(&'a S, T), FallbackError>
where
    S: Source,
    F: FnMut(&'a S) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut failures = Vec::new();

    for source in sources {
        match attempt(source).await {
            Ok(value) => {
                tracing::info!("Loaded from {}", source.name());
                return Ok((source, value));
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", source.name(), e);
                failures.push(format!("{}: {}", source.name(), e));
            }
        }
    }

    Err(FallbackError { failures })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Source for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let sources = [Named("a"), Named("b"), Named("c")];
        let mut tried = Vec::new();

        let (source, value) = first_success(&sources, |s| {
            tried.push(s.0);
            let outcome = if s.0 == "b" { Ok(42) } else { Err("down") };
            async move { outcome }
        })
        .await
        .unwrap();

        assert_eq!(source.0, "b");
        assert_eq!(value, 42);
        assert_eq!(tried, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_aggregates_diagnostics_on_total_failure() {
        let sources = [Named("a"), Named("b")];

        let err = first_success(&sources, |s| {
            let name = s.0;
            async move { Err::<(), _>(format!("{} is down", name)) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.failures, vec!["a: a is down", "b: b is down"]);
        assert_eq!(
            err.to_string(),
            "all sources failed: a: a is down; b: b is down"
        );
    }

    #[tokio::test]
    async fn test_empty_source_list_fails() {
        let sources: [Named; 0] = [];
        let err = first_success(&sources, |_| async { Ok::<_, String>(1) })
            .await
            .unwrap_err();
        assert!(err.failures.is_empty());
        assert_eq!(err.to_string(), "all sources failed: no sources configured");
    }
}
