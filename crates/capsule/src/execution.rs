//! Per-call execution options.

use std::fmt;
use std::time::Duration;

use capsule_common::ExecutionContext;
use tokio_util::sync::CancellationToken;

/// Settings governing one orchestrator call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionConfiguration {
    /// Cancellation and deadline context threaded through every stage.
    pub context: ExecutionContext,
}

impl ExecutionConfiguration {
    /// Fold `options` over the defaults, in order.
    pub fn from_options(options: impl IntoIterator<Item = ExecutionOption>) -> Self {
        options
            .into_iter()
            .fold(Self::default(), |mut config, option| {
                (option.0)(&mut config);
                config
            })
    }
}

/// A mutation applied to an [`ExecutionConfiguration`].
pub struct ExecutionOption(Box<dyn FnOnce(&mut ExecutionConfiguration) + Send>);

impl ExecutionOption {
    /// Wrap an arbitrary mutation.
    pub fn new(mutate: impl FnOnce(&mut ExecutionConfiguration) + Send + 'static) -> Self {
        Self(Box::new(mutate))
    }
}

impl fmt::Debug for ExecutionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionOption").finish_non_exhaustive()
    }
}

/// Replace the execution context.
#[must_use]
pub fn with_context(context: ExecutionContext) -> ExecutionOption {
    ExecutionOption::new(move |config| config.context = context)
}

/// Bound the call by `timeout` from the moment the option is applied.
#[must_use]
pub fn with_timeout(timeout: Duration) -> ExecutionOption {
    ExecutionOption::new(move |config| {
        config.context = config.context.clone().with_timeout(timeout);
    })
}

/// Abort the call when `token` is cancelled.
#[must_use]
pub fn with_cancellation(token: CancellationToken) -> ExecutionOption {
    ExecutionOption::new(move |config| {
        config.context = config.context.clone().with_cancellation(token);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_options_yield_background_context() {
        let config = ExecutionConfiguration::from_options(Vec::<ExecutionOption>::new());
        assert!(config.context.deadline().is_none());
        assert!(!config.context.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn options_apply_in_order() {
        let token = CancellationToken::new();
        let config = ExecutionConfiguration::from_options([
            with_timeout(Duration::from_secs(5)),
            with_cancellation(token.clone()),
        ]);

        assert!(config.context.deadline().is_some());
        token.cancel();
        assert!(config.context.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn later_context_replaces_earlier_settings() {
        let config = ExecutionConfiguration::from_options([
            with_timeout(Duration::from_secs(5)),
            with_context(ExecutionContext::background()),
        ]);
        assert!(config.context.deadline().is_none());
    }
}
