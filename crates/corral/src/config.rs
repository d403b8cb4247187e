//! Registry configuration parameters.

use crate::error::ArenaError;

/// What a registry does after reporting a usage error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UsageErrorPolicy {
    /// Log the error and terminate the process with
    /// [`RegistryConfig::exit_code`]. Process-exit hooks still run.
    #[default]
    Exit,
    /// Log the error and return it to the caller. Nothing is released and
    /// no table is modified.
    Return,
}

/// Configuration for a [`Registry`](crate::Registry).
///
/// Fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Reaction to usage errors (untracked blocks, unknown arenas).
    ///
    /// Default: [`UsageErrorPolicy::Exit`].
    pub usage_errors: UsageErrorPolicy,

    /// Process exit status used by [`UsageErrorPolicy::Exit`].
    ///
    /// Default: 1.
    pub exit_code: i32,
}

impl RegistryConfig {
    /// Default exit status for fatal usage errors.
    pub const DEFAULT_EXIT_CODE: i32 = 1;

    /// Create a config with the default (fatal) usage-error policy.
    pub fn new() -> Self {
        Self {
            usage_errors: UsageErrorPolicy::default(),
            exit_code: Self::DEFAULT_EXIT_CODE,
        }
    }

    /// Create a config whose usage errors are returned instead of exiting.
    pub fn recoverable() -> Self {
        Self {
            usage_errors: UsageErrorPolicy::Return,
            ..Self::new()
        }
    }

    /// Report a usage error and apply the policy.
    ///
    /// Only returns under [`UsageErrorPolicy::Return`].
    pub(crate) fn usage_error(&self, err: ArenaError) -> ArenaError {
        log::error!("corral: {err}");
        self.enforce(err)
    }

    /// Apply the policy to an error that has already been reported.
    ///
    /// Only returns under [`UsageErrorPolicy::Return`].
    pub(crate) fn enforce(&self, err: ArenaError) -> ArenaError {
        if self.usage_errors == UsageErrorPolicy::Exit {
            std::process::exit(self.exit_code);
        }
        err
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}
