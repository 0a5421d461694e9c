#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Application context.
mod context;
pub use self::context::AppContext;

/// Application spindown registry & tokens.
mod spindown;
pub use self::spindown::{token::AppSpindownToken, AppSpindown};

/// [Terminates](AppContext::terminate) the global [`AppContext`] and waits for
/// [`AppSpindown`] to complete.
///
/// This is effectively the global shutdown&clean-up routine for all workloads
/// that integrate with the Wharf family of crates via [`AppContext`] and
/// [`AppSpindown`].
///
/// ## Usage
///
/// When using any of the public `wharf` components without the runtime
/// itself, await on this function as a last thing before completing the main
/// application logic.
pub async fn wharf_shutdown() {
    // Terminate the global application context
    AppContext::terminate();

    // Wait for the registered spindown workloads to finish
    AppSpindown::completed().await;
}
