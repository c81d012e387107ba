//! Cross-cutting wrappers applied explicitly at the call sites that need them.
//!
//! - [timed] wraps `insert` and `select`.
//! - [confirmed] gates `drop table` and `delete`.

use std::time::Instant;

use tracing::info;

/// Runs `f` and logs how long it took under `name`.
pub fn timed<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    info!(
        operation = name,
        "{name} completed in {:.3} s",
        start.elapsed().as_secs_f64()
    );
    result
}

/// Asks the user to approve a destructive action.
pub trait Confirm {
    /// Returns `true` only on an affirmative answer.
    fn confirm(&mut self, action: &str) -> bool;
}

/// Answers every prompt with the same value.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _action: &str) -> bool {
        self.0
    }
}

/// Prompt text shown before a destructive action.
pub fn confirm_prompt(action: &str) -> String {
    format!("Are you sure you want to perform \"{action}\"? [y/n]: ")
}

/// Reads a user's answer: only `y` (any case, surrounding spaces ignored) approves.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Runs `f` only if `confirm` approves `action`. Returns `None` when declined.
pub fn confirmed<C, T, F>(confirm: &mut C, action: &str, f: F) -> Option<T>
where
    C: Confirm + ?Sized,
    F: FnOnce() -> T,
{
    if confirm.confirm(action) {
        Some(f())
    } else {
        info!(action, "operation cancelled");
        None
    }
}
