//! Wrappers applied around command execution: confirmation of destructive
//! operations, error-to-message translation, and timing.

use std::time::Instant;

use log::{debug, info, warn};

use crate::error::{DbError, Result};

/// Source of yes/no answers for destructive operations.
pub trait Confirm {
    async fn ask(&mut self, question: &str) -> bool;
}

/// Answers yes to everything (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    async fn ask(&mut self, question: &str) -> bool {
        debug!("auto-confirmed: {}", question);
        true
    }
}

/// Only `y` (any case, surrounding whitespace ignored) counts as yes.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Runs `op` only if `confirm` agrees to `action`; otherwise returns
/// `DbError::Cancelled` without running it.
pub async fn confirmed<C, T, F>(confirm: &mut C, action: &str, op: F) -> Result<T>
where
    C: Confirm,
    F: FnOnce() -> Result<T>,
{
    let question = format!("Are you sure you want to \"{}\"? [y/n]: ", action);
    if !confirm.ask(&question).await {
        info!("{} cancelled", action);
        return Err(DbError::Cancelled);
    }
    op()
}

/// Turns a command result into either its value or a printable message.
pub fn translate<T>(result: Result<T>) -> std::result::Result<T, String> {
    result.map_err(|err| {
        match &err {
            DbError::Cancelled => info!("{}", err),
            DbError::Storage(e) => warn!("storage failure: {:?}", e),
            _ => debug!("command rejected: {}", err),
        }
        format!("Error: {}", err)
    })
}

pub fn timed<T>(label: &str, op: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = op();
    debug!("{} took {:.3}s", label, start.elapsed().as_secs_f64());
    out
}


#[cfg(test)]
mod tests {
    use super::testing::Scripted;
    use super::*;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" Y \n"));
        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
    }

    #[tokio::test]
    async fn test_confirmed_runs_on_yes() {
        let mut confirm = Scripted::new([true]);
        let out = confirmed(&mut confirm, "drop_table", || Ok(42)).await.unwrap();
        assert_eq!(out, 42);
        assert_eq!(
            confirm.asked,
            vec!["Are you sure you want to \"drop_table\"? [y/n]: "]
        );
    }

    #[tokio::test]
    async fn test_confirmed_skips_on_no() {
        let mut confirm = Scripted::new([false]);
        let mut ran = false;
        let result = confirmed(&mut confirm, "delete", || {
            ran = true;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DbError::Cancelled)));
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_assume_yes() {
        let out = confirmed(&mut AssumeYes, "delete", || Ok("done")).await;
        assert_eq!(out.unwrap(), "done");
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate(Ok::<_, DbError>(1)), Ok(1));
        assert_eq!(
            translate::<()>(Err(DbError::not_found("table \"x\" does not exist"))),
            Err("Error: Not found: table \"x\" does not exist".to_string())
        );
    }

    #[test]
    fn test_timed_returns_value() {
        assert_eq!(timed("noop", || 7), 7);
    }
}
