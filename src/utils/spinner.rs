use crate::utils::logger::{LogLevel, Logger};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A running build step. Cleared and logged once, on `succeed` or `fail`.
pub struct Spinner {
    step: String,
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn new(step: impl Into<String>) -> Self {
        let step = step.into();
        Spinner {
            bar: Some(spinner_bar(step.clone())),
            step,
        }
    }

    pub fn succeed(&mut self, message: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
            Logger::new().log_message(
                LogLevel::Success,
                &format!("{} ({:.1}s)", message, bar.elapsed().as_secs_f32()),
            );
        }
    }

    pub fn fail(&mut self, error: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
            Logger::new().log_message_with_trace(
                LogLevel::Error,
                error,
                &[format!("while: {}", self.step)],
            );
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("{} (interrupted)", self.step));
        }
    }
}

/// A steadily ticking spinner bar. Also used by the console download dialog.
pub fn spinner_bar(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
    bar.set_style(style);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Runs `action` behind a spinner labelled `step`.
///
/// ### Parameters
/// - `step`: What is being done, shown while it runs
/// - `on_success`: Builds the success line from the result
/// - `action`: The step itself
///
pub fn run_step<T, F, S>(step: &str, on_success: S, action: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, String>,
    S: FnOnce(&T) -> String,
{
    let mut spinner = Spinner::new(step);
    let result = action();
    match &result {
        Ok(value) => spinner.succeed(&on_success(value)),
        Err(err) => spinner.fail(err),
    }
    result
}

pub fn run_unit_step<F>(step: &str, success_message: &str, action: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), String>,
{
    run_step(step, |_| success_message.to_string(), action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_step_passes_results_through() {
        let value = run_step("Counting archives", |n: &usize| format!("{} archive(s)", n), || Ok(2));
        assert_eq!(value, Ok(2));

        let err = run_unit_step("Copying server content", "copied", || {
            Err("Directory not found: server".to_string())
        })
        .unwrap_err();
        assert_eq!(err, "Directory not found: server");
    }

    #[test]
    fn finished_spinner_is_not_logged_twice() {
        let mut spinner = Spinner::new("Extracting usd-24.03_linux_py39.zip");
        spinner.succeed("Extracted");
        assert!(spinner.bar.is_none());
        spinner.fail("late failure");
        assert!(spinner.bar.is_none());
    }
}
