//! Unified logging and progress UI.
//!
//! [`Notifier`] sets up `env_logger` and drives `indicatif` spinners/bars under a
//! single verbosity switch:
//! - [`VerbosityLevel::Quiet`] → warnings only; status messages go to a live
//!   spinner and clones get a progress bar.
//! - [`VerbosityLevel::Info`]/[`VerbosityLevel::Debug`]/[`VerbosityLevel::Trace`] →
//!   plain text logs, including the `log` output of the matchers and identifier.
//!
//! `RUST_LOG` still refines the filter on top of the verbosity level.

use env_logger::Env;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::cell::RefCell;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerbosityLevel {
    Quiet = 0, // Spinner, warnings only
    Info = 1,
    Debug = 2,
    Trace = 3,
}

impl From<u8> for VerbosityLevel {
    fn from(level: u8) -> Self {
        match level {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Info,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }
}

impl VerbosityLevel {
    pub fn to_log_level(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet => LevelFilter::Warn,
            VerbosityLevel::Info => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
            VerbosityLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub struct Notifier {
    verbosity: VerbosityLevel,
    multi_progress: Option<MultiProgress>,
    active_spinner: RefCell<Option<ProgressBar>>,
}

impl Notifier {
    /// Creates a notifier without touching the global logger.
    pub fn new(verbosity_level: u8) -> Self {
        let verbosity = VerbosityLevel::from(verbosity_level);

        let multi_progress = if verbosity == VerbosityLevel::Quiet {
            Some(MultiProgress::new())
        } else {
            None
        };

        Self {
            verbosity,
            multi_progress,
            active_spinner: RefCell::new(None),
        }
    }

    /// Creates a notifier and installs the global logger for its level.
    pub fn init(verbosity_level: u8) -> Self {
        let notifier = Self::new(verbosity_level);

        // A logger may already be installed, e.g. by a test harness.
        let _ = env_logger::Builder::from_env(Env::default())
            .filter_level(notifier.verbosity.to_log_level())
            .try_init();

        notifier
    }

    pub fn info(&self, message: &str) {
        match self.verbosity {
            VerbosityLevel::Quiet => {
                // Lazy initialize spinner on first info call
                if self.active_spinner.borrow().is_none() {
                    if let Some(multi_progress) = &self.multi_progress {
                        let spinner = multi_progress.add(ProgressBar::new_spinner());
                        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                            spinner.set_style(style);
                        }
                        spinner.enable_steady_tick(Duration::from_millis(100));

                        *self.active_spinner.borrow_mut() = Some(spinner);
                    }
                }

                if let Some(spinner) = self.active_spinner.borrow().as_ref() {
                    spinner.set_message(message.to_string());
                }
            }
            _ => log::info!("{}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    /// Warnings are shown at every level; in Quiet mode they are printed
    /// above the spinner so it doesn't overwrite them.
    pub fn warn(&self, message: &str) {
        match &self.multi_progress {
            Some(multi_progress) if self.active_spinner.borrow().is_some() => {
                multi_progress.suspend(|| log::warn!("{}", message));
            }
            _ => log::warn!("{}", message),
        }
    }

    pub fn create_progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        let multi_progress = self.multi_progress.as_ref()?;

        let progress_bar = multi_progress.add(ProgressBar::new(length));
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        ) {
            progress_bar.set_style(style.progress_chars("=> "));
        }
        progress_bar.set_message(message.to_string());
        Some(progress_bar)
    }

    /// Periodic textual progress for the non-Quiet levels.
    pub fn progress(&self, current: u64, total: u64, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet && (current % 100 == 0 || current == total) {
            self.debug(&format!("{}: {}/{}", message, current, total));
        }
    }

    /// Clears the spinner, if one was shown.
    pub fn finish(&self) {
        if let Some(spinner) = self.active_spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }

    pub fn use_beautiful_progress(&self) -> bool {
        self.verbosity == VerbosityLevel::Quiet
    }

    pub fn verbosity_level(&self) -> VerbosityLevel {
        self.verbosity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(VerbosityLevel::from(0), VerbosityLevel::Quiet);
        assert_eq!(VerbosityLevel::from(1), VerbosityLevel::Info);
        assert_eq!(VerbosityLevel::from(2), VerbosityLevel::Debug);
        assert_eq!(VerbosityLevel::from(3), VerbosityLevel::Trace);
        assert_eq!(VerbosityLevel::from(9), VerbosityLevel::Trace);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(VerbosityLevel::Quiet.to_log_level(), LevelFilter::Warn);
        assert_eq!(VerbosityLevel::Debug.to_log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_finish_clears_spinner() {
        let quiet = Notifier::new(0);
        quiet.info("Listing tags of bigkevmcd/go-demo");
        assert!(quiet.active_spinner.borrow().is_some());

        quiet.finish();
        assert!(quiet.active_spinner.borrow().is_none());

        // Finishing again, or without a spinner, is a no-op
        quiet.finish();
        Notifier::new(1).finish();
    }

    #[test]
    fn test_progress_bars_only_when_quiet() {
        let quiet = Notifier::new(0);
        assert!(quiet.use_beautiful_progress());
        assert!(quiet.create_progress_bar(10, "Receiving objects").is_some());

        let verbose = Notifier::new(2);
        assert!(!verbose.use_beautiful_progress());
        assert_eq!(verbose.verbosity_level(), VerbosityLevel::Debug);
        assert!(verbose.create_progress_bar(10, "Receiving objects").is_none());
    }
}
