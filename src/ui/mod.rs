//! Terminal output for polybuild commands
//!
//! Uses `cliclack` for interactive output and falls back to bracketed
//! plain lines in CI or when `--plain` is passed.
//!
//! # Example
//!
//! ```rust,ignore
//! use polybuild::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "polybuild");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Fingerprinting project...");
//! spinner.stop("412 files fingerprinted");
//!
//! ui::step_ok_detail(&ctx, "cargo", "built in 3.1s");
//! ui::outro_success(&ctx, "Build complete");
//! ```

mod context;
mod format;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use format::{format_bytes, format_duration};
pub use output::{
    intro, key_value, key_value_status, note, outro_error, outro_success, outro_warn, remark,
    section, step_blocked, step_error_detail, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{BuildProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, PolybuildTheme};
