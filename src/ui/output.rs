//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, Style};

/// Step severity, rendered as a cliclack log line or a bracketed CI prefix
#[derive(Debug, Clone, Copy)]
enum Mark {
    Ok,
    Warn,
    Fail,
}

impl Mark {
    fn plain_prefix(self) -> String {
        match self {
            Mark::Ok => style("[OK]").green().to_string(),
            Mark::Warn => style("[WARN]").yellow().to_string(),
            Mark::Fail => style("[FAIL]").red().to_string(),
        }
    }

    fn log(self, message: String) {
        let _ = match self {
            Mark::Ok => cliclack::log::success(message),
            Mark::Warn => cliclack::log::warning(message),
            Mark::Fail => cliclack::log::error(message),
        };
    }
}

fn step(ctx: &UiContext, mark: Mark, fancy: String, plain: String) {
    if ctx.use_fancy_output() {
        mark.log(fancy);
    } else {
        println!("  {} {}", mark.plain_prefix(), plain);
    }
}

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).blue().bold()).ok();
    } else {
        println!("{}", style(title).blue().bold());
        println!();
    }
}

fn outro(ctx: &UiContext, message: &str, color: Style, tag: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(color.bold().apply_to(message)).ok();
    } else {
        println!();
        println!("{} {}", color.apply_to(tag), message);
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, message, Style::new().green(), "[OK]");
}

/// Display error outro
pub fn outro_error(ctx: &UiContext, message: &str) {
    outro(ctx, message, Style::new().red(), "[ERROR]");
}

/// Display warning outro
pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, message, Style::new().yellow(), "[WARN]");
}

/// Display a note box
pub fn note(ctx: &UiContext, title: &str, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::note(title, message).ok();
    } else {
        println!("{}:", style(title).bold());
        for line in message.lines() {
            println!("  {}", line);
        }
    }
}

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Ok, message.to_string(), message.to_string());
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(
        ctx,
        Mark::Ok,
        format!("{} ({})", message, style(detail).dim()),
        format!("{} ({})", message, detail),
    );
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Warn, message.to_string(), message.to_string());
}

/// Warning followed by a dimmed suggestion
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step(
        ctx,
        Mark::Warn,
        format!("{} - {}", message, style(hint).dim()),
        format!("{} - {}", message, hint),
    );
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(
        ctx,
        Mark::Fail,
        format!("{}: {}", message, style(detail).red()),
        format!("{}: {}", message, detail),
    );
}

/// Display a unit skipped because an upstream unit did not build
pub fn step_blocked(ctx: &UiContext, name: &str, reason: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(format!(
            "{} - {}",
            style(name).dim(),
            style(reason).dim()
        ))
        .ok();
    } else {
        println!("  {} {} ({})", style("[-]").dim(), name, reason);
    }
}

/// Display a dimmed remark
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Key-value pair colored by whether the value is healthy
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    if ctx.use_fancy_output() {
        let value_style = if ok {
            Style::new().green()
        } else {
            Style::new().yellow()
        };
        println!("  {}: {}", style(key).dim(), value_style.apply_to(value));
    } else {
        let prefix = if ok { "[OK]" } else { "[WARN]" };
        println!("  {} {}: {}", prefix, key, value);
    }
}
