//! Colored output helpers for CLI
//!
//! Status lines go to stderr so stdout only ever carries the report.

use crate::progress::{EventType, ProgressEvent};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the banner
    pub fn banner(&self) {
        if self.colored {
            eprintln!(
                "\n   {} {}\n",
                "deep-research".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            eprintln!("\n   deep-research v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            eprintln!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            eprintln!("    {}: {}", key, value);
        }
    }

    /// Print a progress event, tagged with its type.
    pub fn event(&self, event: &ProgressEvent) {
        let tag = format!("[{}]", event.event_type);
        if !self.colored {
            eprintln!("{} {}", tag, event.message);
            return;
        }

        let tag = match event.event_type {
            EventType::Error | EventType::ToolError => tag.red().bold().to_string(),
            EventType::PlanStart | EventType::PlanSection | EventType::PlanEnd => {
                tag.magenta().bold().to_string()
            }
            EventType::Thought => tag.cyan().to_string(),
            EventType::Task | EventType::Action => tag.yellow().to_string(),
            EventType::Findings | EventType::SectionComplete | EventType::ReportComplete => {
                tag.green().to_string()
            }
            _ => tag.dimmed().to_string(),
        };
        eprintln!("{} {}", tag, event.message);
    }
}
