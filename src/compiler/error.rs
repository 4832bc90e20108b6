use colored::Colorize;
use std::fmt;

use crate::compiler::tokens::DisplaySpan;

/// Represents the phase of compilation where an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerPhase {
    Lexing,
    Parsing,
    Codegen,
    Driver,
}

impl fmt::Display for CompilerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilerPhase::Lexing => "Lexing",
            CompilerPhase::Parsing => "Parsing",
            CompilerPhase::Codegen => "Code Generation",
            CompilerPhase::Driver => "Driver",
        };
        write!(f, "{name}")
    }
}

/// Severity level of an error or diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "{}", "warning".yellow()),
            Severity::Error => write!(f, "{}", "error".red()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub phase: CompilerPhase,
    pub message: String,
    pub span: Option<DisplaySpan>,
    pub help: Option<String>,
    pub note: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, phase: CompilerPhase) -> Self {
        Self {
            severity: Severity::Error,
            phase,
            message: message.into(),
            span: None,
            help: None,
            note: None,
        }
    }

    pub fn with_span(mut self, span: DisplaySpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

fn write_snippet(span: &DisplaySpan, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, " {} {}", "-->".blue(), span)?;

    let Ok(content) = std::fs::read_to_string(&span.file) else {
        return Ok(());
    };
    let Some(line) = content.lines().nth(span.start.0.saturating_sub(1)) else {
        return Ok(());
    };

    let line_num = span.start.0.to_string();
    let padding = " ".repeat(line_num.len());
    writeln!(f, "{} {}", padding, "|".blue())?;
    writeln!(f, "{} {} {}", line_num.blue(), "|".blue().bold(), line)?;

    let col_start = span.start.1.saturating_sub(1);
    let len = if span.end.0 == span.start.0 {
        span.end.1.saturating_sub(span.start.1).saturating_add(1).max(1)
    } else {
        line.len().saturating_sub(col_start).max(1)
    };
    writeln!(
        f,
        "{} {} {}{}",
        padding,
        "|".blue(),
        " ".repeat(col_start),
        "^".repeat(len).red().bold()
    )
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = format!("[{}]", self.phase).dimmed();
        writeln!(f, "{}{}: {}", self.severity, phase, self.message.bright_white().bold())?;
        if let Some(span) = &self.span {
            write_snippet(span, f)?;
        }
        if let Some(help) = &self.help {
            writeln!(f, "{} {}", "help:".green().bold(), help)?;
        }
        if let Some(note) = &self.note {
            writeln!(f, "{} {}", "note:".blue().bold(), note)?;
        }
        Ok(())
    }
}

pub fn print_reports(reports: &[Diagnostic]) {
    for report in reports {
        eprintln!("{report}");
    }
    if !reports.is_empty() {
        eprintln!("{}: {} found", "errors".red().bold(), reports.len());
    }
}
