//! Diagnostic entry shape (§6.3 of the initialization image contract).

use sabnf_core::SourceLocation;
use std::fmt;

/// Which pipeline stage produced a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    Validate,
    Translate,
    Analyze,
    Pppt,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Translate => "translate",
            Stage::Analyze => "analyze",
            Stage::Pppt => "pppt",
            Stage::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// One diagnostic: `{stage, source_location_optional, rendered_line, message}`.
#[derive(Clone, Debug)]
pub struct DiagnosticEntry {
    pub stage: Stage,
    pub location: Option<SourceLocation>,
    pub rendered_line: Option<String>,
    pub message: String,
}

impl DiagnosticEntry {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            location: None,
            rendered_line: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn at(mut self, location: SourceLocation, rendered_line: impl Into<String>) -> Self {
        self.location = Some(location);
        self.rendered_line = Some(rendered_line.into());
        self
    }
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)?;
        if let Some(loc) = self.location {
            write!(f, "\n  --> {}:{}", loc.line, loc.column)?;
            if let Some(line) = &self.rendered_line {
                write!(f, "\n  | {line}")?;
            }
        }
        Ok(())
    }
}
