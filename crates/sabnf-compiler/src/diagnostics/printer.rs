//! Builder-pattern printer for rendering diagnostics with source context.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use super::collection::Diagnostics;

/// Builder for rendering a `Diagnostics` log.
pub struct DiagnosticsPrinter<'d> {
    diagnostics: &'d Diagnostics,
    path: Option<&'d str>,
    colored: bool,
}

impl<'d> DiagnosticsPrinter<'d> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            path: None,
            colored: false,
        }
    }

    #[must_use]
    pub fn path(mut self, path: &'d str) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, entry) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }

            let Some(line) = &entry.rendered_line else {
                write!(w, "{entry}")?;
                continue;
            };
            let Some(loc) = entry.location else {
                write!(w, "{entry}")?;
                continue;
            };

            let column = (loc.column.saturating_sub(1)) as usize;
            let end = (column + 1).min(line.len().max(1));
            let mut snippet = Snippet::source(line.as_str())
                .line_start(loc.line as usize)
                .annotation(
                    AnnotationKind::Primary
                        .span(column..end)
                        .label(&entry.message),
                );
            if let Some(p) = self.path {
                snippet = snippet.path(p);
            }

            let title = format!("{}: {}", entry.stage, entry.message);
            let report = [Level::ERROR.primary_title(&title).element(snippet)];
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }
}

impl Diagnostics {
    pub fn printer(&self) -> DiagnosticsPrinter<'_> {
        DiagnosticsPrinter::new(self)
    }
}
