use owo_colors::{OwoColorize, Style};

/// A byte range into the script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// A message attached to a span of the source.
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// An error report: header, labelled source excerpts and trailing help lines.
///
/// Scanner, parser and runtime errors all convert into this type so the
/// command line front end can print them uniformly.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<String>,
    pub message: String,
    /// 1-based line the error was reported on, used when no label span is usable.
    pub line: Option<usize>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            line: None,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.notes.push(format!("help: {}", help.into()));
        self
    }
}

/// Computes the 1-based line and column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn line_text(source: &str, line_num: usize) -> Option<&str> {
    source
        .split('\n')
        .nth(line_num.checked_sub(1)?)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

pub struct DiagnosticRenderer<'a> {
    source: &'a str,
    file_name: &'a str,
    use_color: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(source: &'a str, file_name: &'a str, use_color: bool) -> Self {
        Self {
            source,
            file_name,
            use_color,
        }
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();
        self.render_header(&mut output, diagnostic);

        let labels: Vec<&Label> = diagnostic
            .labels
            .iter()
            .filter(|label| !label.span.is_dummy() && label.span.start <= self.source.len())
            .collect();

        let mut lines_to_show: Vec<usize> = labels
            .iter()
            .map(|label| line_col(self.source, label.span.start).0)
            .collect();
        lines_to_show.sort_unstable();
        lines_to_show.dedup();

        if let Some(label) = labels.first() {
            let (line, col) = line_col(self.source, label.span.start);
            output.push_str(&format!(
                "  {} {}:{}:{}\n",
                self.paint("-->", self.gutter_style()),
                self.file_name,
                line,
                col
            ));
        } else if let Some(line) = diagnostic.line {
            output.push_str(&format!(
                "  {} {}:{}\n",
                self.paint("-->", self.gutter_style()),
                self.file_name,
                line
            ));
        }

        if !lines_to_show.is_empty() {
            let width = lines_to_show.last().copied().unwrap_or(1).to_string().len();
            let gutter = format!("{} {}", " ".repeat(width + 1), self.paint("|", self.gutter_style()));

            output.push_str(&gutter);
            output.push('\n');
            for &line_num in &lines_to_show {
                self.render_line(&mut output, &labels, line_num, width, &gutter);
            }
            output.push_str(&gutter);
            output.push('\n');
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("  {} {}\n", self.paint("=", self.gutter_style()), note));
        }

        output
    }

    fn render_header(&self, output: &mut String, diagnostic: &Diagnostic) {
        let severity = self.paint("error", Style::new().red().bold());
        let message = self.paint(&diagnostic.message, Style::new().bold());

        match &diagnostic.code {
            Some(code) => output.push_str(&format!("{}[{}]: {}\n", severity, code, message)),
            None => output.push_str(&format!("{}: {}\n", severity, message)),
        }
    }

    fn render_line(&self, output: &mut String, labels: &[&Label], line_num: usize, width: usize, gutter: &str) {
        let Some(content) = line_text(self.source, line_num) else {
            return;
        };

        output.push_str(&format!(
            "{:>width$} {} {}\n",
            self.paint(&line_num.to_string(), self.gutter_style()),
            self.paint("|", self.gutter_style()),
            content,
            width = width + 1
        ));

        let mut on_line: Vec<(usize, usize, &Label)> = labels
            .iter()
            .filter_map(|label| {
                let (start_line, start_col) = line_col(self.source, label.span.start);
                if start_line != line_num {
                    return None;
                }
                let end = label.span.end.max(label.span.start + 1);
                let (end_line, end_col) = line_col(self.source, end - 1);
                let end_col = if end_line == line_num { end_col + 1 } else { content.chars().count() + 1 };
                Some((start_col, end_col.max(start_col + 1), *label))
            })
            .collect();
        on_line.sort_by_key(|(start, _, _)| *start);

        for (start_col, end_col, label) in on_line {
            let style = Style::new().red().bold();
            let underline = "^".repeat(end_col - start_col);
            output.push_str(&format!(
                "{} {}{} {}\n",
                gutter,
                " ".repeat(start_col - 1),
                self.paint(&underline, style),
                self.paint(&label.message, style)
            ));
        }
    }

    fn gutter_style(&self) -> Style {
        Style::new().blue().bold()
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.use_color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Renders every diagnostic followed by an abort summary.
pub fn render_diagnostics(source: &str, file_name: &str, diagnostics: &[Diagnostic], use_color: bool) -> String {
    let renderer = DiagnosticRenderer::new(source, file_name, use_color);
    let mut output = String::new();

    for diagnostic in diagnostics {
        output.push_str(&renderer.render(diagnostic));
        output.push('\n');
    }

    let error_count = diagnostics.len();
    if error_count > 0 {
        let plural = if error_count == 1 { "" } else { "s" };
        output.push_str(&format!("error: aborting due to {} error{}\n", error_count, plural));
    }

    output
}
