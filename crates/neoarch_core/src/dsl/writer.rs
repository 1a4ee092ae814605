//! Line buffer with block indentation.

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub(crate) struct IndentWriter {
    lines: Vec<String>,
    depth: usize,
}

impl IndentWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
            return;
        }
        self.lines
            .push(format!("{}{}", INDENT.repeat(self.depth), text));
    }

    pub(crate) fn blank(&mut self) {
        self.line("");
    }

    /// Writes `header {`, runs `body` one level deeper, then `}`.
    pub(crate) fn block(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Self)) {
        self.line(format!("{} {{", header.as_ref()));
        self.depth += 1;
        body(self);
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    pub(crate) fn finish(self) -> String {
        self.lines.join("\n")
    }
}
