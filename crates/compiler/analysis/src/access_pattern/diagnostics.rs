//! Append-only diagnostic output of the access pattern pass.

/// Human-readable trace lines
///
/// Every line is emitted through `tracing` under the `access_pattern`
/// target; keeping a copy in memory is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticLog {
    lines: Vec<String>,
    recording: bool,
}

impl DiagnosticLog {
    pub const fn new(recording: bool) -> Self {
        Self {
            lines: Vec::new(),
            recording,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "access_pattern", "{}", line);
        if self.recording {
            self.lines.push(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns true if any recorded line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl std::fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
