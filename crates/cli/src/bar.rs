//! Text progress bar.

use std::io::Write;
use tally_core::Sink;

/// Sink drawing a single-line bar on stdout.
pub struct Bar {
    width: usize,
    label: String,
}

impl Bar {
    /// Create a bar `width` characters wide.
    pub fn new(label: impl Into<String>, width: usize) -> Self {
        Self {
            width: width.max(1),
            label: label.into(),
        }
    }

    fn render(&self, value: f64) -> String {
        let filled = ((value.clamp(0.0, 1.0) * self.width as f64).round() as usize).min(self.width);
        format!(
            "{} [{}{}] {:5.1}%",
            self.label,
            "#".repeat(filled),
            " ".repeat(self.width - filled),
            value * 100.0
        )
    }
}

impl Sink for Bar {
    fn report(&self, value: f64) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r{}", self.render(value));
        if value >= 1.0 {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let bar = Bar::new("work", 10);
        assert_eq!(bar.render(0.0), "work [          ]   0.0%");
        assert_eq!(bar.render(0.5), "work [#####     ]  50.0%");
        assert_eq!(bar.render(1.0), "work [##########] 100.0%");
    }
}
