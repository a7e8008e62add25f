//! Leveled console reporting.
//!
//! The sink is passed explicitly into the grading engine and the local
//! validator instead of living as ambient print helpers, so tests can
//! capture output and alternative frontends can re-render it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Pass,
    Fail,
    Warn,
    Info,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Pass => "[PASS]",
            Level::Fail => "[FAIL]",
            Level::Warn => "[WARN]",
            Level::Info => "[INFO]",
        }
    }
}

pub trait ReportSink {
    /// One tagged status line.
    fn line(&mut self, level: Level, msg: &str);

    /// A section header.
    fn header(&mut self, title: &str);

    /// Untagged continuation text (remediation steps, commands to run).
    fn raw(&mut self, msg: &str);
}

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const BLUE: &str = "\x1b[94m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Writes tagged, optionally colored lines to stdout.
pub struct ConsoleSink {
    color: bool,
}

impl ConsoleSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, level: Level) -> &'static str {
        if !self.color {
            return "";
        }
        match level {
            Level::Pass => GREEN,
            Level::Fail => RED,
            Level::Warn => YELLOW,
            Level::Info => BLUE,
        }
    }
}

impl ReportSink for ConsoleSink {
    fn line(&mut self, level: Level, msg: &str) {
        let reset = if self.color { RESET } else { "" };
        println!("{}{} {msg}{reset}", self.paint(level), level.tag());
    }

    fn header(&mut self, title: &str) {
        let (bold, reset) = if self.color { (BOLD, RESET) } else { ("", "") };
        let bar = "=".repeat(60);
        println!("\n{bold}{bar}\n {title}\n{bar}{reset}\n");
    }

    fn raw(&mut self, msg: &str) {
        println!("{msg}");
    }
}

/// Captures everything for assertions in tests.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub lines: Vec<(Level, String)>,
    pub headers: Vec<String>,
    pub raw: Vec<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl ReportSink for BufferSink {
    fn line(&mut self, level: Level, msg: &str) {
        self.lines.push((level, msg.to_string()));
    }

    fn header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn raw(&mut self, msg: &str) {
        self.raw.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink_records_levels_and_headers() {
        let mut sink = BufferSink::new();
        sink.header("I2C COMMUNICATION");
        sink.line(Level::Pass, "I2C bus initialized");
        sink.line(Level::Fail, "AHT20 error: no ack");
        sink.raw("  sudo i2cdetect -y 1");

        assert_eq!(sink.headers, vec!["I2C COMMUNICATION"]);
        assert!(sink.contains(Level::Pass, "initialized"));
        assert!(sink.contains(Level::Fail, "AHT20"));
        assert!(!sink.contains(Level::Warn, "initialized"));
        assert_eq!(sink.raw.len(), 1);
    }

    #[test]
    fn level_tags_are_stable() {
        assert_eq!(Level::Pass.tag(), "[PASS]");
        assert_eq!(Level::Fail.tag(), "[FAIL]");
        assert_eq!(Level::Warn.tag(), "[WARN]");
        assert_eq!(Level::Info.tag(), "[INFO]");
    }
}
