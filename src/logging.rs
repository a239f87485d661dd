use std::fs::OpenOptions;
use std::io::Write;

use chrono::Local;

/// Opt-in plain-text log of the visible conversation. This is diagnostic
/// output, not transcript persistence; the transcript itself never outlives
/// the session.
pub struct SessionLog {
    file_path: Option<String>,
    is_active: bool,
}

impl SessionLog {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let log = SessionLog {
            is_active: log_file.is_some(),
            file_path: log_file,
        };

        if log.is_active {
            log.append(&format!(
                "--- session started {} ---",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ))?;
        }

        Ok(log)
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Write one message, preserving its line structure, followed by a blank
    /// spacer line matching the screen display.
    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active {
            return Ok(());
        }
        for line in content.lines() {
            self.append(line)?;
        }
        self.append("")?;
        Ok(())
    }

    fn append(&self, line: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(path) = self.file_path.as_ref() else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_log_writes_nothing() {
        let log = SessionLog::new(None).expect("create");
        assert!(!log.is_active());
        assert!(log.log_message("hello").is_ok());
    }

    #[test]
    fn active_log_appends_messages_with_spacing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.log");
        let log = SessionLog::new(Some(path.display().to_string())).expect("create");

        log.log_message("You: hi").expect("log");
        log.log_message("two\nlines").expect("log");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert!(contents.starts_with("--- session started"));
        assert!(contents.contains("You: hi\n\n"));
        assert!(contents.contains("two\nlines\n\n"));
    }
}
