//! Console output of audit lines

use fsaudit_core::{Emission, EmissionSink, EventKind};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Prints audit lines to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    color: bool,
}

impl ConsoleSink {
    /// Create a console sink, optionally colorizing the event label
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl EmissionSink for ConsoleSink {
    fn emit(&self, emission: &Emission) -> io::Result<()> {
        let line = render(emission, self.color);
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()
    }
}

/// Render one line for the terminal
pub fn render(emission: &Emission, color: bool) -> String {
    if !color {
        return emission.to_string();
    }

    let label = emission.kind.label();
    let label = match emission.kind {
        EventKind::Create => label.green().to_string(),
        EventKind::Write => label.cyan().to_string(),
        EventKind::Rename => label.yellow().to_string(),
        EventKind::Delete => label.red().bold().to_string(),
    };

    format!(
        "{} {} by {} (PID {}, User {}): {}",
        format!("[{}]", emission.formatted_timestamp()).dimmed(),
        label,
        emission.process,
        emission.pid,
        emission.owner,
        emission.path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use fsaudit_core::{Burst, BurstState, ProcessIdentity};
    use std::path::PathBuf;
    use std::time::Instant;

    fn emission(kind: EventKind) -> Emission {
        let burst = Burst {
            path: PathBuf::from("/mon/a.txt"),
            state: BurstState {
                last_update: Instant::now(),
                kind,
                pid: 7,
            },
        };
        Emission::new(burst, ProcessIdentity::unknown(), Local::now())
    }

    #[test]
    fn test_plain_matches_log_format() {
        let e = emission(EventKind::Write);
        assert_eq!(render(&e, false), e.to_string());
    }

    #[test]
    fn test_colored_keeps_fields() {
        let line = render(&emission(EventKind::Delete), true);
        assert!(line.contains("DELETED"));
        assert!(line.contains("\u{1b}["));
        assert!(line.ends_with("by unknown (PID 7, User unknown): /mon/a.txt"));
    }
}
