//! Build and sync progress reporting.
//!
//! Progress is emitted on **stderr** so stdout stays parseable for scripts.
//! The reconciler emits [`ProgressEvent`]s; this module renders them as
//! human lines or JSON objects.

use std::io::Write;

use codesearch_core::progress::{NoProgress, ProgressEvent, ProgressReporter};

/// Human-friendly progress on stderr: "sync backend  embedding  1,234 / 5,000 files (24.68%)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovering { op, alias } => {
                format!("{} {}  discovering...\n", op.as_str(), alias)
            }
            ProgressEvent::Processing { op, alias, n, total } => format!(
                "{} {}  embedding  {} / {} files ({:.2}%)\n",
                op.as_str(),
                alias,
                format_number(*n),
                format_number(*total),
                event.percent().unwrap_or(100.0)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

fn event_json(event: &ProgressEvent) -> serde_json::Value {
    match event {
        ProgressEvent::Discovering { op, alias } => serde_json::json!({
            "event": "progress",
            "op": op.as_str(),
            "project": alias,
            "phase": "discovering"
        }),
        ProgressEvent::Processing { op, alias, n, total } => serde_json::json!({
            "event": "progress",
            "op": op.as_str(),
            "project": alias,
            "phase": "embedding",
            "n": n,
            "total": total
        }),
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesearch_core::progress::Operation;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_event_fields() {
        let value = event_json(&ProgressEvent::Processing {
            op: Operation::Sync,
            alias: "web".into(),
            n: 3,
            total: 9,
        });
        assert_eq!(value["op"], "sync");
        assert_eq!(value["project"], "web");
        assert_eq!(value["phase"], "embedding");
        assert_eq!(value["n"], 3);
        assert_eq!(value["total"], 9);
    }
}
