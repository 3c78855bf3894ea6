use super::DashboardSink;
use crate::session::{CurrentAnalysis, SessionSnapshot};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

/// Emits one JSON object per presentation, for piping into other tools
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Record<'a> {
    camera_active: bool,
    has_preview: bool,
    error: Option<String>,
    current: Option<&'a CurrentAnalysis>,
    history_len: usize,
}

impl<W: Write> DashboardSink for JsonLinesSink<W> {
    fn present(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        let record = Record {
            camera_active: snapshot.camera_active,
            has_preview: snapshot.has_preview,
            error: snapshot.error.as_ref().map(ToString::to_string),
            current: snapshot.current.as_ref(),
            history_len: snapshot.history.len(),
        };

        serde_json::to_writer(&mut self.out, &record).context("Failed to serialize session record")?;
        self.out.write_all(b"\n").context("Failed to write session record")?;
        self.out.flush().context("Failed to flush session record")
    }
}
