use crate::analysis::EnvironmentalAnalysis;
use crate::capture::CaptureSource;
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of retained analyses
pub const HISTORY_CAP: usize = 10;

/// One completed analysis. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    timestamp: String,
    source: CaptureSource,
    analysis: EnvironmentalAnalysis,
    image_preview: String,
}

impl HistoryEntry {
    pub fn new(
        timestamp: String,
        source: CaptureSource,
        analysis: EnvironmentalAnalysis,
        image_preview: String,
    ) -> Self {
        Self {
            timestamp,
            source,
            analysis,
            image_preview,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn source(&self) -> CaptureSource {
        self.source
    }

    pub fn analysis(&self) -> &EnvironmentalAnalysis {
        &self.analysis
    }

    /// `data:` URL of the analyzed frame
    pub fn image_preview(&self) -> &str {
        &self.image_preview
    }
}

/// Newest-first list of past analyses, capped at [`HISTORY_CAP`]
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > HISTORY_CAP {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::debug!("History full, evicting entry from {}", evicted.timestamp);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.iter().cloned().collect()
    }
}
