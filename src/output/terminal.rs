use super::{DashboardSink, ScoreBand};
use crate::analysis::EnvironmentalAnalysis;
use crate::capture::CaptureSource;
use crate::session::{SessionSnapshot, HISTORY_CAP, REFERENCE_ZONE};
use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;

const RULE: &str = "------------------------------------------------------------";

/// Plain-text dashboard written to any `Write` (stdout in the CLI)
pub struct TerminalDashboard<W: Write> {
    out: W,
}

impl<W: Write> TerminalDashboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> DashboardSink for TerminalDashboard<W> {
    fn present(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut text = String::new();
        render(&mut text, snapshot).context("Failed to render dashboard")?;
        self.out
            .write_all(text.as_bytes())
            .context("Failed to write dashboard")?;
        self.out.flush().context("Failed to flush dashboard")
    }
}

pub fn render(out: &mut impl fmt::Write, snapshot: &SessionSnapshot) -> fmt::Result {
    if let Some(err) = &snapshot.error {
        writeln!(out, "!! {}  (reset to retry)", err)?;
    }

    let sensor = if snapshot.has_preview {
        "UPLOAD_HELD"
    } else if snapshot.camera_active {
        "OPTICAL_LIVE"
    } else {
        "OFFLINE"
    };
    writeln!(out, "SENSOR: {}{}", sensor, if snapshot.analyzing { "  [ANALYZING]" } else { "" })?;

    match &snapshot.current {
        Some(current) => {
            let clock = match current.source {
                CaptureSource::Live => format!("{} {}", current.timestamp, REFERENCE_ZONE),
                CaptureSource::Upload => "clock disregarded".to_string(),
            };
            writeln!(out, "{}", RULE)?;
            writeln!(out, "AUDIT  source={}  ({})", current.source, clock)?;
            render_analysis(out, &current.analysis)?;
        }
        None => {
            writeln!(out, "No audit yet.")?;
        }
    }

    writeln!(out, "{}", RULE)?;
    writeln!(out, "AUDIT_HISTORY {}/{}", snapshot.history.len(), HISTORY_CAP)?;
    for entry in &snapshot.history {
        let clock = if entry.source().is_live() {
            entry.timestamp()
        } else {
            "--:--:--"
        };
        writeln!(
            out,
            "  {}  {:<6}  {:>5.0}_INDEX  {:>5} KB  {}",
            clock,
            entry.source(),
            entry.analysis().sleep_score.current,
            entry.image_preview().len() / 1024,
            entry.analysis().circadian_phase
        )?;
    }

    Ok(())
}

fn render_analysis(out: &mut impl fmt::Write, analysis: &EnvironmentalAnalysis) -> fmt::Result {
    let score = &analysis.sleep_score;
    writeln!(
        out,
        "SLEEP SCORE  {:.0} -> {:.0}  (+{:.0})  [{}]",
        score.current,
        score.optimized,
        score.improvement,
        ScoreBand::for_score(score.current).label()
    )?;
    writeln!(out, "  {}", score.description)?;
    writeln!(out, "PHASE  {}", analysis.circadian_phase)?;

    let pre = &analysis.pre_sync_status;
    writeln!(out, "\nPRE-SYNC")?;
    writeln!(out, "  spectrum   {}", pre.kelvin_range)?;
    writeln!(out, "  intensity  {} ({})", pre.intensity_description, pre.lux_equivalent)?;
    if !pre.stressors.is_empty() {
        writeln!(out, "  stressors  {}", pre.stressors.join(" // "))?;
    }
    writeln!(out, "  mismatch   {}", pre.mismatch_description)?;

    let post = &analysis.post_sync_projection;
    writeln!(out, "\nPOST-SYNC")?;
    writeln!(out, "  target     {} @ {}", post.ideal_kelvin, post.target_intensity)?;
    writeln!(out, "  recovery   {}", post.recovery_time)?;
    writeln!(out, "  expected   {}", post.expected_improvement)?;

    let impact = &analysis.bio_logic_impact;
    writeln!(out, "\nBIO-IMPACT")?;
    writeln!(out, "  {}", impact.impact_assessment)?;
    writeln!(
        out,
        "  melatonin {}  sleep delay {}",
        impact.melatonin_reduction_range, impact.sleep_delay_range
    )?;
    writeln!(out, "  ref: {}", impact.citation)?;

    if !analysis.wellness_forecast.is_empty() {
        writeln!(out, "\nFORECAST")?;
        for item in &analysis.wellness_forecast {
            writeln!(
                out,
                "  {:<8} {:<16} {:<28} {}",
                item.time,
                item.status.label(),
                item.activity,
                item.rationale
            )?;
        }
    }

    let suggestion = &analysis.activity_suggestion;
    writeln!(out, "\nANCHOR")?;
    writeln!(
        out,
        "  {} ({})  {}  {}",
        suggestion.location, suggestion.coordinates, suggestion.suggested_time, suggestion.activity
    )?;
    writeln!(out, "  {}", suggestion.rationale)?;

    let iot = &analysis.iot_concept;
    writeln!(
        out,
        "\nSMART-HOME  {} via {} {} [{}]",
        iot.target, iot.integration, iot.protocol, iot.status
    )?;
    match serde_json::to_string_pretty(&iot.command) {
        Ok(payload) => {
            for line in payload.lines() {
                writeln!(out, "  {}", line)?;
            }
        }
        Err(err) => tracing::warn!("Failed to render smart-home payload: {}", err),
    }

    Ok(())
}
