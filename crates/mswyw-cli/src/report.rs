use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use mswyw_core::{MetricRecord, ScoringWindow};
use mswyw_providers::ProviderArgs;
use serde::Serialize;

use crate::runner::RunStage;

const RULE: &str = "--------------------------------------------------";

/// Outcome of a successful run, emitted on stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunReport {
    pub arguments: ProviderArgs,
    #[serde(flatten)]
    pub window: ScoringWindow,
    pub runtime_data: Vec<MetricRecord>,
    pub mswyw_score: f64,
    pub min_result: f64,
    pub failed_performance: bool,
    #[serde(skip)]
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        writeln!(out, "{json}")
    }

    /// Writes the report in the requested format and flushes `out`. The run
    /// only counts as reported once this succeeds.
    pub fn emit<W: Write>(&self, out: &mut W, verbose: bool) -> io::Result<()> {
        if verbose {
            self.write_verbose(out)?;
        } else {
            self.write_json(out)?;
        }
        out.flush()?;
        RunStage::Reported.reached();
        Ok(())
    }

    /// Human-readable report printed under `--verbose`.
    pub fn write_verbose<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let arguments = serde_json::to_string(&self.arguments).map_err(io::Error::other)?;
        writeln!(out, "====== mswyw ==========")?;
        writeln!(out, "{arguments}")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Sampling Start time: {}", rfc3339(self.window.start()))?;
        writeln!(out, "Sampling End time:   {}", rfc3339(self.window.end()))?;
        writeln!(out, "Instances:")?;
        for record in &self.runtime_data {
            let line = serde_json::to_string(record).map_err(io::Error::other)?;
            writeln!(out, "  {line}")?;
        }
        writeln!(out, "{RULE}")?;
        writeln!(out, "Started : {}", rfc3339(self.started_at))?;
        writeln!(out, "Finished: {}", rfc3339(self.finished_at))?;
        let elapsed = self.finished_at - self.started_at;
        writeln!(out, "Total: {} ms", elapsed.num_milliseconds())?;
        writeln!(out, "mswyw score: {}", self.mswyw_score)?;
        if self.failed_performance {
            writeln!(out, "below minimum result {}", self.min_result)?;
        }
        writeln!(out, "{RULE}")
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
