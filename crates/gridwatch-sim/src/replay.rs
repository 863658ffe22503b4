//! ---
//! gw_section: "11-simulation-test-harness"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation runtime helpers and scenario engines."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;

use crate::frames::PoleTelemetryFrame;

/// Raw frame representation when deserializing scenarios.
#[derive(Debug, Deserialize)]
pub struct ScenarioFrame {
    pub pole_id: String,
    pub timestamp: String,
    pub voltage_v: f64,
    pub current_a: f64,
    #[serde(default)]
    pub fault: Option<String>,
    #[serde(default)]
    pub scenario_label: Option<String>,
}

impl ScenarioFrame {
    fn into_frame(self) -> PoleTelemetryFrame {
        PoleTelemetryFrame {
            pole_id: self.pole_id,
            timestamp: self.timestamp.parse().unwrap_or_else(|_| chrono::Utc::now()),
            voltage_v: self.voltage_v,
            current_a: self.current_a,
            synthetic: false,
            fault: self.fault.as_deref().and_then(|raw| raw.parse().ok()),
            scenario_label: self.scenario_label,
        }
    }
}

/// In-memory scenario replay helper that iterates deterministic telemetry.
#[derive(Debug, Default, Clone)]
pub struct ReplayEngine {
    frames: Vec<PoleTelemetryFrame>,
    cursor: usize,
}

impl ReplayEngine {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(path),
            Some("csv") => Self::from_csv(path),
            _ => anyhow::bail!("unsupported scenario format: {}", path.display()),
        }
    }

    /// Return the next frame recorded for `pole_id`, cycling the scenario.
    ///
    /// Returns `None` when the scenario never mentions the pole, letting the
    /// caller fall back to synthetic generation.
    pub fn next_frame_for(&mut self, pole_id: &str) -> Option<PoleTelemetryFrame> {
        if self.frames.is_empty() {
            return None;
        }
        for step in 0..self.frames.len() {
            let index = (self.cursor + step) % self.frames.len();
            if self.frames[index].pole_id == pole_id {
                self.cursor = (index + 1) % self.frames.len();
                return Some(self.frames[index].clone());
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn from_json(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read scenario file {}", path.display()))?;
        let raw_frames: Vec<ScenarioFrame> = serde_json::from_str(&contents)
            .with_context(|| format!("invalid scenario JSON {}", path.display()))?;
        Ok(Self {
            frames: raw_frames.into_iter().map(ScenarioFrame::into_frame).collect(),
            cursor: 0,
        })
    }

    fn from_csv(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("unable to open scenario csv {}", path.display()))?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut frames = Vec::new();
        for row in reader.deserialize::<ScenarioFrame>() {
            let raw = row.with_context(|| format!("invalid scenario row in {}", path.display()))?;
            frames.push(raw.into_frame());
        }
        Ok(Self { frames, cursor: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use gridwatch_common::fault::FaultKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_json_scenarios() -> Result<()> {
        let mut file = NamedTempFile::with_suffix(".json")?;
        writeln!(
            file,
            "{}",
            r#"[{"pole_id":"pole-01","timestamp":"2026-01-01T00:00:00Z","voltage_v":228.0,"current_a":11.5,"fault":"voltage_sag"}]"#
        )?;
        file.flush()?;
        let path = file.into_temp_path();
        let mut replay = ReplayEngine::from_path(path.as_ref())?;
        let frame = replay.next_frame_for("pole-01").expect("frame expected");
        assert!(!frame.synthetic);
        assert_eq!(frame.fault, Some(FaultKind::VoltageSag));
        path.close()?;
        Ok(())
    }

    #[test]
    fn loads_csv_scenarios() -> Result<()> {
        let mut file = NamedTempFile::with_suffix(".csv")?;
        writeln!(file, "pole_id,timestamp,voltage_v,current_a,fault")?;
        writeln!(file, "pole-01,2026-01-01T00:00:00Z,231.0,12.4,")?;
        file.flush()?;
        let path = file.into_temp_path();
        let mut replay = ReplayEngine::from_path(path.as_ref())?;
        let frame = replay.next_frame_for("pole-01").expect("frame expected");
        assert_eq!(frame.voltage_v, 231.0);
        assert!(frame.fault.is_none());
        path.close()?;
        Ok(())
    }

    #[test]
    fn frames_cycle_and_filter_by_pole() {
        let mut replay = ReplayEngine {
            frames: vec![
                PoleTelemetryFrame::synthetic("pole-01", 230.0, 10.0),
                PoleTelemetryFrame::synthetic("pole-02", 231.0, 11.0),
                PoleTelemetryFrame::synthetic("pole-01", 229.0, 12.0),
            ],
            cursor: 0,
        };
        let first = replay.next_frame_for("pole-01").unwrap();
        let second = replay.next_frame_for("pole-01").unwrap();
        let third = replay.next_frame_for("pole-01").unwrap();
        assert_eq!(first.current_a, 10.0);
        assert_eq!(second.current_a, 12.0);
        assert_eq!(third.current_a, 10.0);
        assert!(replay.next_frame_for("pole-09").is_none());
    }
}
