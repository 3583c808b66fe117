use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use crate::models::{MarketSnapshot, OptimizationResult};

pub struct LocalStorage {
    reports_dir: PathBuf,
    snapshots_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: &str) -> Self {
        let data_dir = PathBuf::from(base_dir);
        let reports_dir = data_dir.join("reports");
        let snapshots_dir = data_dir.join("snapshots");

        fs::create_dir_all(&reports_dir).ok();
        fs::create_dir_all(&snapshots_dir).ok();

        Self {
            reports_dir,
            snapshots_dir,
        }
    }

    fn stamp(at: &DateTime<Utc>) -> String {
        at.format("%Y-%m-%dT%H-%M-%S").to_string()
    }

    pub fn save_report(&self, report: &OptimizationResult) -> std::io::Result<PathBuf> {
        let filename = format!("report_{}.json", Self::stamp(&report.generated_at));
        let path = self.reports_dir.join(&filename);

        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, report)?;
        tracing::info!("💾 Report saved: {} ({} recommendations)", filename, report.recommendations.len());
        Ok(path)
    }

    pub fn save_snapshot(&self, snapshot: &MarketSnapshot) -> std::io::Result<PathBuf> {
        let filename = format!("snapshot_{}.json", Self::stamp(&snapshot.as_of));
        let path = self.snapshots_dir.join(&filename);

        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, snapshot)?;
        tracing::info!("📦 Snapshot saved: {} ({} chains)", filename, snapshot.historical.len());
        Ok(path)
    }

    pub fn load_snapshot(path: &Path) -> std::io::Result<MarketSnapshot> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot = serde_json::from_reader(reader)?;
        Ok(snapshot)
    }

    pub fn report_count(&self) -> usize {
        fs::read_dir(&self.reports_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
