//! Flat per-task export of an aggregation summary.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::aggregation::aggregator::{OverallTotals, ResultAggregator, Summary};
use crate::error::Result;
use crate::orchestration::{TaskId, TaskStatus};

/// One exported row per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub task_id: TaskId,
    pub total_in: u64,
    pub total_out: u64,
    pub current_count: i64,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    exported_at: DateTime<Utc>,
    overall: OverallTotals,
    tasks: &'a [ExportRecord],
}

impl Summary {
    pub fn export_records(&self) -> Vec<ExportRecord> {
        self.per_task
            .iter()
            .map(|(task_id, s)| ExportRecord {
                task_id: task_id.clone(),
                total_in: s.latest.total_in,
                total_out: s.latest.total_out,
                current_count: s.latest.current_count,
                status: s.latest.status,
            })
            .collect()
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let records = self.export_records();
        let export = JsonExport {
            exported_at: self.generated_at,
            overall: self.overall,
            tasks: &records,
        };
        serde_json::to_writer_pretty(writer, &export)?;
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for record in self.export_records() {
            csv.serialize(record)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn write<W: Write>(&self, writer: W, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => self.write_json(writer),
            ExportFormat::Csv => self.write_csv(writer),
        }
    }
}

impl ResultAggregator {
    /// Write the current summary to a timestamped file under `dir`.
    ///
    /// Failures are logged and returned; ingestion is unaffected.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>, format: ExportFormat) -> Result<PathBuf> {
        let summary = self.summary();
        let dir = dir.as_ref();
        let path = dir.join(format!(
            "results_{}.{}",
            summary.generated_at.format("%Y%m%d_%H%M%S%.3f"),
            format.extension()
        ));

        match write_file(&path, &summary, format) {
            Ok(()) => {
                info!("results exported to {}", path.display());
                Ok(path)
            }
            Err(e) => {
                error!("failed to export results to {}: {e}", path.display());
                Err(e)
            }
        }
    }
}

fn write_file(path: &Path, summary: &Summary, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    summary.write(&mut writer, format)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::CountResult;

    fn aggregator() -> ResultAggregator {
        let agg = ResultAggregator::new();
        for (task, total_in, total_out, status) in [
            ("camera_a", 4, 1, TaskStatus::Processing),
            ("video_b", 2, 3, TaskStatus::Failed),
        ] {
            agg.ingest(CountResult {
                task_id: TaskId::new(task),
                worker_id: "worker-01".into(),
                timestamp: Utc::now(),
                frame_index: 10,
                fps: 25.0,
                total_in,
                total_out,
                current_count: total_in as i64 - total_out as i64,
                status,
                error: None,
                threshold_exceeded: false,
                objects: vec![],
            });
        }
        agg
    }

    #[test]
    fn test_csv_rows() {
        let mut out = Vec::new();
        aggregator().summary().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "task_id,total_in,total_out,current_count,status");
        assert_eq!(lines[1], "camera_a,4,1,3,processing");
        assert_eq!(lines[2], "video_b,2,3,-1,failed");
    }

    #[test]
    fn test_json_export() {
        let mut out = Vec::new();
        aggregator().summary().write_json(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["overall"]["total_in"], 6);
        assert_eq!(value["tasks"][1]["status"], "failed");
        assert_eq!(value["tasks"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_export_to_dir() {
        let dir = std::env::temp_dir().join(format!("peoplecount-export-{}", std::process::id()));
        let path = aggregator().export_to_dir(&dir, ExportFormat::Csv).unwrap();
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_export_failure_does_not_block_ingest() {
        let file = std::env::temp_dir().join(format!("peoplecount-not-a-dir-{}", std::process::id()));
        fs::write(&file, b"x").unwrap();

        let agg = aggregator();
        assert!(agg.export_to_dir(&file, ExportFormat::Json).is_err());
        agg.ingest(CountResult {
            task_id: TaskId::new("video_c"),
            worker_id: "worker-02".into(),
            timestamp: Utc::now(),
            frame_index: 1,
            fps: 0.0,
            total_in: 1,
            total_out: 0,
            current_count: 1,
            status: TaskStatus::Processing,
            error: None,
            threshold_exceeded: false,
            objects: vec![],
        });
        assert_eq!(agg.summary().per_task.len(), 3);
        let _ = fs::remove_file(&file);
    }
}
