// src/engine/backfill.rs
//
// Maintenance passes over existing image records: fill in missing dimensions
// and missing thumbnails. Records come from (and go back to) the caller's
// storage; this module only touches the files they point at.

use crate::engine::pool;
use crate::engine::probe::DimensionProbe;
use crate::engine::thumbnail::ThumbnailGenerator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// An image record's JSON metadata. Only the dimension and thumbnail keys are
/// owned by this crate; everything else the application stores (original
/// name, size, upload time, ...) is carried through `extra` untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb500: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb1000: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageMetadata {
    /// A zero side counts as missing.
    pub fn has_dimensions(&self) -> bool {
        matches!(self.width, Some(w) if w > 0) && matches!(self.height, Some(h) if h > 0)
    }

    pub fn has_thumbnails(&self) -> bool {
        let present = |t: &Option<String>| t.as_deref().is_some_and(|p| !p.is_empty());
        present(&self.thumb500) || present(&self.thumb1000)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub metadata: ImageMetadata,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl BackfillSummary {
    fn record(mut self, outcome: Outcome) -> Self {
        self.total += 1;
        match outcome {
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.errors += 1,
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            updated: self.updated + other.updated,
            skipped: self.skipped + other.skipped,
            errors: self.errors + other.errors,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Updated,
    Skipped,
    Failed,
}

fn run<F>(pass: &'static str, records: &mut [ImageRecord], f: F) -> BackfillSummary
where
    F: Fn(&mut ImageRecord) -> Outcome + Sync + Send,
{
    let summary = pool::install(|| {
        records
            .par_iter_mut()
            .map(|record| f(record))
            .fold(BackfillSummary::default, BackfillSummary::record)
            .reduce(BackfillSummary::default, BackfillSummary::merge)
    });
    tracing::info!(
        target: "alog_imaging::backfill",
        pass,
        total = summary.total,
        updated = summary.updated,
        skipped = summary.skipped,
        errors = summary.errors,
        "backfill finished"
    );
    summary
}

/// Fill `width`/`height` for records that lack either.
pub fn backfill_dimensions(probe: &DimensionProbe, records: &mut [ImageRecord]) -> BackfillSummary {
    run("dimensions", records, |record| {
        if record.metadata.has_dimensions() {
            return Outcome::Skipped;
        }
        match probe.probe_file(&record.path) {
            Ok(Some(probed)) => {
                record.metadata.width = Some(probed.dimensions.width);
                record.metadata.height = Some(probed.dimensions.height);
                tracing::info!(
                    target: "alog_imaging::backfill",
                    id = %record.id,
                    width = probed.dimensions.width,
                    height = probed.dimensions.height,
                    "dimensions updated"
                );
                Outcome::Updated
            }
            Ok(None) => {
                tracing::warn!(
                    target: "alog_imaging::backfill",
                    id = %record.id,
                    path = %record.path.display(),
                    "could not determine dimensions"
                );
                Outcome::Failed
            }
            Err(e) => {
                tracing::warn!(
                    target: "alog_imaging::backfill",
                    id = %record.id,
                    path = %record.path.display(),
                    error = %e,
                    "could not read image"
                );
                Outcome::Failed
            }
        }
    })
}

/// Generate thumbnails for records that have none, next to the image file.
pub fn backfill_thumbnails(
    generator: &ThumbnailGenerator,
    records: &mut [ImageRecord],
) -> BackfillSummary {
    run("thumbnails", records, |record| {
        if record.metadata.has_thumbnails() {
            return Outcome::Skipped;
        }
        let data = match std::fs::read(&record.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    target: "alog_imaging::backfill",
                    id = %record.id,
                    path = %record.path.display(),
                    error = %e,
                    "could not read image"
                );
                return Outcome::Failed;
            }
        };
        let filename = record
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = record.path.parent().unwrap_or_else(|| Path::new("."));

        let thumbnails = generator.generate_or_empty(&data, &filename, dir);
        if thumbnails.is_empty() {
            return Outcome::Failed;
        }
        record.metadata.thumb500 = thumbnails.thumb500().map(path_string);
        record.metadata.thumb1000 = thumbnails.thumb1000().map(path_string);
        tracing::info!(
            target: "alog_imaging::backfill",
            id = %record.id,
            count = thumbnails.len(),
            "thumbnails generated"
        );
        Outcome::Updated
    })
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_shape() {
        let meta = ImageMetadata {
            width: Some(4000),
            height: Some(3000),
            thumb500: None,
            thumb1000: Some("/u/m42_thumb1000.jpg".into()),
            ..ImageMetadata::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "width": 4000,
                "height": 3000,
                "thumb1000": "/u/m42_thumb1000.jpg"
            })
        );

        let parsed: ImageMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, ImageMetadata::default());
    }

    #[test]
    fn unknown_metadata_keys_survive_write_back() {
        let stored = serde_json::json!({
            "originalName": "m42.jpg",
            "size": 123456,
            "type": "image/jpeg",
            "uploadedAt": "2024-03-01T21:14:00.000Z",
            "thumb500": ""
        });
        let mut meta: ImageMetadata = serde_json::from_value(stored).unwrap();
        assert!(!meta.has_thumbnails());
        meta.width = Some(4000);
        meta.height = Some(3000);

        let written = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "originalName": "m42.jpg",
                "size": 123456,
                "type": "image/jpeg",
                "uploadedAt": "2024-03-01T21:14:00.000Z",
                "thumb500": "",
                "width": 4000,
                "height": 3000
            })
        );
    }

    #[test]
    fn zero_dimensions_count_as_missing() {
        let meta = ImageMetadata {
            width: Some(0),
            height: Some(300),
            ..ImageMetadata::default()
        };
        assert!(!meta.has_dimensions());
        let meta = ImageMetadata {
            width: Some(400),
            height: Some(300),
            ..ImageMetadata::default()
        };
        assert!(meta.has_dimensions());
    }

    #[test]
    fn summary_fold_and_merge() {
        let a = BackfillSummary::default()
            .record(Outcome::Updated)
            .record(Outcome::Skipped);
        let b = BackfillSummary::default().record(Outcome::Failed);
        assert_eq!(
            a.merge(b),
            BackfillSummary {
                total: 3,
                updated: 1,
                skipped: 1,
                errors: 1
            }
        );
    }

    #[test]
    fn dimensions_skip_and_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = vec![
            ImageRecord {
                id: "done".into(),
                path: dir.path().join("done.png"),
                metadata: ImageMetadata {
                    width: Some(1),
                    height: Some(1),
                    ..ImageMetadata::default()
                },
            },
            ImageRecord {
                id: "missing".into(),
                path: dir.path().join("missing.png"),
                metadata: ImageMetadata::default(),
            },
        ];
        let summary = backfill_dimensions(&DimensionProbe::sniff_only(), &mut records);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(records[1].metadata.width, None);
    }
}
