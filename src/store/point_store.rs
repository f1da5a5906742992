use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::error::{StoreError, StoreResult};
use crate::point::Point;
use crate::sink::{RemoteSink, SubmissionError};

/// Outcome of one [`PointStore::drain_all`] pass.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub delivered: usize,
    pub remaining: usize,
    /// Why the drain stopped early, if it did.
    pub failure: Option<SubmissionError>,
}

impl DrainReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

pub struct PointStore {
    path: PathBuf,
    // Serializes append and drain; held across the sink calls of a drain.
    lock: Mutex<()>,
}

impl PointStore {
    /// Opens (or creates) the backlog file at `path`.
    ///
    /// A trailing partial line left by a crash mid-append is cut off.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(path)?;
        truncate_torn_tail(path)?;

        Ok(PointStore {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds `point` to the tail of the backlog. Durable once this returns `Ok`.
    pub async fn append(&self, point: &Point) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        append_line(&self.path, point)?;
        log::debug!("Buffered point {} in {}", point.id, self.path.display());
        Ok(())
    }

    /// Submits buffered points oldest-first until the sink fails.
    ///
    /// The failed point and everything after it stay in the backlog in their
    /// original order. Sink failures are reported in the [`DrainReport`];
    /// only persistence failures are returned as errors.
    pub async fn drain_all(&self, sink: &dyn RemoteSink) -> StoreResult<DrainReport> {
        let _guard = self.lock.lock().await;
        let points = read_points(&self.path)?;
        if points.is_empty() {
            return Ok(DrainReport::default());
        }

        let mut report = DrainReport::default();
        for point in &points {
            match sink.submit(point).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    log::warn!("Backlog drain stopped at point {}: {}", point.id, e);
                    report.failure = Some(e);
                    break;
                }
            }
        }

        report.remaining = points.len() - report.delivered;
        if report.delivered > 0 {
            rewrite_points(&self.path, &points[report.delivered..])?;
        }

        log::info!(
            "Backlog drained: {} delivered, {} remaining",
            report.delivered,
            report.remaining
        );
        Ok(report)
    }

    pub async fn peek_all(&self) -> StoreResult<Vec<Point>> {
        let _guard = self.lock.lock().await;
        read_points(&self.path)
    }

    pub async fn len(&self) -> StoreResult<usize> {
        Ok(self.peek_all().await?.len())
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

fn append_line(path: &Path, point: &Point) -> StoreResult<()> {
    let json = serde_json::to_string(point)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let previous_len = file.metadata()?.len();

    let written = writeln!(file, "{}", json).and_then(|_| file.sync_all());
    if let Err(e) = written {
        // Don't leave half a line for the next append to run into.
        if let Err(rollback) = file.set_len(previous_len) {
            log::error!("Failed to roll back partial append: {}", rollback);
        }
        return Err(e.into());
    }
    Ok(())
}

fn read_points(path: &Path) -> StoreResult<Vec<Point>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut points = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let point = serde_json::from_str(&line).map_err(|e| StoreError::Corrupt {
            line: i + 1,
            message: e.to_string(),
        })?;
        points.push(point);
    }
    Ok(points)
}

/// Replaces the backlog with `points` via write-to-temp and rename.
fn rewrite_points(path: &Path, points: &[Point]) -> StoreResult<()> {
    let tmp = path.with_extension("jsonl.tmp");
    {
        let mut file = File::create(&tmp)?;
        for point in points {
            writeln!(file, "{}", serde_json::to_string(point)?)?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    sync_parent_dir(path)?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> StoreResult<()> {
    Ok(())
}

fn truncate_torn_tail(path: &Path) -> StoreResult<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let mut content = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut content)?;
    let keep = content
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|idx| idx as u64 + 1)
        .unwrap_or(0);

    log::warn!(
        "Dropping {} bytes of incomplete entry at end of {}",
        len - keep,
        path.display()
    );
    file.set_len(keep)?;
    file.sync_all()?;
    Ok(())
}
