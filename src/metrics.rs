//! Debug-only generation report.
//!
//! When the form endpoint runs with `debug=true`, a human-readable summary of
//! the generation is written to the configured reports directory. Losing that
//! file never fails the PDF call; the caller logs and moves on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub pages: usize,
    pub cells: usize,
    pub build: Duration,
    pub layout: Duration,
    pub serialize: Duration,
    pub output_bytes: usize,
}

impl GenerationReport {
    pub fn render_text(&self) -> String {
        format!(
            "form 220 generation report\n\
             pages:      {}\n\
             cells:      {}\n\
             build:      {:.2} ms\n\
             layout:     {:.2} ms\n\
             serialize:  {:.2} ms\n\
             output:     {} bytes\n",
            self.pages,
            self.cells,
            self.build.as_secs_f64() * 1000.0,
            self.layout.as_secs_f64() * 1000.0,
            self.serialize.as_secs_f64() * 1000.0,
            self.output_bytes,
        )
    }

    /// Write the report as `report-form220-<timestamp>.txt` under `dir` and
    /// return the path written.
    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        let stamp = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year]-[month]-[day]-[hour]-[minute]-[second]"
            ))
            .map_err(io::Error::other)?;
        let path = dir.join(format!("report-form220-{stamp}.txt"));
        fs::write(&path, self.render_text())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn saves_a_timestamped_text_file() {
        let dir = TempDir::new().expect("temp dir");
        let report = GenerationReport {
            pages: 2,
            cells: 120,
            build: Duration::from_millis(3),
            layout: Duration::from_millis(1),
            serialize: Duration::from_millis(12),
            output_bytes: 48_000,
        };

        let path = report.save(dir.path()).expect("save report");
        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("report-form220-"));
        assert!(name.ends_with(".txt"));

        let body = fs::read_to_string(&path).expect("read back");
        assert!(body.contains("pages:      2"));
        assert!(body.contains("48000 bytes"));
    }

    #[test]
    fn unwritable_directory_is_an_error_not_a_panic() {
        let report = GenerationReport::default();
        assert!(report.save(Path::new("/nonexistent/reports")).is_err());
    }
}
