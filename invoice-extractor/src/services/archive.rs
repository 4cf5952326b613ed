use chrono::{DateTime, Local, TimeZone};
use service_core::error::AppError;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Write-only archive of uploaded invoices, kept for audit/debugging.
///
/// Files are named after the upload time with one-second resolution; two
/// uploads in the same second overwrite each other.
pub struct UploadArchive {
    base_path: PathBuf,
}

impl UploadArchive {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn save(&self, data: &[u8]) -> Result<PathBuf, AppError> {
        let path = self.base_path.join(archive_file_name(&Local::now()));
        fs::write(&path, data).await.map_err(|e| {
            tracing::error!(path = ?path, error = %e, "Failed to archive upload");
            AppError::internal(format!("Failed to save file: {}", e))
        })?;

        tracing::info!(path = ?path, size = data.len(), "File saved");
        Ok(path)
    }
}

/// `inv_<DD>_<MM>_<YYYY>_<HH>_<MM>_<SS>.pdf`
pub fn archive_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("inv_{}.pdf", at.format("%d_%m_%Y_%H_%M_%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn file_name_uses_day_first_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(archive_file_name(&at), "inv_05_03_2025_14_07_09.pdf");
    }

    #[tokio::test]
    async fn save_writes_bytes_under_base_path() {
        let dir = std::env::temp_dir().join(format!("archive-test-{}", std::process::id()));
        let archive = UploadArchive::new(&dir).await.unwrap();

        let path = archive.save(b"%PDF-1.5").await.unwrap();

        assert!(path.starts_with(&dir));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.5");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn new_accepts_existing_directory() {
        let dir = std::env::temp_dir().join(format!("archive-reopen-{}", std::process::id()));
        UploadArchive::new(&dir).await.unwrap();
        let archive = UploadArchive::new(&dir).await.unwrap();

        assert!(tokio::fs::metadata(archive.base_path()).await.unwrap().is_dir());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn new_fails_when_path_is_a_file() {
        let file = std::env::temp_dir().join(format!("archive-file-{}", std::process::id()));
        tokio::fs::write(&file, b"x").await.unwrap();

        let result = UploadArchive::new(&file).await;

        assert!(result.is_err());
        let _ = tokio::fs::remove_file(&file).await;
    }
}
