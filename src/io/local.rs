use std::path::Path;

use super::ByteSource;
use crate::Result;

impl ByteSource {
    /// Load a whole file from disk into memory.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = tokio::fs::read(path.as_ref()).await?;
        Ok(Self::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_file_reads_everything() {
        let path = std::env::temp_dir().join(format!("zipscan-local-{}.bin", std::process::id()));
        tokio::fs::write(&path, b"PK\x05\x06").await.unwrap();

        let source = ByteSource::from_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(source.len(), 4);
        assert_eq!(source.signature_at(0), Some(0x06054b50));
    }

    #[tokio::test]
    async fn test_from_file_missing() {
        let err = ByteSource::from_file("/nonexistent/zipscan/archive.zip")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
