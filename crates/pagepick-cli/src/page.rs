//! Loading page fixtures from disk.

use std::fs;
use std::path::{Path, PathBuf};

use pagepick_core::dom::{Document, MemoryDocument, PageFixture};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Cannot read page {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid page {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON page fixture and build its document.
pub fn load_page(path: &Path) -> Result<MemoryDocument, FixtureError> {
    let json = fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let fixture = PageFixture::from_json(&json).map_err(|source| FixtureError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = fixture.build();
    debug!("Loaded {} ({} elements)", path.display(), doc.elements().len());
    Ok(doc)
}
