use std::path::PathBuf;

use crate::error::Result;
use crate::model::Settings;
use crate::reader::FileReader;

/// `settings.json`, read fresh on every call. A missing or corrupt file is an
/// error: there is no meaningful default to fall back to.
pub struct SettingsLoader {
    path: PathBuf,
    reader: FileReader,
}

impl SettingsLoader {
    pub fn new(path: PathBuf, reader: FileReader) -> Self {
        Self { path, reader }
    }

    pub async fn load(&self) -> Result<Settings> {
        self.reader.read_json(&self.path).await
    }
}
