use serde::Serialize;

/// A file as handed over by the front end, before validation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// The validated image the next submission will carry.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub size: u64,
}

impl SelectedFile {
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            size: self.size,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,
    pub media_type: String,
    pub size: u64,
}
