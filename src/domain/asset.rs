/// An audio file sitting in the asset directory, ready to be enclosed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub file_name: String,
    pub length: u64,
    /// True when the file was already on disk and no download happened
    pub reused: bool,
}

impl LocalAsset {
    pub fn downloaded(file_name: String, length: u64) -> Self {
        Self {
            file_name,
            length,
            reused: false,
        }
    }

    pub fn reused(file_name: String, length: u64) -> Self {
        Self {
            file_name,
            length,
            reused: true,
        }
    }
}
