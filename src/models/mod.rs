use crate::services::staging::StagedFile;

/// A submitted file sitting in the staging directory.
///
/// Owned by the request that created it; the staged bytes are removed when it drops.
#[derive(Debug)]
pub struct Upload {
    /// Fresh per request, shared with the artifact produced from this upload.
    pub id: String,
    pub original_filename: String,
    pub sanitized_filename: String,
    pub size: u64,
    pub file: StagedFile,
}

/// The file written by the conversion tool, ready to be streamed back.
#[derive(Debug)]
pub struct ConversionArtifact {
    pub id: String,
    /// `{base}.{ext}`, what the client sees in Content-Disposition
    pub download_name: String,
    pub extension: String,
    pub file: StagedFile,
}
