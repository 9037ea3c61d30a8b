use std::collections::BTreeSet;

const VIDEO_INPUTS: &[&str] = &[
    "mp4", "mkv", "mov", "avi", "flv", "wmv", "webm", "mpeg", "mpg", "3gp", "m4v", "ts", "mts",
    "vob", "ogv", "qt", "rm", "rmvb", "ivf", "f4v",
];

const VIDEO_OUTPUTS: &[&str] = &[
    // Containers
    "mp4", "mkv", "avi", "flv", "wmv", "webm", "mpeg", "mpg", "3gp", "mov", "m4v", "ts",
    // Audio extraction
    "ogg", "mp3", "wav", "aac", "flac", "opus", "amr", "wma",
];

/// Outputs of the video profile that imply dropping the video stream.
const VIDEO_AUDIO_ONLY: &[&str] = &["mp3", "wav", "aac", "flac", "ogg", "opus", "amr", "wma"];

const AUDIO_INPUTS: &[&str] = &[
    "mp3", "wav", "aac", "flac", "ogg", "wma", "m4a", "aiff", "alac", "amr", "opus", "ac3", "au",
    "pcm", "tta", "wv", "ra", "voc", "mid", "midi",
];

const AUDIO_OUTPUTS: &[&str] = &[
    "mp3", "wav", "aac", "flac", "ogg", "wma", "m4a", "aiff", "alac", "amr", "opus", "ac3", "au",
    "pcm", "tta", "wv", "ra", "voc",
];

/// Static format compatibility table.
///
/// A conversion is accepted when the input extension is a supported input and the
/// output extension is a supported output. There is no pairing matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTable {
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
    audio_only: BTreeSet<String>,
}

impl FormatTable {
    pub fn new(
        inputs: impl IntoIterator<Item = String>,
        outputs: impl IntoIterator<Item = String>,
        audio_only: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(|f| normalize(&f)).collect(),
            outputs: outputs.into_iter().map(|f| normalize(&f)).collect(),
            audio_only: audio_only.into_iter().map(|f| normalize(&f)).collect(),
        }
    }

    /// Container/video inputs, with audio extraction outputs.
    pub fn video() -> Self {
        Self::from_static(VIDEO_INPUTS, VIDEO_OUTPUTS, VIDEO_AUDIO_ONLY)
    }

    /// Audio codecs only. Never drops a video stream.
    pub fn audio() -> Self {
        Self::from_static(AUDIO_INPUTS, AUDIO_OUTPUTS, &[])
    }

    fn from_static(inputs: &[&str], outputs: &[&str], audio_only: &[&str]) -> Self {
        Self::new(
            inputs.iter().map(|s| s.to_string()),
            outputs.iter().map(|s| s.to_string()),
            audio_only.iter().map(|s| s.to_string()),
        )
    }

    pub fn with_inputs(mut self, inputs: BTreeSet<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: BTreeSet<String>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_audio_only(mut self, audio_only: BTreeSet<String>) -> Self {
        self.audio_only = audio_only;
        self
    }

    pub fn is_allowed(&self, input_ext: &str, output_ext: &str) -> bool {
        self.inputs.contains(&normalize(input_ext)) && self.outputs.contains(&normalize(output_ext))
    }

    pub fn is_audio_only(&self, output_ext: &str) -> bool {
        self.audio_only.contains(&normalize(output_ext))
    }

    /// Sorted, lowercase.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.iter().cloned().collect()
    }

    /// Sorted, lowercase.
    pub fn outputs(&self) -> Vec<String> {
        self.outputs.iter().cloned().collect()
    }

    pub fn audio_only(&self) -> Vec<String> {
        self.audio_only.iter().cloned().collect()
    }
}

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Parses a comma separated extension list such as `"mp3, .WAV,flac"`.
pub fn parse_format_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(normalize)
        .filter(|f| !f.is_empty())
        .collect()
}
