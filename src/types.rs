/// Media kind of a remote favorite, as reported by the API's `media` extra.
///
/// Anything the API reports that is neither `photo` nor `video` parses to
/// `Other` and is treated as an invariant violation by the fetch planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_api(s: &str) -> Self {
        match s {
            "photo" => MediaKind::Photo,
            "video" => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }

    /// Local file extension for this kind. Photos are always saved as jpg
    /// and videos as mp4, regardless of the source format.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            MediaKind::Photo => Some("jpg"),
            MediaKind::Video => Some("mp4"),
            MediaKind::Other => None,
        }
    }
}

/// Size tiers a favorite may be available in, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeTier {
    Original,
    Large,
    Medium,
    Small,
}

impl SizeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeTier::Original => "original",
            SizeTier::Large => "large",
            SizeTier::Medium => "medium",
            SizeTier::Small => "small",
        }
    }
}

impl std::fmt::Display for SizeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
