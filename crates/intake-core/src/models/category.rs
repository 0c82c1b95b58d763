use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Purpose an upload is made for. Each category has exactly one
/// [`CategoryPolicy`](crate::CategoryPolicy) and doubles as the storage key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    SpeakerPhotos,
    SponsorLogos,
    LegalDocuments,
    PressMaterials,
    NewsImages,
}

impl FileCategory {
    pub const ALL: [FileCategory; 5] = [
        FileCategory::SpeakerPhotos,
        FileCategory::SponsorLogos,
        FileCategory::LegalDocuments,
        FileCategory::PressMaterials,
        FileCategory::NewsImages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::SpeakerPhotos => "speaker-photos",
            FileCategory::SponsorLogos => "sponsor-logos",
            FileCategory::LegalDocuments => "legal-documents",
            FileCategory::PressMaterials => "press-materials",
            FileCategory::NewsImages => "news-images",
        }
    }

    /// Prefix used for environment overrides, e.g. `SPEAKER_PHOTOS`.
    pub fn env_prefix(&self) -> String {
        self.as_str().replace('-', "_").to_uppercase()
    }
}

impl FromStr for FileCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        FileCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown file category: {}", s))
    }
}

impl Display for FileCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
