//! Category policies
//!
//! Every [`FileCategory`] maps to exactly one [`CategoryPolicy`]. The registry is
//! assembled once when configuration is loaded and is read-only afterwards, so it
//! can be shared across request handlers behind an `Arc` without locking.

use serde::{Deserialize, Serialize};

use crate::models::{FileCategory, UploadOptions};

const MB: u64 = 1024 * 1024;

/// Size and type rules for one upload category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    pub max_size_bytes: u64,
    /// Normalised MIME types, in display order.
    pub allowed_mime_types: Vec<String>,
    /// Whether binary content must corroborate the declared type.
    pub verify_magic_bytes: bool,
}

impl CategoryPolicy {
    pub fn new(max_size_bytes: u64, allowed_mime_types: &[&str]) -> Self {
        Self {
            max_size_bytes,
            allowed_mime_types: dedup_normalized(allowed_mime_types.iter().copied()),
            verify_magic_bytes: true,
        }
    }

    /// Built-in defaults for a category.
    pub fn default_for(category: FileCategory) -> Self {
        match category {
            FileCategory::SpeakerPhotos => {
                Self::new(5 * MB, &["image/jpeg", "image/png", "image/webp"])
            }
            FileCategory::SponsorLogos => {
                Self::new(2 * MB, &["image/png", "image/jpeg", "image/webp"])
            }
            FileCategory::LegalDocuments => Self::new(10 * MB, &["application/pdf"]),
            FileCategory::PressMaterials => Self::new(
                25 * MB,
                &["application/pdf", "image/jpeg", "image/png"],
            ),
            FileCategory::NewsImages => Self::new(
                5 * MB,
                &["image/jpeg", "image/png", "image/webp", "image/gif"],
            ),
        }
    }

    /// Merge per-call overrides over this policy.
    pub fn with_options(&self, options: &UploadOptions) -> Self {
        Self {
            max_size_bytes: options.max_size_bytes.unwrap_or(self.max_size_bytes),
            allowed_mime_types: options
                .allowed_mime_types
                .as_ref()
                .map(|types| dedup_normalized(types.iter().map(String::as_str)))
                .unwrap_or_else(|| self.allowed_mime_types.clone()),
            verify_magic_bytes: options
                .verify_magic_bytes
                .unwrap_or(self.verify_magic_bytes),
        }
    }

    pub fn allows(&self, mime_type: &str) -> bool {
        let normalized = normalize_mime_type(mime_type);
        self.allowed_mime_types.iter().any(|t| *t == normalized)
    }

    /// Allowed types as user-facing names: `image/jpeg` becomes `JPEG`.
    pub fn allowed_type_names(&self) -> String {
        let mut names: Vec<String> = Vec::with_capacity(self.allowed_mime_types.len());
        for mime in &self.allowed_mime_types {
            let subtype = mime.rsplit('/').next().unwrap_or(mime);
            let name = subtype.to_uppercase();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.join(", ")
    }

    /// Size limit rendered in megabytes, e.g. `5MB` or `1.5MB`.
    pub fn max_size_display(&self) -> String {
        format_megabytes(self.max_size_bytes)
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    if bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        let mb = bytes as f64 / MB as f64;
        let rendered = format!("{:.2}", mb);
        let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
        format!("{}MB", trimmed)
    }
}

/// Lower-case, trim, and drop parameters (`image/jpeg; q=1` becomes `image/jpeg`).
pub fn normalize_mime_type(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn dedup_normalized<'a>(types: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in types {
        let n = normalize_mime_type(t);
        if !n.is_empty() && !out.contains(&n) {
            out.push(n);
        }
    }
    out
}

/// Registry holding one policy per category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryPolicies {
    policies: [CategoryPolicy; 5],
}

impl Default for CategoryPolicies {
    fn default() -> Self {
        Self {
            policies: FileCategory::ALL.map(CategoryPolicy::default_for),
        }
    }
}

impl CategoryPolicies {
    /// Built-in defaults with `<CATEGORY>_MAX_SIZE_MB` and
    /// `<CATEGORY>_ALLOWED_CONTENT_TYPES` overrides applied.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::default();
        for category in FileCategory::ALL {
            let prefix = category.env_prefix();
            let policy = &mut registry.policies[category_index(category)];

            let size_var = format!("{}_MAX_SIZE_MB", prefix);
            if let Some(raw) = lookup(&size_var).filter(|s| !s.trim().is_empty()) {
                let mb: u64 = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("{} must be a whole number of megabytes", size_var)
                })?;
                if mb == 0 {
                    return Err(anyhow::anyhow!("{} must be greater than zero", size_var));
                }
                policy.max_size_bytes = mb
                    .checked_mul(MB)
                    .ok_or_else(|| anyhow::anyhow!("{} is too large", size_var))?;
            }

            let types_var = format!("{}_ALLOWED_CONTENT_TYPES", prefix);
            if let Some(raw) = lookup(&types_var).filter(|s| !s.trim().is_empty()) {
                let types = dedup_normalized(raw.split(','));
                if types.is_empty() {
                    return Err(anyhow::anyhow!("{} must list at least one type", types_var));
                }
                policy.allowed_mime_types = types;
            }
        }
        Ok(registry)
    }

    pub fn get(&self, category: FileCategory) -> &CategoryPolicy {
        &self.policies[category_index(category)]
    }

    /// Resolve the effective policy for one call.
    pub fn resolve(&self, category: FileCategory, options: &UploadOptions) -> CategoryPolicy {
        self.get(category).with_options(options)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileCategory, &CategoryPolicy)> {
        FileCategory::ALL.into_iter().zip(self.policies.iter())
    }
}

fn category_index(category: FileCategory) -> usize {
    match category {
        FileCategory::SpeakerPhotos => 0,
        FileCategory::SponsorLogos => 1,
        FileCategory::LegalDocuments => 2,
        FileCategory::PressMaterials => 3,
        FileCategory::NewsImages => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_every_category_has_a_policy() {
        let registry = CategoryPolicies::default();
        for (category, policy) in registry.iter() {
            assert_eq!(policy, &CategoryPolicy::default_for(category));
            assert!(policy.max_size_bytes > 0);
            assert!(!policy.allowed_mime_types.is_empty());
        }
        assert_eq!(registry.iter().count(), FileCategory::ALL.len());
    }

    #[test]
    fn test_allowed_type_names_are_uppercased_subtypes() {
        let policy = CategoryPolicy::default_for(FileCategory::PressMaterials);
        assert_eq!(policy.allowed_type_names(), "PDF, JPEG, PNG");
    }

    #[test]
    fn test_allows_normalizes_declared_type() {
        let policy = CategoryPolicy::default_for(FileCategory::SpeakerPhotos);
        assert!(policy.allows("IMAGE/JPEG"));
        assert!(policy.allows("image/png; charset=binary"));
        assert!(!policy.allows("image/gif"));
    }

    #[test]
    fn test_megabytes_render_whole_and_fractional() {
        assert_eq!(format_megabytes(5 * MB), "5MB");
        assert_eq!(format_megabytes(MB + MB / 2), "1.5MB");
        assert_eq!(format_megabytes(512 * 1024), "0.5MB");
    }

    #[test]
    fn test_options_override_policy() {
        let policy = CategoryPolicy::default_for(FileCategory::LegalDocuments);
        let merged = policy.with_options(&UploadOptions {
            max_size_bytes: Some(1024),
            allowed_mime_types: Some(vec!["Image/PNG".to_string()]),
            verify_magic_bytes: Some(false),
            scan_for_viruses: true,
        });
        assert_eq!(merged.max_size_bytes, 1024);
        assert_eq!(merged.allowed_mime_types, vec!["image/png".to_string()]);
        assert!(!merged.verify_magic_bytes);

        let untouched = policy.with_options(&UploadOptions::default());
        assert_eq!(untouched, policy);
    }

    #[test]
    fn test_lookup_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SPEAKER_PHOTOS_MAX_SIZE_MB", "8"),
            ("LEGAL_DOCUMENTS_ALLOWED_CONTENT_TYPES", "application/pdf, image/png"),
        ]);
        let registry =
            CategoryPolicies::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(
            registry.get(FileCategory::SpeakerPhotos).max_size_bytes,
            8 * MB
        );
        assert_eq!(
            registry
                .get(FileCategory::LegalDocuments)
                .allowed_mime_types,
            vec!["application/pdf".to_string(), "image/png".to_string()]
        );
        assert_eq!(
            registry.get(FileCategory::NewsImages),
            &CategoryPolicy::default_for(FileCategory::NewsImages)
        );
    }

    #[test]
    fn test_lookup_rejects_bad_sizes() {
        let bad = CategoryPolicies::from_lookup(|k| {
            (k == "NEWS_IMAGES_MAX_SIZE_MB").then(|| "lots".to_string())
        });
        assert!(bad.is_err());

        let zero = CategoryPolicies::from_lookup(|k| {
            (k == "NEWS_IMAGES_MAX_SIZE_MB").then(|| "0".to_string())
        });
        assert!(zero.is_err());

        let huge = CategoryPolicies::from_lookup(|k| {
            (k == "NEWS_IMAGES_MAX_SIZE_MB").then(|| u64::MAX.to_string())
        });
        assert!(huge.is_err());
    }
}
