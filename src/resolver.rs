//! Definition Resolver.
//!
//! Loads immutable test definitions from a backing content store, given an
//! opaque content reference. A reference resolves either to a fragment
//! directory (`assessment.json`, optional `banks.json` / `changelog.json`,
//! optional `statics/` media directory) or to a packed `<ref>.bundle`
//! archive that is extracted exactly once into a scratch directory and
//! cached for subsequent lookups within the same resolver instance.
//!
//! Lookups by identifier return `None` rather than failing: absent
//! fragments are a valid possibility during authoring-time validation.

use crate::definition::{AssessmentDef, ChangelogEntry, ItemDef, ObjectBankDef, SectionDef};
use crate::error::ResolveError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

const BUNDLE_VERSION: u32 = 1;
const UNPACK_MARKER: &str = ".unpacked";

/// Contract for resolving definition fragments.
pub trait DefinitionResolver: Send + Sync {
    /// The root assessment definition, or `None` when the reference does
    /// not resolve to a bundle.
    fn assessment(&self, reference: &str) -> Result<Option<Arc<AssessmentDef>>, ResolveError>;

    /// A named section fragment.
    fn section(&self, reference: &str, ident: &str) -> Result<Option<SectionDef>, ResolveError>;

    /// A named item fragment, searched across sections and object banks.
    fn item(&self, reference: &str, ident: &str) -> Result<Option<ItemDef>, ResolveError>;

    /// A named object bank.
    fn object_bank(
        &self,
        reference: &str,
        ident: &str,
    ) -> Result<Option<ObjectBankDef>, ResolveError>;

    /// Stable base directory for resolving embedded media references.
    fn statics_base_uri(&self, reference: &str) -> Result<Option<PathBuf>, ResolveError>;

    /// Authoring revision notes, empty when the bundle carries none.
    fn changelog(&self, reference: &str) -> Result<Vec<ChangelogEntry>, ResolveError>;
}

/// One fully loaded, validated bundle.
struct ResolvedBundle {
    assessment: Arc<AssessmentDef>,
    banks: HashMap<String, ObjectBankDef>,
    changelog: Vec<ChangelogEntry>,
    statics_dir: Option<PathBuf>,
}

/// Filesystem-backed resolver with per-reference caching.
pub struct BundleResolver {
    content_root: PathBuf,
    scratch_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<ResolvedBundle>>>,
}

impl BundleResolver {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(content_root: P, scratch_dir: Q) -> Self {
        BundleResolver {
            content_root: content_root.as_ref().to_path_buf(),
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn resolve(&self, reference: &str) -> Result<Option<Arc<ResolvedBundle>>, ResolveError> {
        if let Some(bundle) = self.cache.read().get(reference) {
            return Ok(Some(Arc::clone(bundle)));
        }

        let dir = self.content_root.join(reference);
        let bundle_dir = if dir.is_dir() {
            dir
        } else {
            let packed = self.content_root.join(format!("{}.bundle", reference));
            if !packed.is_file() {
                debug!(reference = reference, "Content reference did not resolve");
                return Ok(None);
            }
            self.unpack(reference, &packed)?
        };

        let bundle = Arc::new(load_bundle_dir(&bundle_dir)?);
        bundle.assessment.validate()?;
        self.cache
            .write()
            .insert(reference.to_string(), Arc::clone(&bundle));
        Ok(Some(bundle))
    }

    /// Extract a packed bundle into the scratch directory.
    ///
    /// Idempotent: a marker file records a completed extraction and makes
    /// repeats (including across resolver instances) a no-op.
    fn unpack(&self, reference: &str, packed: &Path) -> Result<PathBuf, ResolveError> {
        let target = self.scratch_dir.join(sanitize_reference(reference));
        if target.join(UNPACK_MARKER).is_file() {
            return Ok(target);
        }

        let bytes = fs::read(packed)?;
        let archive: PackedBundle =
            bincode::deserialize(&bytes).map_err(|e| ResolveError::UnpackFailed {
                reference: reference.to_string(),
                reason: format!("undecodable archive: {}", e),
            })?;
        if archive.version != BUNDLE_VERSION {
            return Err(ResolveError::UnpackFailed {
                reference: reference.to_string(),
                reason: format!("unsupported bundle version: {}", archive.version),
            });
        }

        for file in &archive.files {
            let rel = Path::new(&file.path);
            if rel.is_absolute() || rel.components().any(|c| c.as_os_str() == "..") {
                return Err(ResolveError::UnpackFailed {
                    reference: reference.to_string(),
                    reason: format!("unsafe path in archive: {}", file.path),
                });
            }
            let out = target.join(rel);
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out, &file.contents)?;
        }
        // Marker written last: a crashed extraction is retried in full.
        fs::write(target.join(UNPACK_MARKER), b"")?;
        info!(reference = reference, target = %target.display(), "Unpacked definition bundle");
        Ok(target)
    }
}

impl DefinitionResolver for BundleResolver {
    fn assessment(&self, reference: &str) -> Result<Option<Arc<AssessmentDef>>, ResolveError> {
        Ok(self.resolve(reference)?.map(|b| Arc::clone(&b.assessment)))
    }

    fn section(&self, reference: &str, ident: &str) -> Result<Option<SectionDef>, ResolveError> {
        Ok(self
            .resolve(reference)?
            .and_then(|b| b.assessment.section(ident).cloned()))
    }

    fn item(&self, reference: &str, ident: &str) -> Result<Option<ItemDef>, ResolveError> {
        let Some(bundle) = self.resolve(reference)? else {
            return Ok(None);
        };
        if let Some(item) = bundle.assessment.item(ident) {
            return Ok(Some(item.clone()));
        }
        Ok(bundle
            .banks
            .values()
            .flat_map(|bank| bank.items.iter())
            .find(|i| i.ident == ident)
            .cloned())
    }

    fn object_bank(
        &self,
        reference: &str,
        ident: &str,
    ) -> Result<Option<ObjectBankDef>, ResolveError> {
        Ok(self
            .resolve(reference)?
            .and_then(|b| b.banks.get(ident).cloned()))
    }

    fn statics_base_uri(&self, reference: &str) -> Result<Option<PathBuf>, ResolveError> {
        Ok(self.resolve(reference)?.and_then(|b| b.statics_dir.clone()))
    }

    fn changelog(&self, reference: &str) -> Result<Vec<ChangelogEntry>, ResolveError> {
        Ok(self
            .resolve(reference)?
            .map(|b| b.changelog.clone())
            .unwrap_or_default())
    }
}

fn load_bundle_dir(dir: &Path) -> Result<ResolvedBundle, ResolveError> {
    let assessment_path = dir.join("assessment.json");
    let bytes = fs::read(&assessment_path).map_err(|_| ResolveError::InvalidBundle {
        path: dir.to_path_buf(),
        reason: "missing assessment.json".to_string(),
    })?;
    let assessment: AssessmentDef =
        serde_json::from_slice(&bytes).map_err(|e| ResolveError::InvalidBundle {
            path: assessment_path,
            reason: e.to_string(),
        })?;

    let banks_path = dir.join("banks.json");
    let banks = if banks_path.is_file() {
        let bytes = fs::read(&banks_path)?;
        let banks: Vec<ObjectBankDef> =
            serde_json::from_slice(&bytes).map_err(|e| ResolveError::InvalidBundle {
                path: banks_path,
                reason: e.to_string(),
            })?;
        banks.into_iter().map(|b| (b.ident.clone(), b)).collect()
    } else {
        HashMap::new()
    };

    let changelog_path = dir.join("changelog.json");
    let changelog = if changelog_path.is_file() {
        let bytes = fs::read(&changelog_path)?;
        serde_json::from_slice(&bytes).map_err(|e| ResolveError::InvalidBundle {
            path: changelog_path,
            reason: e.to_string(),
        })?
    } else {
        Vec::new()
    };

    let statics = dir.join("statics");
    let statics_dir = statics.is_dir().then_some(statics);

    Ok(ResolvedBundle {
        assessment: Arc::new(assessment),
        banks,
        changelog,
        statics_dir,
    })
}

fn sanitize_reference(reference: &str) -> String {
    reference
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// On-disk archive format for packed bundles.
#[derive(Debug, Serialize, Deserialize)]
struct PackedBundle {
    version: u32,
    files: Vec<PackedFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackedFile {
    path: String,
    contents: Vec<u8>,
}

/// Pack a fragment directory into a single bundle archive.
///
/// Counterpart of the resolver's unpack step; used by content pipelines
/// and tests to produce `<ref>.bundle` files.
pub fn pack_bundle(src_dir: &Path, out_file: &Path) -> Result<(), ResolveError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ResolveError::InvalidBundle {
            path: src_dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(|e| ResolveError::InvalidBundle {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        files.push(PackedFile {
            path: rel.to_string_lossy().replace('\\', "/"),
            contents: fs::read(entry.path())?,
        });
    }

    let archive = PackedBundle {
        version: BUNDLE_VERSION,
        files,
    };
    let bytes = bincode::serialize(&archive).map_err(|e| ResolveError::InvalidBundle {
        path: out_file.to_path_buf(),
        reason: e.to_string(),
    })?;
    if let Some(parent) = out_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out_file, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_fragment_dir(root: &Path, reference: &str) {
        let dir = root.join(reference);
        fs::create_dir_all(dir.join("statics")).unwrap();
        fs::write(
            dir.join("assessment.json"),
            serde_json::to_vec_pretty(&json!({
                "ident": "a1",
                "title": "Sample",
                "sections": [
                    {"ident": "s1", "title": "One", "items": [
                        {"ident": "i1", "title": "Q1", "template": {"correct": "a"}}
                    ]}
                ]
            }))
            .unwrap(),
        )
        .unwrap();
        fs::write(
            dir.join("banks.json"),
            serde_json::to_vec_pretty(&json!([
                {"ident": "bank1", "items": [
                    {"ident": "b1", "title": "Pool item"}
                ]}
            ]))
            .unwrap(),
        )
        .unwrap();
        fs::write(
            dir.join("changelog.json"),
            serde_json::to_vec_pretty(&json!([
                {"version": "2", "date": "2024-03-01", "note": "reworded Q1"}
            ]))
            .unwrap(),
        )
        .unwrap();
        fs::write(dir.join("statics").join("figure.png"), b"png").unwrap();
    }

    #[test]
    fn test_directory_bundle_lookups() {
        let content = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        write_fragment_dir(content.path(), "quiz");
        let resolver = BundleResolver::new(content.path(), scratch.path());

        let assessment = resolver.assessment("quiz").unwrap().unwrap();
        assert_eq!(assessment.ident, "a1");
        assert_eq!(resolver.section("quiz", "s1").unwrap().unwrap().ident, "s1");
        assert_eq!(resolver.item("quiz", "i1").unwrap().unwrap().ident, "i1");
        // Bank items are found through the same lookup.
        assert_eq!(resolver.item("quiz", "b1").unwrap().unwrap().ident, "b1");
        assert_eq!(
            resolver.object_bank("quiz", "bank1").unwrap().unwrap().ident,
            "bank1"
        );
        let changelog = resolver.changelog("quiz").unwrap();
        assert_eq!(changelog.len(), 1);
        assert_eq!(changelog[0].note, "reworded Q1");
        let statics = resolver.statics_base_uri("quiz").unwrap().unwrap();
        assert!(statics.join("figure.png").is_file());
    }

    #[test]
    fn test_absent_fragments_are_none() {
        let content = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        write_fragment_dir(content.path(), "quiz");
        let resolver = BundleResolver::new(content.path(), scratch.path());

        assert!(resolver.assessment("missing").unwrap().is_none());
        assert!(resolver.section("quiz", "nope").unwrap().is_none());
        assert!(resolver.item("quiz", "nope").unwrap().is_none());
        assert!(resolver.object_bank("quiz", "nope").unwrap().is_none());
        assert!(resolver.statics_base_uri("missing").unwrap().is_none());
        assert!(resolver.changelog("missing").unwrap().is_empty());
    }

    #[test]
    fn test_packed_bundle_roundtrip_and_idempotent_unpack() {
        let content = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        write_fragment_dir(content.path(), "src");
        pack_bundle(
            &content.path().join("src"),
            &content.path().join("quiz.bundle"),
        )
        .unwrap();
        fs::remove_dir_all(content.path().join("src")).unwrap();

        let resolver = BundleResolver::new(content.path(), scratch.path());
        let assessment = resolver.assessment("quiz").unwrap().unwrap();
        assert_eq!(assessment.ident, "a1");
        assert!(scratch.path().join("quiz").join(UNPACK_MARKER).is_file());

        // A second resolver instance over the same scratch reuses the
        // extraction instead of re-writing it.
        let touched = scratch.path().join("quiz").join("assessment.json");
        let before = fs::metadata(&touched).unwrap().modified().unwrap();
        let resolver2 = BundleResolver::new(content.path(), scratch.path());
        assert!(resolver2.assessment("quiz").unwrap().is_some());
        let after = fs::metadata(&touched).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_item_idents_rejected() {
        let content = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let dir = content.path().join("bad");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("assessment.json"),
            serde_json::to_vec(&json!({
                "ident": "a1",
                "title": "Bad",
                "sections": [
                    {"ident": "s1", "title": "One", "items": [
                        {"ident": "dup", "title": "Q1"},
                        {"ident": "dup", "title": "Q2"}
                    ]}
                ]
            }))
            .unwrap(),
        )
        .unwrap();

        let resolver = BundleResolver::new(content.path(), scratch.path());
        match resolver.assessment("bad") {
            Err(ResolveError::DuplicateItem { item, .. }) => assert_eq!(item, "dup"),
            other => panic!("expected DuplicateItem, got {:?}", other),
        }
    }

    #[test]
    fn test_unsafe_archive_paths_rejected() {
        let content = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let archive = PackedBundle {
            version: BUNDLE_VERSION,
            files: vec![PackedFile {
                path: "../escape.json".to_string(),
                contents: vec![],
            }],
        };
        fs::write(
            content.path().join("evil.bundle"),
            bincode::serialize(&archive).unwrap(),
        )
        .unwrap();

        let resolver = BundleResolver::new(content.path(), scratch.path());
        assert!(matches!(
            resolver.assessment("evil"),
            Err(ResolveError::UnpackFailed { .. })
        ));
    }
}
