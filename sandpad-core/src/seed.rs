//! Initial file contents for a freshly mounted project.
//!
//! Saved work in the current section wins. Otherwise the learner continues
//! from the nearest earlier section of the same subject that has saved work.
//! Otherwise the preset starters are used, with caller-supplied overrides
//! (e.g. section text) taking precedence over the built-in starter bodies.

use crate::store::ProjectStore;
use sandpad_preview::{LanguagePreset, ProjectFile, ProjectKey};
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    Saved,
    Inherited { section_id: String },
    Starter,
}

#[derive(Debug, Clone)]
pub struct Seeded {
    pub files: Vec<ProjectFile>,
    pub source: SeedSource,
}

pub struct SeedRequest<'a> {
    pub key: &'a ProjectKey,
    pub preset: &'a LanguagePreset,
    /// Section ids of the subject, in course order.
    pub section_order: &'a [String],
    /// Starter bodies by file name, replacing the preset defaults.
    pub starter_overrides: &'a HashMap<String, String>,
}

impl SeedRequest<'_> {
    fn starters(&self) -> Vec<ProjectFile> {
        let mut files = self.preset.starter_files();
        for file in &mut files {
            if let Some(body) = self.starter_overrides.get(&file.name) {
                file.content = body.clone();
            }
        }
        files
    }
}

pub fn seed_files(store: &dyn ProjectStore, req: &SeedRequest<'_>) -> Seeded {
    if let Some(files) = load_section(store, req, req.key) {
        return Seeded {
            files,
            source: SeedSource::Saved,
        };
    }

    let current = req
        .section_order
        .iter()
        .position(|s| *s == req.key.section_id);
    if let Some(current) = current {
        for section_id in req.section_order[..current].iter().rev() {
            let earlier = req.key.with_section(section_id);
            if let Some(files) = load_section(store, req, &earlier) {
                tracing::info!(
                    "Seeding {}/{} from earlier section {}",
                    req.key.subject_id,
                    req.key.section_id,
                    section_id
                );
                return Seeded {
                    files,
                    source: SeedSource::Inherited {
                        section_id: section_id.clone(),
                    },
                };
            }
        }
    }

    Seeded {
        files: req.starters(),
        source: SeedSource::Starter,
    }
}

/// Files saved under `key`, with starters filling any gaps. `None` when the
/// section has no saved file at all.
fn load_section(
    store: &dyn ProjectStore,
    req: &SeedRequest<'_>,
    key: &ProjectKey,
) -> Option<Vec<ProjectFile>> {
    let mut any_saved = false;
    let files: Vec<ProjectFile> = req
        .starters()
        .into_iter()
        .map(|starter| match store.get(&key.file_key(&starter.name)) {
            Ok(Some(saved)) => {
                any_saved = true;
                ProjectFile {
                    content: saved.content,
                    updated_at: SystemTime::from(saved.updated_at),
                    ..starter
                }
            }
            Ok(None) => starter,
            Err(e) => {
                tracing::warn!("Ignoring unreadable saved file: {}", e);
                starter
            }
        })
        .collect();
    any_saved.then_some(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use sandpad_preview::resolve_preset;

    fn sections() -> Vec<String> {
        ["intro", "loops", "functions"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn current_section_wins_and_gaps_use_starters() {
        let store = MemoryStore::new();
        let key = ProjectKey::new("s", "loops", "web");
        store
            .set(&key.file_key("index.html"), "<p>mine</p>", sandpad_preview::FileLanguage::Html)
            .unwrap();
        let preset = resolve_preset("web");
        let order = sections();
        let overrides = HashMap::new();
        let seeded = seed_files(
            &store,
            &SeedRequest {
                key: &key,
                preset,
                section_order: &order,
                starter_overrides: &overrides,
            },
        );
        assert_eq!(seeded.source, SeedSource::Saved);
        assert_eq!(seeded.files[0].content, "<p>mine</p>");
        assert_eq!(seeded.files[1].content, preset.files[1].starter);
    }

    #[test]
    fn nearest_earlier_section_is_inherited() {
        let store = MemoryStore::new();
        let base = ProjectKey::new("s", "functions", "python");
        store
            .set(&base.with_section("intro").file_key("main.py"), "print(1)", sandpad_preview::FileLanguage::Py)
            .unwrap();
        store
            .set(&base.with_section("loops").file_key("main.py"), "print(2)", sandpad_preview::FileLanguage::Py)
            .unwrap();
        let order = sections();
        let overrides = HashMap::new();
        let seeded = seed_files(
            &store,
            &SeedRequest {
                key: &base,
                preset: resolve_preset("python"),
                section_order: &order,
                starter_overrides: &overrides,
            },
        );
        assert_eq!(
            seeded.source,
            SeedSource::Inherited {
                section_id: "loops".into()
            }
        );
        assert_eq!(seeded.files[0].content, "print(2)");
    }

    #[test]
    fn starters_with_overrides_when_nothing_saved() {
        let store = MemoryStore::new();
        let key = ProjectKey::new("s", "intro", "python");
        let order = sections();
        let overrides = HashMap::from([("main.py".to_string(), "print('section')".to_string())]);
        let seeded = seed_files(
            &store,
            &SeedRequest {
                key: &key,
                preset: resolve_preset("python"),
                section_order: &order,
                starter_overrides: &overrides,
            },
        );
        assert_eq!(seeded.source, SeedSource::Starter);
        assert_eq!(seeded.files[0].content, "print('section')");
    }

    #[test]
    fn later_sections_are_not_inherited() {
        let store = MemoryStore::new();
        let key = ProjectKey::new("s", "intro", "c");
        store
            .set(&key.with_section("loops").file_key("main.c"), "int main(){}", sandpad_preview::FileLanguage::C)
            .unwrap();
        let order = sections();
        let overrides = HashMap::new();
        let seeded = seed_files(
            &store,
            &SeedRequest {
                key: &key,
                preset: resolve_preset("c"),
                section_order: &order,
                starter_overrides: &overrides,
            },
        );
        assert_eq!(seeded.source, SeedSource::Starter);
    }
}
