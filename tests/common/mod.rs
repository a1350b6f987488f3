//! Shared fixtures for integration tests.
#![allow(dead_code)]

use invigil::definition::{AssessmentDef, ItemDef, SectionDef};
use invigil::eval::KeyMatchEvaluator;
use invigil::factory::AssessmentFactory;
use invigil::resolver::BundleResolver;
use invigil::snapshot::{SledSnapshotStore, SnapshotStore};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Harness {
    _content: TempDir,
    _scratch: TempDir,
    _db: TempDir,
    pub factory: AssessmentFactory,
    pub store: Arc<SledSnapshotStore>,
    pub def: AssessmentDef,
}

/// An item whose correct answer is `"a"`, worth one point.
pub fn item(ident: &str, max_attempts: u32) -> ItemDef {
    ItemDef {
        ident: ident.to_string(),
        title: format!("Question {}", ident),
        max_attempts,
        time_limit_secs: None,
        template: json!({"correct": "a", "points": 1.0}),
    }
}

pub fn section(ident: &str, items: Vec<ItemDef>) -> SectionDef {
    SectionDef {
        ident: ident.to_string(),
        title: format!("Section {}", ident),
        items,
        time_limit_secs: None,
    }
}

/// Two sections, one item each, no time limits, feedback on.
pub fn two_section_def() -> AssessmentDef {
    AssessmentDef {
        ident: "quiz".to_string(),
        title: "Quiz".to_string(),
        description: String::new(),
        sections: vec![
            section("s1", vec![item("i1", 1)]),
            section("s2", vec![item("i2", 1)]),
        ],
        time_limit_secs: None,
        feedback_available: true,
    }
}

/// Stand up a content store containing `def` under the reference "quiz",
/// plus a fresh snapshot database and factory around them.
pub fn harness(def: AssessmentDef) -> Harness {
    let content = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();

    let dir = content.path().join("quiz");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("assessment.json"),
        serde_json::to_vec_pretty(&def).unwrap(),
    )
    .unwrap();

    let resolver = Arc::new(BundleResolver::new(content.path(), scratch.path()));
    let store = Arc::new(SledSnapshotStore::new(db.path()).unwrap());
    let factory = AssessmentFactory::new(
        resolver,
        Arc::clone(&store) as Arc<dyn SnapshotStore>,
        Arc::new(KeyMatchEvaluator),
    );

    Harness {
        _content: content,
        _scratch: scratch,
        _db: db,
        factory,
        store,
        def,
    }
}
