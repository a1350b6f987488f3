//! End-to-end navigation flows through the factory and both navigator
//! strategies.

mod common;

use common::{harness, item, section, two_section_def};
use invigil::context::ItemInput;
use invigil::error::EngineError;
use invigil::info::{AttemptStatus, ErrorCode, MessageCode};
use invigil::navigator::{
    ItemJumping, MenuNavigator, Navigator, SectionJumping, SequentialNavigator,
};
use serde_json::json;

fn input(ident: &str, value: &str) -> ItemInput {
    ItemInput {
        ident: ident.to_string(),
        value: json!(value),
    }
}

/// Scenario A: starting shows the title page, not the questions.
#[test]
fn test_start_demands_info_before_items() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);

    let info = nav.start_assessment().unwrap();
    assert_eq!(info.status, AttemptStatus::Running);
    assert_eq!(info.message, MessageCode::InfoDemanded);
    assert!(info.error.is_none());
    assert!(!info.render_items);
    assert_eq!(nav.context().current_section, 0);
}

/// Scenarios B and C: section submission advances, the last section
/// auto-finishes the assessment.
#[test]
fn test_sequential_walk_to_completion() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);
    nav.start_assessment().unwrap();

    let info = nav.submit_items(vec![input("i1", "a")]).unwrap();
    assert_eq!(info.message, MessageCode::SectionSubmitted);
    assert!(info.render_items);
    assert!(info.error.is_none());
    assert_eq!(nav.context().current_section, 1);

    let info = nav.submit_items(vec![input("i2", "b")]).unwrap();
    assert_eq!(info.message, MessageCode::AssessmentSubmitted);
    assert_eq!(info.status, AttemptStatus::Finished);
    assert!(!info.render_items);

    // Feedback was declared by the definition and rolls up both items.
    let feedback = info.feedback.expect("feedback output");
    assert_eq!(feedback.points, 1.0);
    assert_eq!(feedback.max_points, 2.0);
    assert!(!feedback.passed);
}

/// A leading empty section is skipped at start, so the first page always
/// carries items.
#[test]
fn test_leading_empty_section_is_skipped_on_start() {
    let mut def = two_section_def();
    def.sections.insert(0, section("intro", vec![]));
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);

    let info = nav.start_assessment().unwrap();
    assert_eq!(info.message, MessageCode::InfoDemanded);
    assert_eq!(nav.context().current_section, 1);

    nav.submit_items(vec![input("i1", "a")]).unwrap();
    assert_eq!(nav.context().current_section, 2);
}

/// An assessment with no deliverable section finishes at start instead of
/// stranding the attempt on a page that accepts nothing.
#[test]
fn test_all_empty_assessment_finishes_on_start() {
    let mut def = two_section_def();
    def.sections = vec![section("s1", vec![]), section("s2", vec![])];
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);

    let info = nav.start_assessment().unwrap();
    assert_eq!(info.status, AttemptStatus::Finished);
    assert_eq!(info.message, MessageCode::AssessmentSubmitted);
}

/// Empty sections are skipped on advance, never landed on.
#[test]
fn test_empty_sections_are_skipped() {
    let mut def = two_section_def();
    def.sections.insert(1, section("gap", vec![]));
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);
    nav.start_assessment().unwrap();

    nav.submit_items(vec![input("i1", "a")]).unwrap();
    assert_eq!(nav.context().current_section, 2);
    assert_eq!(nav.context().sections[2].ident, "s2");
}

/// Scenario D: a zero/negative time budget starts RUNNING but is
/// immediately unusable for submission.
#[test]
fn test_pathological_time_budget() {
    let mut def = two_section_def();
    def.time_limit_secs = Some(-1);
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);

    let info = nav.start_assessment().unwrap();
    assert_eq!(info.status, AttemptStatus::Running);
    assert_eq!(info.error, Some(ErrorCode::AssessmentOutOfTime));
    assert!(!info.render_items);

    // A page submission on the dead attempt finalizes it; nothing is
    // recorded, and the terminal Info says why.
    let info = nav.submit_items(vec![input("i1", "a")]).unwrap();
    assert_eq!(info.status, AttemptStatus::Finished);
    assert_eq!(info.error, Some(ErrorCode::AssessmentOutOfTime));
    assert!(nav.context().sections[0].items[0].input.is_none());
}

#[test]
fn test_single_submission_on_closed_assessment_is_rejected() {
    let mut def = two_section_def();
    def.time_limit_secs = Some(-1);
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = MenuNavigator::new(instance);
    nav.start_assessment().unwrap();

    let info = nav.submit_single_item(input("i1", "a")).unwrap();
    assert_eq!(info.error, Some(ErrorCode::AssessmentOutOfTime));
    assert!(!info.render_items);
    assert_eq!(nav.context().status, AttemptStatus::Running);
}

/// Scenario E: the attempt cap rejects the extra submission and keeps the
/// first score.
#[test]
fn test_attempt_cap_keeps_first_score() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = MenuNavigator::new(instance);
    nav.start_assessment().unwrap();

    let info = nav.submit_single_item(input("i1", "a")).unwrap();
    assert!(info.error.is_none());
    let first_score = nav.context().sections[0].items[0].score;
    assert_eq!(first_score.unwrap().points, 1.0);

    let info = nav.submit_single_item(input("i1", "b")).unwrap();
    assert_eq!(info.error, Some(ErrorCode::AttemptsExhausted));
    let item = &nav.context().sections[0].items[0];
    assert_eq!(item.score, first_score);
    assert_eq!(item.input.as_ref().unwrap().value, json!("a"));
    assert_eq!(item.attempts_made, 1);
}

/// A partially failing page submission still counts as submitted.
#[test]
fn test_partial_section_submission_is_flagged() {
    let mut def = two_section_def();
    def.sections[0] = section("s1", vec![item("i1", 1), item("i1b", 1)]);
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = MenuNavigator::new(instance);
    nav.start_assessment().unwrap();

    // Exhaust i1 first, then submit the whole page including i1 again.
    nav.submit_single_item(input("i1", "a")).unwrap();
    let info = nav
        .submit_items(vec![input("i1", "b"), input("i1b", "a")])
        .unwrap();
    assert_eq!(info.message, MessageCode::SectionSubmitted);
    assert_eq!(info.error, Some(ErrorCode::SubmittedPartially));
    // The fresh item was accepted; the exhausted one kept its response.
    let section = &nav.context().sections[0];
    assert_eq!(section.items[0].input.as_ref().unwrap().value, json!("a"));
    assert_eq!(section.items[1].input.as_ref().unwrap().value, json!("a"));
    assert_eq!(section.times_submitted, 1);
}

/// A partial submission of the final page keeps its flag on the terminal
/// Info produced by the auto-finish.
#[test]
fn test_partial_final_page_flag_survives_auto_finish() {
    let mut def = two_section_def();
    def.sections = vec![section("s1", vec![item("i1", 1), item("i1b", 1)])];
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);
    nav.start_assessment().unwrap();

    // Exhaust i1, then page-submit the whole (and last) section.
    nav.submit_single_item(input("i1", "a")).unwrap();
    let info = nav
        .submit_items(vec![input("i1", "b"), input("i1b", "a")])
        .unwrap();
    assert_eq!(info.status, AttemptStatus::Finished);
    assert_eq!(info.message, MessageCode::AssessmentSubmitted);
    assert_eq!(info.error, Some(ErrorCode::SubmittedPartially));
}

/// Menu navigation repositions freely; timers are section-lifetime.
#[test]
fn test_menu_navigation_repositions_without_resetting_timers() {
    let mut def = two_section_def();
    def.sections[1].time_limit_secs = Some(3600);
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = MenuNavigator::new(instance);
    nav.start_assessment().unwrap();

    let info = nav.go_to_section(1).unwrap();
    assert_eq!(info.message, MessageCode::SectionShown);
    assert!(info.render_items);
    let first_close = nav.context().sections[1].closes_at;
    assert!(first_close.is_some());

    nav.go_to_section(0).unwrap();
    assert_eq!(nav.context().current_section, 0);
    nav.go_to_section(1).unwrap();
    assert_eq!(nav.context().sections[1].closes_at, first_close);

    let info = nav.go_to_item(1, 0).unwrap();
    assert_eq!(info.message, MessageCode::ItemShown);
    assert_eq!(nav.context().sections[1].current_item, 0);
}

/// P5: terminal transitions are idempotent.
#[test]
fn test_terminal_idempotence() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);
    nav.start_assessment().unwrap();

    let first = nav.submit_assessment().unwrap();
    assert_eq!(first.status, AttemptStatus::Finished);
    let second = nav.submit_assessment().unwrap();
    assert_eq!(second.status, AttemptStatus::Finished);
    assert_eq!(second.message, MessageCode::AssessmentSubmitted);

    // Cancelling a finished attempt does not flip its terminal state.
    let cancelled = nav.cancel_assessment().unwrap();
    assert_eq!(cancelled.status, AttemptStatus::Finished);
}

#[test]
fn test_cancel_reaches_cancelled_without_feedback() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);
    nav.start_assessment().unwrap();

    let info = nav.cancel_assessment().unwrap();
    assert_eq!(info.status, AttemptStatus::Cancelled);
    assert_eq!(info.message, MessageCode::AssessmentCancelled);
    assert!(info.feedback.is_none());
}

/// Protocol violations are fatal errors, never Info codes.
#[test]
fn test_protocol_violations_are_errors() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = SequentialNavigator::new(instance);

    // Submit before start.
    assert!(matches!(
        nav.submit_items(vec![input("i1", "a")]),
        Err(EngineError::NotRunning { .. })
    ));

    nav.start_assessment().unwrap();

    // Empty payload.
    assert!(matches!(
        nav.submit_items(vec![]),
        Err(EngineError::EmptySubmission)
    ));

    // Identifier mismatch against the current item.
    assert!(matches!(
        nav.submit_single_item(input("i2", "a")),
        Err(EngineError::IdentifierMismatch { .. })
    ));

    // Unknown identifier in a page submission.
    assert!(matches!(
        nav.submit_items(vec![input("ghost", "a")]),
        Err(EngineError::UnknownItem(_))
    ));

    // Double start.
    assert!(matches!(
        nav.start_assessment(),
        Err(EngineError::AlreadyStarted)
    ));

    // A failed operation leaves no trace on the model.
    assert_eq!(nav.context().sections[0].items[0].attempts_made, 0);
}

#[test]
fn test_menu_jump_bounds_are_checked() {
    let fx = harness(two_section_def());
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = MenuNavigator::new(instance);
    nav.start_assessment().unwrap();

    assert!(matches!(
        nav.go_to_section(7),
        Err(EngineError::SectionOutOfRange { index: 7, .. })
    ));
    assert!(matches!(
        nav.go_to_item(0, 5),
        Err(EngineError::ItemOutOfRange { .. })
    ));
}

/// Closed section: the rejection is idempotent and mutates nothing (P2).
#[test]
fn test_closed_section_rejects_idempotently() {
    let mut def = two_section_def();
    def.sections[0].time_limit_secs = Some(-1);
    let fx = harness(def);
    let instance = fx
        .factory
        .create_or_resume("alice", "quiz", false, "course/1/quiz")
        .unwrap()
        .unwrap();
    let mut nav = MenuNavigator::new(instance);
    nav.start_assessment().unwrap();

    for _ in 0..3 {
        let info = nav.submit_items(vec![input("i1", "a")]).unwrap();
        assert_eq!(info.error, Some(ErrorCode::SectionOutOfTime));
        assert_eq!(nav.context().sections[0].items[0].attempts_made, 0);
        assert_eq!(nav.context().sections[0].times_submitted, 0);
    }
}
