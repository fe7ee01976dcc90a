//! Duplicate Detection Integration Tests
//!
//! Overlap scoring properties: symmetry, order independence, idempotence.

use nudge::domain::TaskSource;
use nudge::extract::DuplicateDetector;
use nudge::CapturedTask;

fn task(content: &str) -> CapturedTask {
    CapturedTask::new(content, TaskSource::Pattern)
}

#[test]
fn test_buy_milk_against_longer_existing_task() {
    let detector = DuplicateDetector::default();
    assert_eq!(detector.overlap_ratio("buy milk", "Buy milk from the store"), 1.0);

    let flagged = detector.flag_duplicates(&task("Buy milk"), ["Buy milk from the store"]);
    assert!(flagged.possible_duplicate);
}

#[test]
fn test_ratio_is_symmetric() {
    let detector = DuplicateDetector::default();
    let pairs = [
        ("call the dentist about my crown", "dentist crown appointment"),
        ("pay rent", "pay the water bill"),
        ("water plants", "Water the plants!"),
    ];
    for (a, b) in pairs {
        assert_eq!(detector.overlap_ratio(a, b), detector.overlap_ratio(b, a), "{} / {}", a, b);
    }
}

#[test]
fn test_word_order_does_not_matter() {
    let detector = DuplicateDetector::default();
    let existing = ["renew passport before summer"];

    let forward = detector.flag_duplicates(&task("renew passport before summer"), existing);
    let shuffled = detector.flag_duplicates(&task("summer before passport renew"), existing);
    assert_eq!(forward.possible_duplicate, shuffled.possible_duplicate);
    assert!(shuffled.possible_duplicate);

    let existing_order = ["email Sarah the slides", "pick up dry cleaning"];
    let reversed: Vec<&str> = existing_order.iter().rev().copied().collect();
    let candidate = task("pick up the dry cleaning");
    assert_eq!(
        detector.flag_duplicates(&candidate, existing_order).possible_duplicate,
        detector.flag_duplicates(&candidate, reversed).possible_duplicate
    );
}

#[test]
fn test_flagging_is_idempotent() {
    let detector = DuplicateDetector::default();
    let existing = ["Buy milk from the store", "call mom"];

    let once = detector.flag_duplicates(&task("buy milk"), existing);
    let twice = detector.flag_duplicates(&once, existing);
    assert_eq!(once, twice);

    let fresh = detector.flag_duplicates(&task("book flights"), existing);
    assert_eq!(detector.flag_duplicates(&fresh, existing), fresh);
}

#[test]
fn test_threshold_is_configurable() {
    let existing = ["pay the water bill"];
    let candidate = task("pay rent");

    // {pay, rent} vs {pay, water, bill}: 1/2
    assert!(!DuplicateDetector::default()
        .flag_duplicates(&candidate, existing)
        .possible_duplicate);
    assert!(DuplicateDetector::new(0.5)
        .flag_duplicates(&candidate, existing)
        .possible_duplicate);
}

#[test]
fn test_stop_word_only_input_never_matches() {
    let detector = DuplicateDetector::default();
    let flagged = detector.flag_duplicates(&task("the and of"), ["the and of"]);
    assert!(!flagged.possible_duplicate);
}
