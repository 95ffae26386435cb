use super::*;
use std::thread;

#[test]
fn request_shutdown_is_idempotent_on_reason() {
    let controller = ShutdownController::new();
    assert!(!controller.is_shutdown_requested());
    controller.request_shutdown("first");
    controller.request_shutdown("second");
    assert!(controller.is_shutdown_requested());
    assert_eq!(controller.reason().as_deref(), Some("first"));
}

#[test]
fn note_interrupt_forces_on_third_within_window() {
    let controller = ShutdownController::new();
    assert!(!controller.note_interrupt());
    assert!(!controller.note_interrupt());
    assert!(controller.note_interrupt());
}

#[test]
fn note_interrupt_outside_window_does_not_accumulate() {
    let controller = ShutdownController::new();
    assert!(!controller.note_interrupt());
    thread::sleep(Duration::from_millis(50));
    assert!(!controller.note_interrupt());
}
