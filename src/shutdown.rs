//! Interrupt flag shared between the Ctrl-C handler and the engine.
//!
//! The handler only flips the flag. The directory phase, the file phase and undo
//! check it before each filesystem step and wind down from there: the file phase
//! finishes its current commit batch, undo stops before its next step.
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Mark the process as interrupted. Calling it more than once changes nothing.
pub fn request() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn is_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Clear the mark again; only tests that fake an interrupt need this.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}
