//! User extension hook run after the report and before the halt.
//!
//! Applications install one hook at boot (to flush a log buffer, light an
//! LED, poke a watchdog into resetting). The fault entry reads it once.

use core::cell::Cell;

use critical_section::Mutex;

/// Hook signature: receives the address of the exception frame.
///
/// There is nothing meaningful to return to; whatever the hook does, the
/// core halts afterwards unless the hook itself never returns.
pub type FaultHook = fn(frame_addr: usize);

static USER_HOOK: Mutex<Cell<Option<FaultHook>>> = Mutex::new(Cell::new(None));

/// Install `hook`, returning the previously installed one.
pub fn install_hook(hook: FaultHook) -> Option<FaultHook> {
    critical_section::with(|cs| USER_HOOK.borrow(cs).replace(Some(hook)))
}

/// Remove the installed hook, returning it.
pub fn remove_hook() -> Option<FaultHook> {
    critical_section::with(|cs| USER_HOOK.borrow(cs).take())
}

/// The currently installed hook.
pub fn installed_hook() -> Option<FaultHook> {
    critical_section::with(|cs| USER_HOOK.borrow(cs).get())
}
