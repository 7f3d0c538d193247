//! End-to-end fault entry on the host.
//!
//! The simulated platform's `park` unwinds with a marker payload instead of
//! spinning, so each test can observe the full ENTERED → HALTED sequence.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects
)]

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use embedded_io::{ErrorKind, ErrorType, Write};
use hardfault::config::{DHCSR_C_DEBUGEN, DHCSR_OFFSET};
use hardfault::mocks::{CaptureSink, FailingSink, FakeRegisterFile};
use hardfault::{BreakpointPolicy, ExceptionStackFrame, FaultEntry, Platform};

thread_local! {
    static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(event: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(event.into()));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| events.borrow_mut().drain(..).collect())
}

/// Unwind payload standing in for the idle loop.
struct Halted;

#[derive(Default)]
struct SimPlatform {
    breakpoints: usize,
}

impl Platform for SimPlatform {
    fn breakpoint(&mut self) {
        self.breakpoints += 1;
        record("breakpoint");
    }

    fn park(&mut self) -> ! {
        record("park");
        panic::panic_any(Halted)
    }
}

/// Sink that logs a single "report" event on its first write.
#[derive(Default)]
struct RecordingSink {
    inner: CaptureSink,
    seen: bool,
}

impl ErrorType for RecordingSink {
    type Error = ErrorKind;
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if !self.seen {
            self.seen = true;
            record("report");
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

fn logging_hook(frame_addr: usize) {
    record(format!("hook {frame_addr:#x}"));
}

/// Run `f` and assert it ended in `park`.
fn expect_halt(f: impl FnOnce()) {
    let payload = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("fault entry returned");
    assert!(payload.is::<Halted>(), "unwound with something other than a halt");
}

fn frame() -> ExceptionStackFrame {
    ExceptionStackFrame::from_raw([0, 0, 0, 0, 0, 0x0800_0101, 0x0800_0200, 0x0100_0000])
}

#[test]
fn report_then_hook_then_breakpoint_then_park() {
    let regs = FakeRegisterFile::new()
        .with_fault(0x4000_0000, 0x0200_0000, 0, 0)
        .with(DHCSR_OFFSET, DHCSR_C_DEBUGEN);
    let mut sink = RecordingSink::default();
    let mut platform = SimPlatform::default();
    take_events();

    expect_halt(|| {
        FaultEntry::new(&regs, &mut sink, &mut platform)
            .hook(logging_hook)
            .enter_with_frame(0x2000_7fe0, frame())
    });

    assert_eq!(
        take_events(),
        ["report", "hook 0x20007fe0", "breakpoint", "park"]
    );
    assert!(sink.inner.as_str().contains("Usage fault: Divide by zero\n"));
    assert!(sink.inner.as_str().ends_with("--\t--\t--\n"));
}

#[test]
fn no_breakpoint_without_debugger() {
    let regs = FakeRegisterFile::new().with_fault(0x4000_0000, 0x0000_0082, 0x2000_0000, 0);
    let mut sink = CaptureSink::new();
    let mut platform = SimPlatform::default();

    expect_halt(|| {
        FaultEntry::new(&regs, &mut sink, &mut platform)
            .hook(|_| {})
            .enter_with_frame(0x2000_7fe0, frame())
    });

    assert_eq!(platform.breakpoints, 0);
}

#[test]
fn policy_overrides_debugger_detection() {
    let attached = FakeRegisterFile::new().with(DHCSR_OFFSET, DHCSR_C_DEBUGEN);
    let detached = FakeRegisterFile::new();

    let cases = [
        (&attached, BreakpointPolicy::Never, 0),
        (&detached, BreakpointPolicy::Always, 1),
        (&attached, BreakpointPolicy::IfDebuggerAttached, 1),
        (&detached, BreakpointPolicy::IfDebuggerAttached, 0),
    ];

    for (regs, policy, breakpoints) in cases {
        let mut sink = CaptureSink::new();
        let mut platform = SimPlatform::default();
        expect_halt(|| {
            FaultEntry::new(regs, &mut sink, &mut platform)
                .breakpoint_policy(policy)
                .hook(|_| {})
                .enter_with_frame(0, frame())
        });
        assert_eq!(platform.breakpoints, breakpoints, "{policy:?}");
    }
}

#[test]
fn broken_sink_still_halts() {
    let regs = FakeRegisterFile::new().with_fault(0x4000_0000, 0x0000_8200, 0, 0x4000_0000);
    let mut sink = FailingSink::after(0);
    let mut platform = SimPlatform::default();
    take_events();

    expect_halt(|| {
        FaultEntry::new(&regs, &mut sink, &mut platform)
            .hook(logging_hook)
            .enter_with_frame(0x2000_1000, frame())
    });

    assert_eq!(sink.attempts(), 1);
    assert_eq!(take_events(), ["hook 0x20001000", "park"]);
}

#[test]
fn frame_comes_from_the_stack_named_by_exc_return() {
    let main_stack: [u32; 8] = [1, 1, 1, 1, 1, 0x0800_1111, 0x0800_2222, 0x0100_0000];
    let process_stack: [u32; 8] = [2, 2, 2, 2, 2, 0x0800_3333, 0x0800_4444, 0x0100_0000];
    let msp = main_stack.as_ptr() as usize;
    let psp = process_stack.as_ptr() as usize;

    for (exc_return, expected_pc, expected_addr) in [
        (0xFFFF_FFF9_u32, "0x08002222", msp),
        (0xFFFF_FFFD_u32, "0x08004444", psp),
    ] {
        let regs = FakeRegisterFile::new();
        let mut sink = RecordingSink::default();
        let mut platform = SimPlatform::default();
        take_events();

        expect_halt(|| {
            // SAFETY: both stack pointers address eight live, aligned words.
            unsafe {
                FaultEntry::new(&regs, &mut sink, &mut platform)
                    .hook(logging_hook)
                    .enter_from_exception(exc_return, msp, psp)
            }
        });

        let text = sink.inner.as_str();
        assert!(text.contains(&format!("pc  = {expected_pc}\n")), "{text}");
        assert!(text.contains(&format!("Hard fault occurred at address {expected_pc}.\n")));
        assert!(take_events().contains(&format!("hook {expected_addr:#x}")));
    }
}

#[test]
fn snapshot_is_read_once_per_fault() {
    let regs = FakeRegisterFile::new().with_fault(0x4000_0000, 0x0000_8200, 0, 0x4000_0000);
    let mut sink = CaptureSink::new();
    let mut platform = SimPlatform::default();

    expect_halt(|| {
        FaultEntry::new(&regs, &mut sink, &mut platform)
            .hook(|_| {})
            .enter_with_frame(0, frame())
    });

    // CFSR, HFSR, MMFAR, BFAR, CCR, then DHCSR for the breakpoint decision.
    assert_eq!(regs.reads(), 6);
    assert_eq!(regs.writes(), 0);
}
