//! Fault entry: from the hardware vector to the terminal halt.
//!
//! The only architecture-specific piece is the shim that hands over the raw
//! EXC_RETURN value and both stack pointers (see the firmware crate's
//! `exception_handlers`). From there on everything is plain Rust:
//!
//! ```text
//! ENTERED ── select stack ── capture ── classify ── render ── hook ── [bkpt] ── park ──▶ HALTED
//! ```
//!
//! There is no path back to the faulting code. A hard fault means program
//! state can no longer be trusted; the handler reports, then parks the core
//! until a debugger or a reset takes over.

use embedded_io::Write;

use crate::classifier::classify;
use crate::config::{BreakpointPolicy, DHCSR_OFFSET};
use crate::frame::ExceptionStackFrame;
use crate::hooks::{installed_hook, FaultHook};
use crate::registers::RegisterFile;
use crate::report::DiagnosticReporter;
use crate::snapshot::HardwareFaultStatus;

/// EXC_RETURN bit 2 (SPSEL): the frame was pushed to the process stack.
pub const EXC_RETURN_SPSEL: u32 = 1 << 2;

/// Stack the core pushed the exception frame onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveStack {
    /// Main stack pointer (handler mode, or thread mode without an RTOS).
    Main,
    /// Process stack pointer (RTOS thread).
    Process,
}

impl ActiveStack {
    /// Decode the stack selection bit of the EXC_RETURN value found in lr.
    #[must_use]
    pub const fn from_exc_return(exc_return: u32) -> Self {
        if exc_return & EXC_RETURN_SPSEL == 0 {
            Self::Main
        } else {
            Self::Process
        }
    }

    /// Pick the matching stack pointer: the exception frame address.
    #[must_use]
    pub const fn select(self, msp: usize, psp: usize) -> usize {
        match self {
            Self::Main => msp,
            Self::Process => psp,
        }
    }
}

/// Core-level operations the halt sequence needs.
pub trait Platform {
    /// Execute a breakpoint so an attached debugger stops here.
    fn breakpoint(&mut self);

    /// Idle forever. Entering this is the HALTED state.
    fn park(&mut self) -> !;
}

/// One-shot hard fault handler.
///
/// Built inside the vector handler from whatever the board provides: the
/// fault register block, an output sink that is safe to use from exception
/// context, and the platform's breakpoint/park primitives.
pub struct FaultEntry<'a, R, W, P>
where
    R: RegisterFile + ?Sized,
    W: Write,
    P: Platform,
{
    regs: &'a R,
    sink: &'a mut W,
    platform: &'a mut P,
    policy: BreakpointPolicy,
    hook: Option<FaultHook>,
}

impl<'a, R, W, P> FaultEntry<'a, R, W, P>
where
    R: RegisterFile + ?Sized,
    W: Write,
    P: Platform,
{
    /// Entry with the default breakpoint policy and the installed user hook.
    pub fn new(regs: &'a R, sink: &'a mut W, platform: &'a mut P) -> Self {
        Self {
            regs,
            sink,
            platform,
            policy: BreakpointPolicy::default(),
            hook: None,
        }
    }

    /// Override the breakpoint policy.
    #[must_use]
    pub fn breakpoint_policy(mut self, policy: BreakpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `hook` instead of the one in the global registry.
    #[must_use]
    pub fn hook(mut self, hook: FaultHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Resolve the frame from EXC_RETURN and both stack pointers, then run
    /// the halt sequence.
    ///
    /// # Safety
    ///
    /// The stack pointer selected by `exc_return` must point at a readable
    /// exception frame, as it does when these are the values live on entry
    /// to the HardFault vector.
    pub unsafe fn enter_from_exception(self, exc_return: u32, msp: usize, psp: usize) -> ! {
        let frame_addr = ActiveStack::from_exc_return(exc_return).select(msp, psp);
        // SAFETY: forwarded to the caller.
        unsafe { self.enter(frame_addr as *const u32) }
    }

    /// Copy the exception frame at `frame`, then run the halt sequence.
    ///
    /// # Safety
    ///
    /// `frame` must satisfy [`ExceptionStackFrame::read`].
    pub unsafe fn enter(self, frame: *const u32) -> ! {
        // SAFETY: forwarded to the caller.
        let stacked = unsafe { ExceptionStackFrame::read(frame) };
        self.enter_with_frame(frame as usize, stacked)
    }

    /// Run the halt sequence for a frame already copied out of memory.
    ///
    /// Capture → classify → report → hook → breakpoint (per policy) → park.
    pub fn enter_with_frame(self, frame_addr: usize, frame: ExceptionStackFrame) -> ! {
        let status = HardwareFaultStatus::capture(self.regs);
        let classification = classify(&status);

        #[cfg(feature = "defmt")]
        defmt::error!(
            "HardFault: HFSR={=u32:#010x} CFSR={=u32:#010x} at {=u32:#010x}",
            status.hfsr(),
            status.cfsr(),
            frame.fault_address()
        );

        // A broken sink leaves a partial report; the halt still has to happen.
        let _ = DiagnosticReporter::new(self.sink).render(&classification, &frame);

        if let Some(hook) = self.hook.or_else(installed_hook) {
            hook(frame_addr);
        }

        if self.policy.should_break(self.regs.read32(DHCSR_OFFSET)) {
            self.platform.breakpoint();
        }

        self.platform.park()
    }
}
