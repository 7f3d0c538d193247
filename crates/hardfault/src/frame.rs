//! Exception stack frame.
//!
//! On exception entry an ARMv7-M core pushes eight words onto whichever
//! stack was active: r0–r3, r12, lr, the return address and xPSR. This module
//! gives that block a fixed Rust layout.

/// Number of words the core pushes on exception entry (no FP context).
pub const FRAME_WORDS: usize = 8;

/// Register names in frame order, padded to the report's column width.
pub const REGISTER_NAMES: [&str; FRAME_WORDS] =
    ["r0 ", "r1 ", "r2 ", "r3 ", "r12", "lr ", "pc ", "psr"];

/// The eight words pushed by hardware on exception entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct ExceptionStackFrame {
    /// r0 at the time of the fault.
    pub r0: u32,
    /// r1 at the time of the fault.
    pub r1: u32,
    /// r2 at the time of the fault.
    pub r2: u32,
    /// r3 at the time of the fault.
    pub r3: u32,
    /// r12 at the time of the fault.
    pub r12: u32,
    /// Link register of the faulting code.
    pub lr: u32,
    /// Return address: the faulting instruction for precise faults.
    pub pc: u32,
    /// xPSR at the time of the fault.
    pub psr: u32,
}

impl ExceptionStackFrame {
    /// Interpret eight words in push order `{r0, r1, r2, r3, r12, lr, pc, psr}`.
    #[must_use]
    pub const fn from_raw(words: [u32; FRAME_WORDS]) -> Self {
        let [r0, r1, r2, r3, r12, lr, pc, psr] = words;
        Self {
            r0,
            r1,
            r2,
            r3,
            r12,
            lr,
            pc,
            psr,
        }
    }

    /// Copy the frame out of memory with volatile word reads.
    ///
    /// # Safety
    ///
    /// `frame` must be 4-byte aligned and point to [`FRAME_WORDS`] readable
    /// words, normally the stack pointer selected on exception entry.
    #[must_use]
    pub unsafe fn read(frame: *const u32) -> Self {
        let mut words = [0u32; FRAME_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            // SAFETY: the caller guarantees FRAME_WORDS readable words at `frame`.
            *word = unsafe { core::ptr::read_volatile(frame.add(index)) };
        }
        Self::from_raw(words)
    }

    /// The words back in push order.
    #[must_use]
    pub const fn to_raw(&self) -> [u32; FRAME_WORDS] {
        [
            self.r0, self.r1, self.r2, self.r3, self.r12, self.lr, self.pc, self.psr,
        ]
    }

    /// `(name, value)` pairs in dump order.
    pub fn registers(&self) -> impl Iterator<Item = (&'static str, u32)> {
        REGISTER_NAMES.into_iter().zip(self.to_raw())
    }

    /// Best guess at the faulting code address.
    ///
    /// The stacked pc when non-zero, otherwise the stacked lr. A zero pc
    /// usually means a call through a null function pointer, where lr still
    /// points just past the call site. This is a heuristic for where to start
    /// looking in the disassembly, not a guarantee.
    #[must_use]
    pub const fn fault_address(&self) -> u32 {
        if self.pc != 0 {
            self.pc
        } else {
            self.lr
        }
    }
}
