//! Fault-status decoding.
//!
//! One table, [`CAUSE_TABLE`], maps every recognised CFSR bit to a
//! [`FaultCause`] tag and the literal text the report prints for it. The
//! classifier and the reporter both walk this table, so a cause can never be
//! detected without being printed, or printed without being detected.
//!
//! Everything here is a pure function of the register values: no state, no
//! allocation, total over all `u32` inputs.

use core::fmt;

use crate::config::{
    CFSR_BFARVALID, CFSR_BUS_MASK, CFSR_MEMORY_MASK, CFSR_MMARVALID, CFSR_USAGE_MASK,
};
use crate::snapshot::HardwareFaultStatus;

// ── Categories ───────────────────────────────────────────────────────────────

/// Configurable fault category, matching the CFSR sub-registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultCategory {
    /// UsageFault (UFSR, CFSR[31:16]).
    Usage,
    /// BusFault (BFSR, CFSR[15:8]).
    Bus,
    /// MemManage fault (MMFSR, CFSR[7:0]).
    Memory,
}

impl FaultCategory {
    /// Report order.
    pub const ALL: [Self; 3] = [Self::Usage, Self::Bus, Self::Memory];

    /// CFSR bits owned by this category.
    #[must_use]
    pub const fn cfsr_mask(self) -> u32 {
        match self {
            Self::Usage => CFSR_USAGE_MASK,
            Self::Bus => CFSR_BUS_MASK,
            Self::Memory => CFSR_MEMORY_MASK,
        }
    }

    /// Lower-case name for log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Bus => "bus",
            Self::Memory => "memory management",
        }
    }

    /// Heading the report prints before this category's causes.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Usage => "Usage fault: ",
            Self::Bus => "Bus fault: ",
            Self::Memory => "Memory Management (MPU) fault: ",
        }
    }

    /// Validity flag gating this category's fault-address register, if any.
    #[must_use]
    pub const fn address_valid_mask(self) -> Option<u32> {
        match self {
            Self::Usage => None,
            Self::Bus => Some(CFSR_BFARVALID),
            Self::Memory => Some(CFSR_MMARVALID),
        }
    }
}

// ── Causes ───────────────────────────────────────────────────────────────────

/// A single named fault cause.
///
/// Discriminants index [`CAUSE_TABLE`] and the bits of [`CauseSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultCause {
    /// UFSR.DIVBYZERO: SDIV/UDIV with a zero divisor (needs CCR.DIV_0_TRP).
    DivideByZero = 0,
    /// UFSR.INVSTATE: illegal EPSR use, typically a call through a pointer
    /// with bit 0 clear (e.g. a null function pointer).
    InvalidState = 1,
    /// UFSR.UNDEFINSTR: undefined instruction.
    UndefinedInstruction = 2,
    /// UFSR.INVPC: illegal EXC_RETURN load into PC.
    InvalidExceptionReturn = 3,
    /// UFSR.NOCP: coprocessor instruction with the coprocessor disabled.
    NoCoprocessor = 4,
    /// UFSR.UNALIGNED: unaligned access (always for LDM/STM/LDRD, otherwise
    /// only with CCR.UNALIGN_TRP).
    UnalignedAccess = 5,
    /// BFSR.IBUSERR: bus error on instruction fetch.
    InstructionBusError = 6,
    /// BFSR.PRECISERR: precise data bus error.
    PreciseDataBusError = 7,
    /// BFSR.IMPRECISERR: imprecise data bus error.
    ImpreciseDataBusError = 8,
    /// BFSR.UNSTKERR: bus fault while unstacking on exception return.
    BusUnstackingError = 9,
    /// BFSR.STKERR: bus fault while stacking on exception entry.
    BusStackingError = 10,
    /// MMFSR.IACCVIOL: MPU violation on instruction fetch.
    InstructionAccessViolation = 11,
    /// MMFSR.DACCVIOL: MPU violation on data access.
    DataAccessViolation = 12,
    /// MMFSR.MUNSTKERR: MemManage fault while unstacking.
    MemUnstackingError = 13,
    /// MMFSR.MSTKERR: MemManage fault while stacking.
    MemStackingError = 14,
}

impl FaultCause {
    /// Table entry describing this cause.
    #[must_use]
    pub fn entry(self) -> &'static CauseEntry {
        // Discriminants are table indices; the table test pins the ordering.
        let [first, ..] = &CAUSE_TABLE;
        CAUSE_TABLE.get(usize::from(self as u8)).unwrap_or(first)
    }

    /// Category this cause belongs to.
    #[must_use]
    pub fn category(self) -> FaultCategory {
        self.entry().category
    }

    /// CFSR bit that signals this cause.
    #[must_use]
    pub fn cfsr_mask(self) -> u32 {
        self.entry().mask
    }

    /// Literal report text (newline-terminated).
    #[must_use]
    pub fn text(self) -> &'static str {
        self.entry().text
    }

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// One row of the mask → cause → text mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CauseEntry {
    /// Category the bit belongs to.
    pub category: FaultCategory,
    /// Single CFSR bit tested for this cause.
    pub mask: u32,
    /// Tag recorded in the [`CauseSet`].
    pub cause: FaultCause,
    /// Text printed in the report.
    pub text: &'static str,
}

/// Every recognised CFSR cause bit, in report order within each category.
pub static CAUSE_TABLE: [CauseEntry; 15] = [
    // ── UsageFault ──
    CauseEntry {
        category: FaultCategory::Usage,
        mask: 0x0200_0000,
        cause: FaultCause::DivideByZero,
        text: "Divide by zero\n",
    },
    CauseEntry {
        category: FaultCategory::Usage,
        mask: 0x0002_0000,
        cause: FaultCause::InvalidState,
        text: "Invalid combination of EPSR and instruction,\nsuch as calling a null pointer function\n",
    },
    CauseEntry {
        category: FaultCategory::Usage,
        mask: 0x0001_0000,
        cause: FaultCause::UndefinedInstruction,
        text: "The processor attempted to execute an undefined instruction\n",
    },
    CauseEntry {
        category: FaultCategory::Usage,
        mask: 0x0004_0000,
        cause: FaultCause::InvalidExceptionReturn,
        text: "Attempt to load EXC_RETURN into pc illegally\n",
    },
    CauseEntry {
        category: FaultCategory::Usage,
        mask: 0x0008_0000,
        cause: FaultCause::NoCoprocessor,
        text: "Attempt to use a coprocessor instruction\n",
    },
    CauseEntry {
        category: FaultCategory::Usage,
        mask: 0x0100_0000,
        cause: FaultCause::UnalignedAccess,
        text: "Attempt to make an unaligned memory access\n",
    },
    // ── BusFault ──
    CauseEntry {
        category: FaultCategory::Bus,
        mask: 0x0000_0100,
        cause: FaultCause::InstructionBusError,
        text: "Instruction bus error\n",
    },
    CauseEntry {
        category: FaultCategory::Bus,
        mask: 0x0000_0200,
        cause: FaultCause::PreciseDataBusError,
        text: "Precise data bus error\n",
    },
    CauseEntry {
        category: FaultCategory::Bus,
        mask: 0x0000_0400,
        cause: FaultCause::ImpreciseDataBusError,
        text: "Imprecise data bus error\n",
    },
    CauseEntry {
        category: FaultCategory::Bus,
        mask: 0x0000_0800,
        cause: FaultCause::BusUnstackingError,
        text: "Unstacking error\n",
    },
    CauseEntry {
        category: FaultCategory::Bus,
        mask: 0x0000_1000,
        cause: FaultCause::BusStackingError,
        text: "Stacking error\n",
    },
    // ── MemManage ──
    CauseEntry {
        category: FaultCategory::Memory,
        mask: 0x0000_0001,
        cause: FaultCause::InstructionAccessViolation,
        text: "Instruction access violation\n",
    },
    CauseEntry {
        category: FaultCategory::Memory,
        mask: 0x0000_0002,
        cause: FaultCause::DataAccessViolation,
        text: "Data access violation\n",
    },
    CauseEntry {
        category: FaultCategory::Memory,
        mask: 0x0000_0008,
        cause: FaultCause::MemUnstackingError,
        text: "Unstacking error\n",
    },
    CauseEntry {
        category: FaultCategory::Memory,
        mask: 0x0000_0010,
        cause: FaultCause::MemStackingError,
        text: "Stacking error\n",
    },
];

// ── CauseSet ─────────────────────────────────────────────────────────────────

/// Set of [`FaultCause`]s, one bit per cause.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CauseSet(u16);

impl CauseSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Add a cause.
    #[must_use]
    pub const fn with(self, cause: FaultCause) -> Self {
        Self(self.0 | cause.bit())
    }

    /// Add a cause in place.
    pub fn insert(&mut self, cause: FaultCause) {
        self.0 |= cause.bit();
    }

    /// Whether `cause` is in the set.
    #[must_use]
    pub const fn contains(self, cause: FaultCause) -> bool {
        self.0 & cause.bit() != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of causes in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Table rows for the causes in the set, in report order.
    pub fn entries(self) -> impl Iterator<Item = &'static CauseEntry> {
        CAUSE_TABLE
            .iter()
            .filter(move |entry| self.contains(entry.cause))
    }

    /// Causes in the set, in report order.
    pub fn iter(self) -> impl Iterator<Item = FaultCause> {
        self.entries().map(|entry| entry.cause)
    }
}

impl FromIterator<FaultCause> for CauseSet {
    fn from_iter<I: IntoIterator<Item = FaultCause>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Debug for CauseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ── Per-category result ──────────────────────────────────────────────────────

/// Decoded causes for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CategoryFaults {
    /// Which sub-register this came from.
    pub category: FaultCategory,
    /// CFSR masked to this category's bits (printed in hex, informational).
    pub status: u32,
    /// Recognised causes.
    pub causes: CauseSet,
    /// Faulting address, present only when the validity flag was set.
    pub address: Option<u32>,
}

fn causes_in(category: FaultCategory, cfsr: u32) -> CauseSet {
    CAUSE_TABLE
        .iter()
        .filter(|entry| entry.category == category && cfsr & entry.mask != 0)
        .map(|entry| entry.cause)
        .collect()
}

fn classify_category(category: FaultCategory, cfsr: u32, address: u32) -> CategoryFaults {
    let address_valid = category
        .address_valid_mask()
        .is_some_and(|mask| cfsr & mask != 0);
    CategoryFaults {
        category,
        status: cfsr & category.cfsr_mask(),
        causes: causes_in(category, cfsr),
        address: if address_valid { Some(address) } else { None },
    }
}

/// Decode UsageFault causes from a full CFSR value.
#[must_use]
pub fn classify_usage(cfsr: u32) -> CategoryFaults {
    classify_category(FaultCategory::Usage, cfsr, 0)
}

/// Decode BusFault causes; `bfar` is attached only when BFARVALID is set.
#[must_use]
pub fn classify_bus(cfsr: u32, bfar: u32) -> CategoryFaults {
    classify_category(FaultCategory::Bus, cfsr, bfar)
}

/// Decode MemManage causes; `mmfar` is attached only when MMARVALID is set.
#[must_use]
pub fn classify_memory(cfsr: u32, mmfar: u32) -> CategoryFaults {
    classify_category(FaultCategory::Memory, cfsr, mmfar)
}

// ── Top level ────────────────────────────────────────────────────────────────

/// Decoded configurable-fault state behind a forced hard fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ForcedFault {
    /// Raw HFSR.
    pub hfsr: u32,
    /// Raw CFSR.
    pub cfsr: u32,
    /// Present when any UFSR bit is set.
    pub usage: Option<CategoryFaults>,
    /// Present when any BFSR bit is set.
    pub bus: Option<CategoryFaults>,
    /// Present when any MMFSR bit is set.
    pub memory: Option<CategoryFaults>,
}

impl ForcedFault {
    /// Present categories in report order (Usage, Bus, Memory).
    pub fn categories(&self) -> impl Iterator<Item = &CategoryFaults> {
        [&self.usage, &self.bus, &self.memory]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    /// Union of every category's causes.
    #[must_use]
    pub fn all_causes(&self) -> CauseSet {
        self.categories()
            .flat_map(|category| category.causes.iter())
            .collect()
    }
}

/// Outcome of decoding a fault-status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Classification {
    /// HFSR.FORCED clear: only the raw HFSR is reported.
    Unclassified {
        /// Raw HFSR.
        hfsr: u32,
    },
    /// HFSR.FORCED set: an escalated configurable fault.
    Forced(ForcedFault),
}

impl Classification {
    /// Raw HFSR, whichever variant.
    #[must_use]
    pub const fn hfsr(&self) -> u32 {
        match self {
            Self::Unclassified { hfsr } => *hfsr,
            Self::Forced(forced) => forced.hfsr,
        }
    }

    /// The forced-fault details, if any.
    #[must_use]
    pub const fn forced(&self) -> Option<&ForcedFault> {
        match self {
            Self::Unclassified { .. } => None,
            Self::Forced(forced) => Some(forced),
        }
    }
}

/// Decode a snapshot.
///
/// Categories are decoded only when HFSR.FORCED is set, and each category
/// only when its CFSR sub-field is non-zero.
#[must_use]
pub fn classify(status: &HardwareFaultStatus) -> Classification {
    if !status.is_forced() {
        return Classification::Unclassified {
            hfsr: status.hfsr(),
        };
    }

    let cfsr = status.cfsr();
    let present = |category: FaultCategory| cfsr & category.cfsr_mask() != 0;

    Classification::Forced(ForcedFault {
        hfsr: status.hfsr(),
        cfsr,
        usage: present(FaultCategory::Usage).then(|| classify_usage(cfsr)),
        bus: present(FaultCategory::Bus).then(|| classify_bus(cfsr, status.bfar().raw())),
        memory: present(FaultCategory::Memory)
            .then(|| classify_memory(cfsr, status.mmfar().raw())),
    })
}
