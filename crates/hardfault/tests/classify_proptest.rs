//! Property-based tests for fault classification.
//! Every CFSR/HFSR combination, not just the documented fault scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]

use hardfault::config::{CFSR_BFARVALID, CFSR_MMARVALID, HFSR_FORCED};
use hardfault::{classify, Classification, FaultCategory, HardwareFaultStatus, CAUSE_TABLE};

proptest::proptest! {
    /// Classification is a pure function of the snapshot.
    #[test]
    fn classify_is_deterministic(hfsr: u32, cfsr: u32, mmfar: u32, bfar: u32) {
        let status = HardwareFaultStatus::from_raw(hfsr, cfsr, mmfar, bfar);
        assert_eq!(classify(&status), classify(&status));
    }

    /// Without HFSR.FORCED nothing beyond the raw HFSR is decoded.
    #[test]
    fn unforced_is_unclassified(hfsr: u32, cfsr: u32) {
        let status = HardwareFaultStatus::from_raw(hfsr & !HFSR_FORCED, cfsr, 0, 0);
        assert_eq!(
            classify(&status),
            Classification::Unclassified { hfsr: hfsr & !HFSR_FORCED }
        );
    }

    /// A category is present iff its CFSR sub-field is non-zero.
    #[test]
    fn category_present_iff_field_nonzero(cfsr: u32) {
        let status = HardwareFaultStatus::from_raw(HFSR_FORCED, cfsr, 0, 0);
        let classification = classify(&status);
        let forced = classification.forced().expect("forced");
        assert_eq!(forced.usage.is_some(), cfsr & 0xFFFF_0000 != 0);
        assert_eq!(forced.bus.is_some(), cfsr & 0x0000_FF00 != 0);
        assert_eq!(forced.memory.is_some(), cfsr & 0x0000_00FF != 0);
    }

    /// BFAR/MMFAR are attached exactly when their validity flag is set.
    #[test]
    fn address_attached_iff_valid(cfsr: u32, mmfar: u32, bfar: u32) {
        let status = HardwareFaultStatus::from_raw(HFSR_FORCED, cfsr, mmfar, bfar);
        let classification = classify(&status);
        let forced = classification.forced().expect("forced");

        if let Some(bus) = forced.bus {
            let expected = (cfsr & CFSR_BFARVALID != 0).then_some(bfar);
            assert_eq!(bus.address, expected);
        }
        if let Some(memory) = forced.memory {
            let expected = (cfsr & CFSR_MMARVALID != 0).then_some(mmfar);
            assert_eq!(memory.address, expected);
        }
        if let Some(usage) = forced.usage {
            assert_eq!(usage.address, None);
        }
    }

    /// Every recognised cause corresponds to a set bit in its own category.
    #[test]
    fn causes_match_set_bits(cfsr: u32) {
        let status = HardwareFaultStatus::from_raw(HFSR_FORCED, cfsr, 0, 0);
        let classification = classify(&status);
        let forced = classification.forced().expect("forced");

        for entry in CAUSE_TABLE.iter() {
            let found = forced.all_causes().contains(entry.cause);
            assert_eq!(found, cfsr & entry.mask != 0, "{:?}", entry.cause);
        }
        for faults in forced.categories() {
            for cause in faults.causes.iter() {
                assert_eq!(cause.category(), faults.category);
            }
            assert_eq!(faults.status & !faults.category.cfsr_mask(), 0);
        }
    }

    /// Unrecognised bits still open a category but add no cause.
    #[test]
    fn reserved_bits_only_open_the_category(reserved in 0u32..4) {
        // UFSR bits 20..=23 are reserved.
        let cfsr = 1u32 << (20 + reserved);
        let status = HardwareFaultStatus::from_raw(HFSR_FORCED, cfsr, 0, 0);
        let classification = classify(&status);
        let usage = classification.forced().and_then(|f| f.usage).expect("usage");
        assert_eq!(usage.category, FaultCategory::Usage);
        assert!(usage.causes.is_empty());
    }
}
