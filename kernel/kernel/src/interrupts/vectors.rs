//! Fault vector classification.
//!
//! One data table drives everything: which vectors exist, what they are
//! called, and whether hardware pushes an error code for them. Vectors
//! without a row — the architecturally reserved fault slots and the whole
//! external-interrupt range — are "reserved" from this core's point of view
//! and never get a default gate.

/// One defined exception vector.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FaultVector {
    /// Hardware vector number.
    pub vector: u8,
    /// Intel mnemonic, without the leading `#`.
    pub mnemonic: &'static str,
    /// Whether hardware pushes an error code for this vector.
    pub error_code: bool,
}

const fn row(vector: u8, mnemonic: &'static str, error_code: bool) -> FaultVector {
    FaultVector {
        vector,
        mnemonic,
        error_code,
    }
}

/// Every exception this core installs a default gate for.
pub const FAULT_VECTORS: [FaultVector; 17] = [
    row(0, "DE", false),
    row(2, "NMI", false),
    row(3, "BP", false),
    row(4, "OF", false),
    row(5, "BR", false),
    row(6, "UD", false),
    row(7, "NM", false),
    row(8, "DF", true),
    row(10, "TS", true),
    row(11, "NP", true),
    row(12, "SS", true),
    row(13, "GP", true),
    row(14, "PF", true),
    row(16, "MF", false),
    row(17, "AC", true),
    row(18, "MC", false),
    row(19, "XM", false),
];

/// The table row for `vector`, if one is defined.
#[must_use]
pub fn fault(vector: u8) -> Option<&'static FaultVector> {
    FAULT_VECTORS.iter().find(|row| row.vector == vector)
}

/// The mnemonic of `vector`, if defined.
#[must_use]
pub fn mnemonic(vector: u8) -> Option<&'static str> {
    fault(vector).map(|row| row.mnemonic)
}

/// Whether hardware pushes an error code when delivering `vector`.
#[must_use]
pub fn has_error_code(vector: u8) -> bool {
    fault(vector).is_some_and(|row| row.error_code)
}

/// Whether `vector` has no defined fault mnemonic. Covers the reserved fault
/// slots and the external-interrupt range alike; neither gets a default
/// gate.
#[must_use]
pub fn is_reserved(vector: u8) -> bool {
    fault(vector).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seventeen_defined_vectors() {
        assert_eq!(FAULT_VECTORS.len(), 17);
    }

    #[test]
    fn error_code_bearing_set() {
        let bearing: Vec<u8> = (0..=255).filter(|&v| has_error_code(v)).collect();
        assert_eq!(bearing, [8, 10, 11, 12, 13, 14, 17]);
    }

    #[test]
    fn reserved_slots_and_irq_range() {
        assert!(is_reserved(1));
        assert!(is_reserved(9));
        assert!(is_reserved(15));
        for vector in 20..=255 {
            assert!(is_reserved(vector));
        }
        assert!(!is_reserved(0));
        assert!(!is_reserved(19));
    }

    #[test]
    fn lookup_matches_table() {
        assert_eq!(mnemonic(13), Some("GP"));
        assert_eq!(mnemonic(3), Some("BP"));
        assert_eq!(mnemonic(32), None);
        assert_eq!(fault(8).map(|row| row.error_code), Some(true));
    }
}
