//! Configuration for decoding, editing and rendering method bodies
//!
//! The defaults accept everything a well-formed module contains and reject structural damage.
//! The presets trade strictness for tolerance of sloppy or hand-written input.

/// Knobs controlling how a [`crate::method::MethodBody`] is decoded, edited and rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct BodyConfig {
    /// Reject unassigned opcodes instead of keeping them as one-unit raw instructions
    pub strict_opcodes: bool,

    /// Insert address and line carrier rows when a debug row cannot hold its deltas
    /// after an edit, instead of failing the edit
    pub normalize_debug: bool,

    /// Check that try ranges and catch addresses land on instruction boundaries while decoding
    pub verify_try_ranges: bool,

    /// Maximum number of instructions accepted while decoding
    pub max_instructions: usize,

    /// Maximum number of debug rows accepted while decoding
    pub max_debug_rows: usize,

    /// Indentation width of code lines in text output
    pub indent: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            strict_opcodes: true,
            normalize_debug: true,
            verify_try_ranges: true,
            max_instructions: 1 << 20,
            max_debug_rows: 1 << 20,
            indent: 4,
        }
    }
}

impl BodyConfig {
    /// Every check enabled and no automatic repair of debug rows
    #[must_use]
    pub fn strict() -> Self {
        Self {
            normalize_debug: false,
            ..Self::default()
        }
    }

    /// Accepts unassigned opcodes and repairs debug rows
    ///
    /// Useful for inspecting damaged or obfuscated code.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            strict_opcodes: false,
            normalize_debug: true,
            verify_try_ranges: false,
            ..Self::default()
        }
    }

    /// Skips the optional checks for maximum throughput
    ///
    /// Structural errors are still reported; only the boundary verification of the try table
    /// is skipped.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            verify_try_ranges: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_config_presets() {
        let strict = BodyConfig::strict();
        assert!(strict.strict_opcodes);
        assert!(!strict.normalize_debug);
        assert!(strict.verify_try_ranges);

        let lenient = BodyConfig::lenient();
        assert!(!lenient.strict_opcodes);
        assert!(lenient.normalize_debug);
        assert!(!lenient.verify_try_ranges);

        let minimal = BodyConfig::minimal();
        assert!(minimal.strict_opcodes);
        assert!(!minimal.verify_try_ranges);
        assert_eq!(minimal.indent, 4);
    }

    #[test]
    fn test_default_config() {
        let default = BodyConfig::default();
        assert!(default.strict_opcodes && default.normalize_debug && default.verify_try_ranges);
        assert_eq!(default.max_instructions, 1 << 20);
    }
}
