//! Pipeline stage definitions.

use serde::{Deserialize, Serialize};

/// The four fixed steps of the test-generation workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Initial test generation from submitted source.
    Generate,

    /// Refinement of previously generated tests.
    Refine,

    /// Repairing tests against a failing build log.
    BuildFix,

    /// Raising line coverage using a coverage report.
    Coverage,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Generate, Stage::Refine, Stage::BuildFix, Stage::Coverage];

    /// Stable wire name used in requests and responses.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Refine => "refine",
            Stage::BuildFix => "build_fix",
            Stage::Coverage => "coverage",
        }
    }

    pub fn parse(name: &str) -> Option<Stage> {
        match name.trim() {
            "generate" => Some(Stage::Generate),
            "refine" => Some(Stage::Refine),
            "build_fix" => Some(Stage::BuildFix),
            "coverage" => Some(Stage::Coverage),
            _ => None,
        }
    }

    /// One-line task description embedded in prompts and logs.
    pub fn describe(&self) -> &'static str {
        match self {
            Stage::Generate => "generate an initial Google Test suite for the supplied C++ source",
            Stage::Refine => "refine an existing test suite for clarity and completeness",
            Stage::BuildFix => "repair the test suite so it compiles cleanly",
            Stage::Coverage => "extend the test suite to raise line coverage",
        }
    }

    /// Every stage after the first consumes the prior stage's output.
    pub fn needs_previous_tests(&self) -> bool {
        !matches!(self, Stage::Generate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::Generate.name(), "generate");
        assert_eq!(Stage::Refine.name(), "refine");
        assert_eq!(Stage::BuildFix.name(), "build_fix");
        assert_eq!(Stage::Coverage.name(), "coverage");
    }

    #[test]
    fn parse_round_trips_every_stage() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.name()), Some(stage));
        }
        assert_eq!(Stage::parse("  refine  "), Some(Stage::Refine));
        assert_eq!(Stage::parse("compile"), None);
        assert_eq!(Stage::parse(""), None);
    }

    #[test]
    fn serde_uses_snake_case_wire_names() {
        let json = serde_json::to_string(&Stage::BuildFix).unwrap();
        assert_eq!(json, "\"build_fix\"");
        let back: Stage = serde_json::from_str("\"coverage\"").unwrap();
        assert_eq!(back, Stage::Coverage);
    }

    #[test]
    fn only_the_first_stage_starts_from_scratch() {
        assert!(!Stage::Generate.needs_previous_tests());
        assert!(Stage::Refine.needs_previous_tests());
        assert!(Stage::BuildFix.needs_previous_tests());
        assert!(Stage::Coverage.needs_previous_tests());
    }
}
