use crate::samples;
use crate::stage::Stage;

#[derive(Debug, Clone)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

/// Everything a stage prompt can draw on. All fields arrive with the
/// request; the server holds nothing between stages.
#[derive(Debug, Default)]
pub struct StageContext<'a> {
    pub source: &'a str,
    pub analysis: Option<&'a str>,
    pub previous_tests: Option<&'a str>,
    pub build_log: Option<&'a str>,
    pub coverage_report: Option<&'a str>,
}

pub fn build_prompt(stage: Stage, ctx: &StageContext) -> LlmPrompt {
    LlmPrompt {
        system: system_prompt(),
        user: user_prompt(stage, ctx),
    }
}

/* ============================================================
   System prompt (stable, shared by all stages)
   ============================================================ */

fn system_prompt() -> String {
    r#"
You are an expert C++ test engineer producing Google Test suites.

Rules:
- Output a single complete C++ test file, nothing else
- Use Google Test; use Google Mock only when strictly needed
- Tests must be deterministic, isolated, and buildable on their own
- Cover normal paths, edge cases, and error handling
- Do NOT restate or refactor the code under test
"#
    .trim()
    .to_string()
}

/* ============================================================
   User prompt (per stage)
   ============================================================ */

fn user_prompt(stage: Stage, ctx: &StageContext) -> String {
    let mut out = String::new();

    /* ---------- CONTEXT ---------- */
    out.push_str("CONTEXT\n");
    out.push_str(&format!("Task: {}\n", stage.describe()));
    out.push_str("Framework: Google Test\n");
    out.push_str("Language: C++17\n\n");

    if let Some(analysis) = ctx.analysis {
        out.push_str("REPOSITORY ANALYSIS\n");
        out.push_str(analysis.trim_end());
        out.push_str("\n\n");
    }

    /* ---------- SOURCE ---------- */
    out.push_str("SOURCE\n```cpp\n");
    out.push_str(ctx.source.trim_end());
    out.push_str("\n```\n\n");

    if let Some(tests) = ctx.previous_tests {
        out.push_str("CURRENT TESTS\n```cpp\n");
        out.push_str(tests.trim_end());
        out.push_str("\n```\n\n");
    }

    /* ---------- STAGE-SPECIFIC SECTIONS ---------- */
    match stage {
        Stage::Generate => {
            out.push_str(
                "INSTRUCTIONS\n\
                 - Write a complete Google Test file for the source above\n\
                 - One test suite per class; cover constructors, accessors, and mutators\n\
                 - Include edge cases: empty input, boundary values, thrown exceptions\n",
            );
        }

        Stage::Refine => {
            out.push_str(
                "INSTRUCTIONS\n\
                 - Improve the current tests without discarding passing cases\n\
                 - Remove duplicated assertions; tighten fixture setup\n\
                 - Add the edge cases the current tests skip\n",
            );
        }

        Stage::BuildFix => {
            if let Some(log) = ctx.build_log {
                out.push_str("BUILD LOG\n```\n");
                out.push_str(log.trim_end());
                out.push_str("\n```\n\n");

                let errors = samples::categorize_build_errors(log);
                if !errors.is_empty() {
                    out.push_str("DETECTED ERRORS\n");
                    for e in &errors {
                        match &e.identifier {
                            Some(id) => out.push_str(&format!("- {}: {}\n", e.kind, id)),
                            None => out.push_str(&format!("- {}\n", e.kind)),
                        }
                    }
                    out.push('\n');
                }
            }
            out.push_str(
                "INSTRUCTIONS\n\
                 - Fix the test file so the build above succeeds\n\
                 - Resolve missing includes and undeclared identifiers first\n\
                 - Do not delete test cases just to silence errors\n",
            );
        }

        Stage::Coverage => {
            if let Some(report) = ctx.coverage_report {
                out.push_str("COVERAGE REPORT\n```\n");
                out.push_str(report.trim_end());
                out.push_str("\n```\n\n");

                if let Some(pct) = samples::overall_coverage(report) {
                    out.push_str(&format!("Overall line coverage is {:.1}%.\n\n", pct));
                }
            }
            out.push_str(
                "INSTRUCTIONS\n\
                 - Add tests for the least-covered files first\n\
                 - Target uncovered branches and error paths\n\
                 - Keep existing passing tests unchanged\n",
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "class Calculator {\npublic:\n    int add(int a, int b);\n};\n";

    #[test]
    fn generate_prompt_embeds_source() {
        let ctx = StageContext {
            source: SOURCE,
            ..Default::default()
        };
        let prompt = build_prompt(Stage::Generate, &ctx);
        assert!(prompt.system.contains("Google Test"));
        assert!(prompt.user.contains("class Calculator"));
        assert!(prompt.user.contains("INSTRUCTIONS"));
    }

    #[test]
    fn refine_prompt_carries_previous_tests_verbatim() {
        let ctx = StageContext {
            source: SOURCE,
            previous_tests: Some("TEST(CalculatorTest, AddsTwoNumbers) { EXPECT_EQ(3, 3); }"),
            ..Default::default()
        };
        let prompt = build_prompt(Stage::Refine, &ctx);
        assert!(prompt.user.contains("CURRENT TESTS"));
        assert!(prompt.user.contains("TEST(CalculatorTest, AddsTwoNumbers)"));
    }

    #[test]
    fn build_fix_prompt_lists_categorized_errors() {
        let ctx = StageContext {
            source: SOURCE,
            previous_tests: Some("TEST(CalculatorTest, Add) {}"),
            build_log: Some(samples::SAMPLE_BUILD_LOG),
            ..Default::default()
        };
        let prompt = build_prompt(Stage::BuildFix, &ctx);
        assert!(prompt.user.contains("BUILD LOG"));
        assert!(prompt.user.contains("DETECTED ERRORS"));
        assert!(prompt.user.contains("missing_include: calculator.hpp"));
    }

    #[test]
    fn coverage_prompt_states_overall_percentage() {
        let ctx = StageContext {
            source: SOURCE,
            previous_tests: Some("TEST(CalculatorTest, Add) {}"),
            coverage_report: Some(samples::SAMPLE_COVERAGE_REPORT),
            ..Default::default()
        };
        let prompt = build_prompt(Stage::Coverage, &ctx);
        assert!(prompt.user.contains("COVERAGE REPORT"));
        assert!(prompt.user.contains("Overall line coverage is 76.1%"));
    }

    #[test]
    fn analysis_section_appears_when_present() {
        let ctx = StageContext {
            source: "Repository: https://example.com/calc.git",
            analysis: Some("Classes: 3\nMethods: 12"),
            ..Default::default()
        };
        let prompt = build_prompt(Stage::Generate, &ctx);
        assert!(prompt.user.contains("REPOSITORY ANALYSIS"));
        assert!(prompt.user.contains("Classes: 3"));
    }
}
