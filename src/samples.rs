//! Illustrative build and coverage data.
//!
//! The service never runs a real compiler or coverage pass; these fixed
//! strings stand in for the build and coverage pipeline output, and the
//! parsers below extract just enough structure from them to phrase the
//! build-fix and coverage prompts.

use regex::Regex;
use serde::Serialize;

/// Output of a representative failing CMake/gtest build.
pub const SAMPLE_BUILD_LOG: &str = r#"-- The CXX compiler identification is GNU 11.4.0
-- Configuring done
-- Generating done
-- Build files have been written to: /workspace/build
[ 25%] Building CXX object CMakeFiles/project_lib.dir/src/calculator.cpp.o
/workspace/src/calculator.cpp:42:18: error: 'accumulate' was not declared in this scope
   42 |     int total = accumulate(values.begin(), values.end(), 0);
      |                  ^~~~~~~~~~
[ 50%] Building CXX object CMakeFiles/run_tests.dir/tests/test_calculator.cpp.o
/workspace/tests/test_calculator.cpp:3:10: fatal error: calculator.hpp: No such file or directory
    3 | #include "calculator.hpp"
      |          ^~~~~~~~~~~~~~~~
compilation terminated.
/usr/bin/ld: CMakeFiles/run_tests.dir/tests/test_calculator.cpp.o: in function `CalculatorTest_Add_Test::TestBody()':
test_calculator.cpp:(.text+0x1b): undefined reference to `Calculator::add(int, int)'
make[2]: *** [CMakeFiles/run_tests.dir/build.make:76: CMakeFiles/run_tests.dir/tests/test_calculator.cpp.o] Error 1
make[1]: *** [CMakeFiles/Makefile2:110: CMakeFiles/run_tests.dir/all] Error 2
make: *** [Makefile:91: all] Error 2"#;

/// gcov-style per-file coverage output for the same project.
pub const SAMPLE_COVERAGE_REPORT: &str = r#"File 'src/calculator.cpp'
Lines executed:78.26% of 46
Creating 'calculator.cpp.gcov'

File 'src/matrix.cpp'
Lines executed:64.10% of 39
Creating 'matrix.cpp.gcov'

File 'src/string_utils.cpp'
Lines executed:91.67% of 24
Creating 'string_utils.cpp.gcov'"#;

#[derive(Debug, Clone, Serialize)]
pub struct BuildError {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileCoverage {
    pub file: String,
    pub coverage_percent: f64,
    pub total_lines: u64,
    pub lines_executed: u64,
}

const ERROR_PATTERNS: [(&str, &str); 5] = [
    (r"error: '([^']+)' was not declared", "undeclared_identifier"),
    (r"fatal error: ([^:]+): No such file", "missing_include"),
    (r"error: no matching function for call to '([^']+)'", "function_signature"),
    (r"error: '([^']+)' does not name a type", "unknown_type"),
    (r"undefined reference to `([^']+)'", "undefined_reference"),
];

/// Categorize compiler and linker errors found in a build log.
pub fn categorize_build_errors(log: &str) -> Vec<BuildError> {
    let patterns: Vec<(Regex, &'static str)> = ERROR_PATTERNS
        .iter()
        .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), *kind))
        .collect();

    let mut errors = Vec::new();
    for line in log.lines() {
        for (re, kind) in &patterns {
            if let Some(caps) = re.captures(line) {
                errors.push(BuildError {
                    kind,
                    message: line.trim().to_string(),
                    identifier: caps.get(1).map(|m| m.as_str().to_string()),
                });
                break;
            }
        }
    }
    errors
}

/// Extract per-file line coverage from gcov-style output.
pub fn parse_coverage(report: &str) -> Vec<FileCoverage> {
    let file_re = Regex::new(r"File '([^']+)'").unwrap();
    let lines_re = Regex::new(r"Lines executed:(\d+\.\d+)% of (\d+)").unwrap();

    let mut out = Vec::new();
    let mut current: Option<String> = None;

    for line in report.lines() {
        if let Some(caps) = file_re.captures(line) {
            current = Some(caps[1].to_string());
            continue;
        }
        if let Some(caps) = lines_re.captures(line) {
            let Some(file) = current.take() else { continue };
            let pct: f64 = caps[1].parse().unwrap_or(0.0);
            let total: u64 = caps[2].parse().unwrap_or(0);
            out.push(FileCoverage {
                file,
                coverage_percent: pct,
                total_lines: total,
                lines_executed: ((pct / 100.0) * total as f64).round() as u64,
            });
        }
    }
    out
}

/// Overall line coverage across all files in the report, if any.
pub fn overall_coverage(report: &str) -> Option<f64> {
    let files = parse_coverage(report);
    let total: u64 = files.iter().map(|f| f.total_lines).sum();
    if total == 0 {
        return None;
    }
    let executed: u64 = files.iter().map(|f| f.lines_executed).sum();
    Some(executed as f64 / total as f64 * 100.0)
}
