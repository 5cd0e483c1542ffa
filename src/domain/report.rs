use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSource {
    Structured,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub pass: bool,
    pub message: String,
    pub source: TestSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TestResult {
    #[must_use]
    pub fn structured(name: impl Into<String>, pass: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pass,
            message: message.into(),
            source: TestSource::Structured,
            duration_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<TestResult>,
}

impl TestReport {
    pub fn push(&mut self, result: TestResult) {
        self.total = self.total.saturating_add(1);
        if result.pass {
            self.passed = self.passed.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
        }
        self.results.push(result);
    }

    pub fn extend(&mut self, other: Self) {
        for result in other.results {
            self.push(result);
        }
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
