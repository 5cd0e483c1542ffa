//! Request, environment and test definition types shared by every stage of
//! the pipeline.
mod check;
mod environment;
mod report;
mod request;

pub use check::{Check, JsonKind, TestDefinition};
pub use environment::{EnvironmentDelta, EnvironmentSnapshot, RowVars, VarMap};
pub use report::{TestReport, TestResult, TestSource};
pub use request::{
    ApiKeyPlacement, Auth, ExecutionMode, HttpMethod, KeyValue, RequestBody, RequestDraft,
    RequestOverride,
};
