use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A scalar value as accepted for variables, backend settings and envs.
///
/// TOML lets users write `count = 3` or `enabled = true`; Terraform only
/// ever sees strings, so values are coerced once in [`crate::resolve`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Integer(i)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

/// The lifecycle operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Destroy,
}

impl OperationKind {
    /// How module variables reach Terraform for this operation.
    ///
    /// Destroy must not fail because a variable is no longer declared by the
    /// module, so variables go through `TF_VAR_*` environment entries there.
    pub fn variable_delivery(self) -> VariableDelivery {
        match self {
            OperationKind::Create | OperationKind::Update => VariableDelivery::Native,
            OperationKind::Destroy => VariableDelivery::Environment,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

/// Variable delivery mechanism.
///
/// - `Native`: `-var key=value` arguments.
/// - `Environment`: `TF_VAR_key=value` environment entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDelivery {
    Native,
    Environment,
}

/// One step of an operation that can fail after log streaming started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GetModule,
    StageFiles,
    Init,
    Plan,
    Apply,
    Destroy,
    Output,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::GetModule => "terraform module download failed",
            Phase::StageFiles => "writing extra files failed",
            Phase::Init => "terraform init failed",
            Phase::Plan => "terraform plan failed",
            Phase::Apply => "terraform apply failed",
            Phase::Destroy => "terraform destroy failed",
            Phase::Output => "cannot get terraform output",
        };
        f.write_str(s)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
