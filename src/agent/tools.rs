use serde::Deserialize;
use serde_json::{Number, Value, json};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::interest::{self, InvestmentParameters};
use crate::model::ToolDefinition;
use crate::report::{self, RateNotation};

pub const CALCULATE_INVESTMENT: &str = "calculate_investment";

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
}

impl ToolOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolExecutionError {
    message: String,
}

impl ToolExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ToolExecutionResult = std::result::Result<ToolOutput, ToolExecutionError>;
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolExecutionResult> + 'a>>;

pub trait ToolRunner {
    fn execute<'a>(&'a self, call: &'a ToolCall) -> ToolFuture<'a>;
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltinRunner {
    max_term_years: u64,
}

impl BuiltinRunner {
    pub fn new(max_term_years: u64) -> Self {
        Self { max_term_years }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolCallEnvelope {
    tool_call: ToolCallPayload,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolCallPayload {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Arguments of `calculate_investment`. No field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalculateInvestmentArgs {
    pub principal: f64,
    /// Kept as the raw JSON number so `5` and `5.0` echo back as written.
    pub rate: Number,
    pub time: i64,
    pub monthly_expense: f64,
}

impl CalculateInvestmentArgs {
    fn rate_notation(&self) -> RateNotation {
        if self.rate.is_i64() || self.rate.is_u64() {
            RateNotation::Whole
        } else {
            RateNotation::Decimal
        }
    }

    fn into_parameters(self) -> Result<(InvestmentParameters, RateNotation), ToolExecutionError> {
        let notation = self.rate_notation();
        let rate = self.rate.as_f64().ok_or_else(|| {
            ToolExecutionError::new(format!("rate {} is not a usable number", self.rate))
        })?;
        let params = InvestmentParameters {
            principal: self.principal,
            annual_rate_percent: rate,
            term_years: self.time,
            monthly_expense: self.monthly_expense,
        };
        Ok((params, notation))
    }
}

/// Schemas for providers that accept structured tool definitions.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: CALCULATE_INVESTMENT,
        description: "Calculate compound interest with monthly expenses",
        parameters: json!({
            "type": "object",
            "properties": {
                "principal": {
                    "type": "number",
                    "description": "Initial investment amount"
                },
                "rate": {
                    "type": "number",
                    "description": "Annual interest rate (as a percentage)"
                },
                "time": {
                    "type": "integer",
                    "description": "Time period in years"
                },
                "monthly_expense": {
                    "type": "number",
                    "description": "Monthly withdrawal/expense amount"
                }
            },
            "required": ["principal", "rate", "time", "monthly_expense"]
        }),
    }]
}

pub fn usage_instructions() -> &'static str {
    "Tools are available.
Available tools:
- calculate_investment: compound interest with monthly compounding and a fixed monthly withdrawal.
  Arguments (all required):
    principal: number, initial investment amount
    rate: number, annual interest rate as a percentage
    time: integer, time period in years
    monthly_expense: number, monthly withdrawal/expense amount
  Returns the final amount and a year-by-year balance schedule.
If a tool is needed, reply with exactly this JSON object and nothing else:
{\"tool_call\":{\"name\":\"calculate_investment\",\"arguments\":{\"principal\":100000,\"rate\":5.0,\"time\":10,\"monthly_expense\":500}}}
Only call the tool once you know all four values; ask the user for any that are missing.
After receiving tool results, explain them to the user in simple terms."
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

pub fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let parsed: ToolCallEnvelope = serde_json::from_str(strip_code_fence(text)).ok()?;
    let name = parsed.tool_call.name.trim();
    if name.is_empty() {
        return None;
    }
    Some(ToolCall {
        name: name.to_string(),
        arguments: parsed.tool_call.arguments,
    })
}

impl BuiltinRunner {
    fn calculate_investment(&self, arguments: &Value) -> ToolExecutionResult {
        let args = CalculateInvestmentArgs::deserialize(arguments).map_err(|err| {
            ToolExecutionError::new(format!("invalid {CALCULATE_INVESTMENT} arguments: {err}"))
        })?;

        if args.time > 0 && args.time as u64 > self.max_term_years {
            return Err(ToolExecutionError::new(format!(
                "time must be at most {} years, got {}",
                self.max_term_years, args.time
            )));
        }

        let (params, notation) = args.into_parameters()?;
        let summary = interest::summarize(&params)
            .map_err(|err| ToolExecutionError::new(format!("{CALCULATE_INVESTMENT} failed: {err}")))?;
        info!(
            principal = params.principal,
            rate = params.annual_rate_percent,
            term_years = params.term_years,
            monthly_expense = params.monthly_expense,
            final_balance = summary.final_balance,
            "computed investment projection"
        );
        Ok(ToolOutput::new(report::render_report(
            &params, &summary, notation,
        )))
    }
}

impl ToolRunner for BuiltinRunner {
    fn execute<'a>(&'a self, call: &'a ToolCall) -> ToolFuture<'a> {
        Box::pin(async move {
            debug!(tool_name = %call.name, "running built-in tool");

            match call.name.as_str() {
                CALCULATE_INVESTMENT => self.calculate_investment(&call.arguments),
                _ => {
                    warn!(tool_name = %call.name, "unknown built-in tool");
                    Err(ToolExecutionError::new(format!(
                        "unknown tool '{}'",
                        call.name
                    )))
                }
            }
        })
    }
}
