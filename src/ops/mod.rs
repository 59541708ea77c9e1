use anyhow::{bail, Context, Result};
use clap::ValueEnum;

/// Line transforms the CLI can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    /// Square a signed 64-bit integer
    Square,
    /// Double a signed 64-bit integer
    Double,
    /// Negate a signed 64-bit integer
    Negate,
    /// Count the characters of the line
    Length,
    /// Uppercase the line
    Upper,
    /// Lowercase the line
    Lower,
    /// Reverse the characters of the line
    Reverse,
    /// Strip leading and trailing whitespace
    Trim,
}

impl Operation {
    pub fn apply(&self, line: &str) -> Result<String> {
        let output = match self {
            Operation::Square => {
                let value = parse_integer(line)?;
                match value.checked_mul(value) {
                    Some(squared) => squared.to_string(),
                    None => bail!("integer overflow squaring {}", value),
                }
            }
            Operation::Double => {
                let value = parse_integer(line)?;
                match value.checked_mul(2) {
                    Some(doubled) => doubled.to_string(),
                    None => bail!("integer overflow doubling {}", value),
                }
            }
            Operation::Negate => {
                let value = parse_integer(line)?;
                match value.checked_neg() {
                    Some(negated) => negated.to_string(),
                    None => bail!("integer overflow negating {}", value),
                }
            }
            Operation::Length => line.chars().count().to_string(),
            Operation::Upper => line.to_uppercase(),
            Operation::Lower => line.to_lowercase(),
            Operation::Reverse => line.chars().rev().collect(),
            Operation::Trim => line.trim().to_string(),
        };

        Ok(output)
    }
}

fn parse_integer(line: &str) -> Result<i64> {
    line.trim()
        .parse::<i64>()
        .with_context(|| format!("invalid integer: {:?}", line))
}
