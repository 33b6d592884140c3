//! Execute queries against JSON input

use std::fmt::Write;

use super::{CliError, infer_type, json_to_value, value_to_json};
use crate::{
    ast::Expr,
    executor::{InMemoryExecutor, QueryExecutor},
    parser::parse_query,
    structure::QueryParser,
    types::Type,
    value::{Value, type_name},
};

/// Options for the run and explain commands
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The query chain, starting at `$`
    pub query: String,
    /// JSON array the query runs over
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
}

/// Builds the root expression `$` from JSON text.
fn root_expression(input: Option<&str>) -> Result<Expr, CliError> {
    let Some(json) = input else {
        return Ok(Expr::constant(Value::Array(Vec::new()), Type::sequence(Type::Any))?);
    };
    let value = json_to_value(serde_json::from_str(json)?);
    if !matches!(value, Value::Array(_)) {
        return Err(CliError::NotASequence(type_name(&value)));
    }
    let ty = infer_type(&value);
    Ok(Expr::constant(value, ty)?)
}

/// Parses, builds and executes the query; returns the result as JSON.
pub fn execute_run(options: &RunOptions) -> Result<serde_json::Value, CliError> {
    let input = options.input.as_deref().ok_or(CliError::NoInput)?;
    let chain = parse_query(&options.query, root_expression(Some(input))?)?;
    let model = QueryParser::new().parse(&chain)?;
    let data = InMemoryExecutor::new().execute(&model)?;
    Ok(value_to_json(data.into_value()))
}

/// Describes the query model built for the query and its output shape.
///
/// Without input the root is typed `seq<any>`.
pub fn explain(options: &RunOptions) -> Result<String, CliError> {
    let chain = parse_query(&options.query, root_expression(options.input.as_deref())?)?;
    let model = QueryParser::new().parse(&chain)?;
    let info = model.output_data_info()?;

    let mut out = String::new();
    let _ = writeln!(out, "{}", model);
    let _ = writeln!(out, "output: {}", info);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_input_is_rejected() {
        let options = RunOptions {
            query: "$".to_string(),
            input: Some(r#"{"a": 1}"#.to_string()),
            pretty: false,
        };
        assert!(matches!(execute_run(&options), Err(CliError::NotASequence("object"))));
    }

    #[test]
    fn run_requires_input() {
        let options = RunOptions {
            query: "$.count()".to_string(),
            ..Default::default()
        };
        assert!(matches!(execute_run(&options), Err(CliError::NoInput)));
    }
}
