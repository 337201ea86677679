use devconsole_types::LogValue;

use crate::error::EvalError;

/// Evaluates the text typed into the console
pub trait Evaluator {
    fn eval(&mut self, source: &str) -> Result<LogValue, EvalError>;
}

/// Evaluates input as a JSON literal
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEvaluator;

impl Evaluator for JsonEvaluator {
    fn eval(&mut self, source: &str) -> Result<LogValue, EvalError> {
        serde_json::from_str(source.trim()).map_err(|e| EvalError::new(e.to_string()))
    }
}

impl<F> Evaluator for F
where
    F: FnMut(&str) -> Result<LogValue, EvalError>,
{
    fn eval(&mut self, source: &str) -> Result<LogValue, EvalError> {
        self(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_literals() {
        let mut eval = JsonEvaluator;
        assert_eq!(eval.eval("42").unwrap(), json!(42));
        assert_eq!(eval.eval(r#" {"a": [1, 2]} "#).unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_invalid_input_is_error() {
        let err = JsonEvaluator.eval("1 +").unwrap_err();
        assert!(!err.message().is_empty());
    }
}
