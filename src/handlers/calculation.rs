//! Arithmetic requests: "what is 6 times 7", "calculate (2 + 3) * 4".

use regex::Regex;
use serde_json::json;

use super::{TaskResponse, Utterance};
use crate::calc::{evaluate, format_number, sanitize, CalcError};

lazy_static::lazy_static! {
    static ref PHRASE: Regex = Regex::new(
        r"(?i)what is (\d+) (plus|minus|times|divided by) (\d+)"
    ).unwrap();
    static ref EXPRESSION: Regex = Regex::new(
        r"(?i)(?:calculate|compute|what is|how much is)\s+(.+)"
    ).unwrap();
}

const DIVIDE_BY_ZERO: &str = "I can't divide by zero.";

pub fn handle(utterance: &Utterance) -> TaskResponse {
    if let Some(response) = phrase_form(utterance.raw()) {
        return response;
    }

    let Some(caps) = EXPRESSION.captures(utterance.raw()) else {
        return TaskResponse::fail("I couldn't understand that calculation.");
    };

    let expression = caps[1].trim().trim_end_matches(['?', '!']);
    let compact = match sanitize(expression) {
        Ok(compact) => compact,
        Err(e) => {
            tracing::debug!(expression, error = %e, "Rejected calculation input");
            return TaskResponse::fail(format!(
                "I couldn't calculate \"{}\". Please check if the expression is valid.",
                expression.trim()
            ));
        }
    };

    match evaluate(&compact) {
        Ok(value) => {
            let result = format_number(value);
            TaskResponse::ok_with(
                format!("The result of {} is {}.", compact, result),
                json!({ "expression": compact, "result": value }),
            )
        }
        Err(CalcError::DivisionByZero) => TaskResponse::fail(DIVIDE_BY_ZERO),
        Err(e) => {
            tracing::debug!(expression = %compact, error = %e, "Calculation failed");
            TaskResponse::fail(format!(
                "I couldn't calculate \"{}\". Please check if the expression is valid.",
                compact
            ))
        }
    }
}

fn phrase_form(text: &str) -> Option<TaskResponse> {
    let caps = PHRASE.captures(text)?;
    let a: f64 = caps[1].parse().ok()?;
    let b: f64 = caps[3].parse().ok()?;
    let op = caps[2].to_lowercase();

    let value = match op.as_str() {
        "plus" => a + b,
        "minus" => a - b,
        "times" => a * b,
        "divided by" => {
            if b == 0.0 {
                return Some(TaskResponse::fail(DIVIDE_BY_ZERO));
            }
            a / b
        }
        _ => return None,
    };

    Some(TaskResponse::ok_with(
        format!(
            "{} {} {} equals {}.",
            format_number(a),
            op,
            format_number(b),
            format_number(value)
        ),
        json!({ "num1": a, "operation": op, "num2": b, "result": value }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> TaskResponse {
        handle(&Utterance::new(text))
    }

    #[test]
    fn test_expression_form() {
        let r = run("calculate 2 + 2");
        assert!(r.success);
        assert_eq!(r.message, "The result of 2+2 is 4.");
        assert_eq!(r.data.unwrap()["result"], 4.0);
    }

    #[test]
    fn test_trailing_question_mark() {
        let r = run("How much is (2+3)*4?");
        assert!(r.success);
        assert_eq!(r.message, "The result of (2+3)*4 is 20.");
    }

    #[test]
    fn test_phrase_form() {
        assert_eq!(run("what is 6 times 7").message, "6 times 7 equals 42.");
        assert_eq!(run("What is 7 divided by 2").message, "7 divided by 2 equals 3.5.");
    }

    #[test]
    fn test_division_by_zero_both_forms() {
        let phrase = run("what is 5 divided by 0");
        assert!(!phrase.success);
        assert_eq!(phrase.message, DIVIDE_BY_ZERO);

        let expr = run("calculate 5 / 0");
        assert!(!expr.success);
        assert_eq!(expr.message, DIVIDE_BY_ZERO);
    }

    #[test]
    fn test_code_is_never_evaluated() {
        let r = run("calculate require('fs').rmSync('/')");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert!(r.message.starts_with("I couldn't calculate"));
    }

    #[test]
    fn test_no_expression() {
        assert!(!run("do some math").success);
    }
}
