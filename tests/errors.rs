mod common;

use common::{run_partial, runtime_error, syntax_errors};
use hype::interpreter::{parse_and_run, parse_and_run_with_diagnostics, RuntimeErrorKind};
use pretty_assertions::assert_eq;

// ============================================================================
// Syntax errors
// ============================================================================

#[test]
fn test_parser_reports_every_bad_statement() {
    let (scan, parse) = syntax_errors("var 1 = 2\nprint \"ok\"\nprint )");
    assert!(scan.is_empty());
    let lines: Vec<usize> = parse.iter().map(|error| error.line).collect();
    assert_eq!(lines, vec![1, 3]);
    assert_eq!(parse[0].message, "Expect variable name.");
    assert_eq!(parse[1].to_string(), "[line 3] Error at ')': Expect expression.");
}

#[test]
fn test_syntax_error_prevents_execution() {
    let (output, result) = run_partial("print \"first\"\nprint 1 +");
    assert_eq!(output, "");
    assert!(result.is_err_and(|error| error.is_syntax()));
}

#[test]
fn test_unterminated_string_is_a_scan_error() {
    let (scan, _) = syntax_errors("print \"never closed");
    assert_eq!(scan.len(), 1);
    assert_eq!(scan[0].to_string(), "[line 1] Error: Unterminated string.");
}

#[test]
fn test_unexpected_character_is_a_scan_error() {
    let (scan, _) = syntax_errors("var x = 1\nvar y = x @ 2");
    assert_eq!(scan[0].message, "Unexpected character '@'.");
    assert_eq!(scan[0].line, 2);
}

#[test]
fn test_invalid_assignment_target() {
    let (_, parse) = syntax_errors("var a = 1\na + 1 = 3");
    assert_eq!(parse.len(), 1);
    assert_eq!(parse[0].message, "Invalid assignment target.");
    assert_eq!(parse[0].line, 2);
}

#[test]
fn test_reserved_keywords() {
    let (_, parse) = syntax_errors("hyp { print 1 }\npar print 2");
    assert_eq!(parse.len(), 2);
    assert!(parse[0].message.contains("'hyp' is reserved"));
    assert!(parse[1].message.contains("'par' is reserved"));
}

#[test]
fn test_unclosed_block() {
    let (_, parse) = syntax_errors("func f() {\n  print 1\n");
    assert_eq!(parse.len(), 1);
    assert_eq!(parse[0].message, "Expect '}' after block.");
}

// ============================================================================
// Runtime errors
// ============================================================================

#[test]
fn test_undefined_variable() {
    let error = runtime_error("var a = 1\nprint nope");
    assert_eq!(error.kind(), RuntimeErrorKind::UndefinedVariable);
    assert_eq!(error.to_string(), "[line 2] Error: Undefined variable 'nope'.");
}

#[test]
fn test_assigning_undeclared_variable() {
    assert_eq!(runtime_error("ghost = 1").kind(), RuntimeErrorKind::UndefinedVariable);
}

#[test]
fn test_operand_type_errors() {
    assert_eq!(
        runtime_error("print 1 + \"a\"").message(),
        "Operands must be two numbers or two strings."
    );
    assert_eq!(runtime_error("print -\"x\"").message(), "Operand must be a number.");
    assert_eq!(runtime_error("print 2 < nil").message(), "Operands must be numbers.");
    assert_eq!(runtime_error("\"str\"()").message(), "Can only call functions.");
}

#[test]
fn test_error_inside_function_reports_inner_line() {
    let error = runtime_error("func f() {\n  return missing\n}\nf()");
    assert_eq!(error.kind(), RuntimeErrorKind::UndefinedVariable);
    assert_eq!(error.line(), 2);
}

#[test]
fn test_output_before_runtime_error_is_kept() {
    let (output, result) = run_partial("print 1\nprint nope\nprint 2");
    assert_eq!(output, "1\n");
    assert!(result.is_err_and(|error| !error.is_syntax()));
}

#[test]
fn test_list_index_out_of_bounds() {
    let error = runtime_error("var xs = [1, 2, 3]\nprint xs[5]");
    assert_eq!(error.kind(), RuntimeErrorKind::IndexBounds);
    assert_eq!(error.message(), "Index 5 is out of bounds for length 3.");
    assert_eq!(error.line(), 2);
}

#[test]
fn test_bad_index_and_property() {
    assert_eq!(runtime_error("print [1][0.5]").kind(), RuntimeErrorKind::OperandType);
    assert_eq!(runtime_error("print \"hello\"[\"z\"]").kind(), RuntimeErrorKind::NotFound);
    assert_eq!(
        runtime_error("print [1].size").message(),
        "Undefined property 'size' on list."
    );
    assert_eq!(runtime_error("print nil[0]").kind(), RuntimeErrorKind::OperandType);
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let source = format!("print {}1{}", "(".repeat(20_000), ")".repeat(20_000));
    let (_, parse) = syntax_errors(&source);
    assert_eq!(parse.len(), 1);
    assert_eq!(parse[0].message, "Expression nested too deeply.");
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_parse_and_run_formats_errors() {
    assert_eq!(
        parse_and_run("print 1\nprint nope"),
        Err("[line 2] Error: Undefined variable 'nope'.".to_string())
    );
}

#[test]
fn test_diagnostic_codes() {
    let syntax = parse_and_run_with_diagnostics("print )").unwrap_err();
    assert_eq!(syntax.len(), 1);
    assert_eq!(syntax[0].code.as_deref(), Some("E0101"));
    assert_eq!(syntax[0].line, Some(1));

    let scan = parse_and_run_with_diagnostics("print \"open").unwrap_err();
    assert_eq!(scan[0].code.as_deref(), Some("E0001"));

    let arity = parse_and_run_with_diagnostics("func pair(a, b) { return a }\npair(1)").unwrap_err();
    assert_eq!(arity[0].code.as_deref(), Some("E0205"));
    assert_eq!(arity[0].notes, vec!["help: `pair` takes 2 arguments".to_string()]);

    let runtime = parse_and_run_with_diagnostics("print\n  nope").unwrap_err();
    assert_eq!(runtime[0].code.as_deref(), Some("E0201"));
    assert_eq!(runtime[0].line, Some(2));
}
