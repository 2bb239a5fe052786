mod common;

use common::{run, run_lines, runtime_error};
use hype::interpreter::RuntimeErrorKind;
use pretty_assertions::assert_eq;

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_integer_addition() {
    assert_eq!(run("print 1 + 2"), "3\n");
}

#[test]
fn test_fractional_results_keep_fraction() {
    assert_eq!(run_lines("print 7 / 2\nprint 0.1 + 0.2 == 0.3\nprint 1.5 * 2"), vec!["3.5", "false", "3"]);
}

#[test]
fn test_unary_minus_binds_tighter_than_binary() {
    assert_eq!(run("print -2 * 3 + 10"), "4\n");
}

#[test]
fn test_grouping_overrides_precedence() {
    assert_eq!(run("print (2 + 3) * (4 - 1)"), "15\n");
}

#[test]
fn test_division_by_zero_is_not_an_error() {
    assert_eq!(run_lines("print 1 / 0\nvar n = 0 / 0\nprint n == n"), vec!["inf", "false"]);
}

#[test]
fn test_arithmetic_on_strings_fails() {
    let error = runtime_error("print \"a\" * 2");
    assert_eq!(error.kind(), RuntimeErrorKind::OperandType);
    assert_eq!(error.message(), "Operands must be numbers.");
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_concatenation() {
    assert_eq!(run("print \"a\" + \"b\""), "ab\n");
    assert_eq!(run("var greeting = \"hello\"\nprint greeting + \", \" + \"world\""), "hello, world\n");
}

#[test]
fn test_number_plus_string_fails() {
    let error = runtime_error("print 1 + \"a\"");
    assert_eq!(error.kind(), RuntimeErrorKind::OperandType);
    assert_eq!(error.message(), "Operands must be two numbers or two strings.");
}

#[test]
fn test_escape_sequences_print_decoded() {
    assert_eq!(run(r#"print "tab\there""#), "tab\there\n");
    assert_eq!(run(r#"print "say \"hi\"""#), "say \"hi\"\n");
}

// ============================================================================
// Comparison and equality
// ============================================================================

#[test]
fn test_comparisons() {
    assert_eq!(
        run_lines("print 1 < 2\nprint 2 <= 2\nprint 3 > 4\nprint 4 >= 5"),
        vec!["true", "true", "false", "false"]
    );
}

#[test]
fn test_comparing_strings_fails() {
    assert_eq!(runtime_error("print \"a\" < \"b\"").kind(), RuntimeErrorKind::OperandType);
}

#[test]
fn test_equality_across_types() {
    assert_eq!(
        run_lines("print nil == false\nprint 0 == \"0\"\nprint \"x\" == \"x\"\nprint nil != nil"),
        vec!["false", "false", "true", "false"]
    );
}

#[test]
fn test_list_equality_is_structural() {
    assert_eq!(run_lines("print [1, [2]] == [1, [2]]\nprint [1] == [2]"), vec!["true", "false"]);
}

#[test]
fn test_functions_compare_by_identity() {
    let source = "func f() {}\nfunc g() {}\nvar h = f\nprint f == h\nprint f == g";
    assert_eq!(run_lines(source), vec!["true", "false"]);
}

// ============================================================================
// Logical and unary
// ============================================================================

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(
        run_lines("print nil or 3\nprint 1 or 2\nprint nil and 2\nprint 1 and \"x\""),
        vec!["3", "1", "nil", "x"]
    );
}

#[test]
fn test_not_uses_truthiness() {
    assert_eq!(run_lines("print !nil\nprint !0\nprint !!\"\""), vec!["true", "false", "true"]);
}

#[test]
fn test_negating_non_number_fails() {
    let error = runtime_error("print -nil");
    assert_eq!(error.kind(), RuntimeErrorKind::OperandType);
    assert_eq!(error.message(), "Operand must be a number.");
}

// ============================================================================
// Assignment forms
// ============================================================================

#[test]
fn test_assignment_is_an_expression() {
    assert_eq!(run_lines("var a\nvar b\nprint a = b = 3\nprint a + b"), vec!["3", "6"]);
}

#[test]
fn test_compound_assignment() {
    assert_eq!(run("var s = \"ab\"\ns += \"cd\"\nprint s"), "abcd\n");
    assert_eq!(run("var n = 9\nn /= 3\nn *= 4\nn -= 2\nprint n"), "10\n");
}

#[test]
fn test_postfix_returns_previous_value() {
    assert_eq!(run_lines("var i = 5\nvar j = i++\nprint j\nprint i"), vec!["5", "6"]);
    assert_eq!(run_lines("var k = 0\nprint k--\nprint k"), vec!["0", "-1"]);
}

#[test]
fn test_postfix_on_non_number_fails() {
    assert_eq!(runtime_error("var s = \"a\"\ns++").kind(), RuntimeErrorKind::OperandType);
}
