//! Semantic analyzer integration tests.
//!
//! Each test parses and checks a Pigeon program via `pigeon_compiler::type_check`
//! and asserts on the presence (or absence) of specific error codes.

use pigeon_compiler::{compile_source, Natives, ScopeId};
use pigeon_types::ast::{ExprKind, Item, Stmt};
use pigeon_types::{Diagnostics, ErrorCode, SourceFile, Type, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn check(source: &str) -> Diagnostics {
    pigeon_compiler::type_check(source, "test.pg")
}

fn render(errors: &Diagnostics) -> String {
    errors
        .errors
        .iter()
        .map(|e| format!("  [{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn assert_ok(source: &str) {
    let errors = check(source);
    assert!(
        !errors.has_errors(),
        "expected no errors, got {}:\n{}",
        errors.total_errors,
        render(&errors)
    );
}

fn assert_error(source: &str, expected_code: ErrorCode) {
    let errors = check(source);
    assert!(
        errors.errors.iter().any(|e| e.code == expected_code),
        "expected error code {expected_code}, got:\n{}",
        render(&errors)
    );
}

fn assert_n_errors(source: &str, n: usize) {
    let errors = check(source);
    assert_eq!(
        errors.total_errors,
        n,
        "expected {n} errors, got {}:\n{}",
        errors.total_errors,
        render(&errors)
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Valid programs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn empty_program_passes() {
    assert_ok("");
}

#[test]
fn declarations_and_expressions() {
    assert_ok(
        r#"
var a = 1;
var b = 2.5;
const c = "pigeon";
var d = true;
var e = a + b * 2;
var f = c + " coo";
var g = !d || a < b && a != 3;
var h = a % 2 == 0 ? 1.0 : 2;
var i = -a + +b;
"#,
    );
}

#[test]
fn compound_assignments() {
    assert_ok(
        r#"
var n = 10;
n += 1; n -= 2; n *= 3; n /= 4; n %= 5;
var x = 1.5;
x += 1; x -= 0.5; x *= 2; x /= 3;
var s = "a";
s += "b";
"#,
    );
}

#[test]
fn int_widens_to_float() {
    assert_ok(
        r#"
float half(float x) { return x / 2; }
float widened() { return 1; }
var f = 1.0;
f = 3;
var h = half(4);
"#,
    );
}

#[test]
fn control_flow() {
    assert_ok(
        r#"
var total = 0;
for i = 1 to 10 {
    if i % 2 == 0 { continue; }
    total += i;
}
for j = 10 downto 1 total -= j;
while total > 0 {
    total -= 1;
    if total == 3 break;
}
do {
    total += 1;
} while total < 5;
{
    var inner = total;
}
"#,
    );
}

#[test]
fn functions_recursion_and_forward_calls() {
    assert_ok(
        r#"
int fib(int n) {
    if n < 2 { return n; }
    return fib(n - 1) + fib(n - 2);
}
void greet() { shout("hi"); }
void shout(string s) { return; }
var f = fib(10);
greet();
"#,
    );
}

#[test]
fn shadowing_in_nested_scopes() {
    assert_ok(
        r#"
var x = 1;
{
    var x = "shadow";
    x += "!";
    {
        var x = true;
    }
}
x += 2;
"#,
    );
}

#[test]
fn if_else_returning_on_every_path() {
    assert_ok(
        r#"
int sign(int n) {
    if n < 0 { return -1; } else if n > 0 { return 1; } else { return 0; }
}
"#,
    );
}

#[test]
fn locals_may_shadow_parameters_and_counters() {
    assert_ok("int f(int a) { var a = 2.5; return 1; }");
    assert_ok("for i = 1 to 3 { var i = \"shadow\"; i += \"!\"; }");
    assert_ok("void f(int a) { { var a = true; } a += 1; }");
}

#[test]
fn increment_decrement_and_step() {
    assert_ok(
        r#"
var n = 0;
var x = 1.5;
n++;
x--;
for i = 10 downto 0 step 3 { n++; }
"#,
    );
}

#[test]
fn loop_counter_of_separate_loops_reuses_name() {
    assert_ok(
        r#"
for i = 1 to 3 { }
for i = 1 to 3 { var i2 = i * 2; }
"#,
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Type errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn binary_operator_mismatch() {
    assert_error(r#"var x = "a" - "b";"#, ErrorCode::INVALID_BINARY_OPERATOR);
    assert_error(r#"var x = 1 + "b";"#, ErrorCode::INVALID_BINARY_OPERATOR);
    assert_error("var x = 1.5 % 2;", ErrorCode::INVALID_BINARY_OPERATOR);
    assert_error("var x = 1 && true;", ErrorCode::INVALID_BINARY_OPERATOR);
    assert_error("var x = 1 == 1.0;", ErrorCode::INVALID_BINARY_OPERATOR);
}

#[test]
fn unary_operator_mismatch() {
    assert_error("var x = !1;", ErrorCode::INVALID_UNARY_OPERATOR);
    assert_error(r#"var x = -"a";"#, ErrorCode::INVALID_UNARY_OPERATOR);
}

#[test]
fn ternary_branches_must_unify() {
    assert_error(r#"var x = true ? 1 : "a";"#, ErrorCode::INVALID_TERNARY_OPERATOR);
    assert_error("var x = 1 ? 1 : 2;", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn assignment_never_narrows() {
    assert_error("var x = 1; x = 2.5;", ErrorCode::INVALID_ASSIGNMENT);
    assert_error(r#"var s = "a"; s -= "b";"#, ErrorCode::INVALID_ASSIGNMENT);
    assert_error("var f = 1.0; f %= 2;", ErrorCode::INVALID_ASSIGNMENT);
    assert_error("var b = true; b = 1;", ErrorCode::INVALID_ASSIGNMENT);
}

#[test]
fn increments_and_steps_are_type_checked() {
    assert_error("var s = \"a\"; s++;", ErrorCode::INVALID_ASSIGNMENT);
    assert_error("var b = true; b--;", ErrorCode::INVALID_ASSIGNMENT);
    assert_error("const c = 1; c++;", ErrorCode::READ_ONLY_ASSIGNMENT);
    assert_error("for i = 1 to 3 { i++; }", ErrorCode::READ_ONLY_ASSIGNMENT);
    assert_error("for i = 1 to 9 step 2.5 { }", ErrorCode::TYPE_MISMATCH);
    assert_error("for i = 1 to 9 step i { }", ErrorCode::UNDECLARED_VARIABLE);
}

#[test]
fn conditions_must_be_bool() {
    assert_error("if 1 { }", ErrorCode::TYPE_MISMATCH);
    assert_error(r#"while "yes" { }"#, ErrorCode::TYPE_MISMATCH);
    assert_error("do { } while 0;", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn for_bounds_must_be_int() {
    assert_error("for i = 1.0 to 3 { }", ErrorCode::TYPE_MISMATCH);
    assert_error("for i = 1 to true { }", ErrorCode::TYPE_MISMATCH);
}

#[test]
fn void_is_not_a_value() {
    assert_error("void f() { } var x = f();", ErrorCode::INVALID_TYPE);
    assert_error("void f(void v) { }", ErrorCode::INVALID_TYPE);
    assert_error("void f() { } var x = f() + 1;", ErrorCode::INVALID_BINARY_OPERATOR);
}

#[test]
fn call_argument_checks() {
    assert_error("int f(int a) { return a; } var x = f();", ErrorCode::WRONG_ARG_COUNT);
    assert_error("int f(int a) { return a; } var x = f(1, 2);", ErrorCode::WRONG_ARG_COUNT);
    assert_error(
        "int f(int a) { return a; } var x = f(1.5);",
        ErrorCode::INVALID_ARGUMENT_TYPE,
    );
}

#[test]
fn every_bad_argument_is_reported_with_its_index() {
    let errors = check(r#"void f(int a, string b, bool c) { } f(1.0, 2, true);"#);
    let arguments: Vec<_> = errors
        .errors
        .iter()
        .filter(|e| e.code == ErrorCode::INVALID_ARGUMENT_TYPE)
        .map(|e| (e.argument, e.expected, e.found))
        .collect();
    assert_eq!(
        arguments,
        vec![
            (Some(0), Some(Type::Int), Some(Type::Float)),
            (Some(1), Some(Type::String), Some(Type::Int)),
        ]
    );
}

#[test]
fn return_checks() {
    assert_error("int f() { return \"s\"; }", ErrorCode::RETURN_TYPE_MISMATCH);
    assert_error("int f() { return; }", ErrorCode::RETURN_TYPE_MISMATCH);
    assert_error("void f() { return 1; }", ErrorCode::RETURN_TYPE_MISMATCH);
    assert_error("void h() { } void f() { return h(); }", ErrorCode::RETURN_TYPE_MISMATCH);
    assert_error("void h() { } int f() { return h(); }", ErrorCode::RETURN_TYPE_MISMATCH);
    assert_error("int f() { return 1.5; }", ErrorCode::RETURN_TYPE_MISMATCH);
    assert_error("return;", ErrorCode::RETURN_OUTSIDE_FUNCTION);
}

#[test]
fn missing_return() {
    assert_error("int f() { }", ErrorCode::MISSING_RETURN);
    assert_error("int f(int n) { if n > 0 { return 1; } }", ErrorCode::MISSING_RETURN);
    assert_error("int f() { while true { return 1; } }", ErrorCode::MISSING_RETURN);
    assert_error("int f() { do { return 1; } while true; }", ErrorCode::MISSING_RETURN);
    assert_ok("int f() { { return 1; } }");
    assert_ok("void f() { }");
}

// ══════════════════════════════════════════════════════════════════════════════
// Scope errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn undeclared_names() {
    assert_error("var x = y;", ErrorCode::UNDECLARED_VARIABLE);
    assert_error("y = 1;", ErrorCode::UNDECLARED_VARIABLE);
    assert_error("nope();", ErrorCode::UNDECLARED_FUNCTION);
    assert_error("{ var inner = 1; } inner = 2;", ErrorCode::UNDECLARED_VARIABLE);
}

#[test]
fn variables_must_be_declared_before_use() {
    assert_error("var x = x + 1;", ErrorCode::UNDECLARED_VARIABLE);
    assert_error("int f() { return g; } var g = 1;", ErrorCode::UNDECLARED_VARIABLE);
}

#[test]
fn calls_from_the_top_level_follow_global_declaration_order() {
    assert_error(
        "f(); var g = 1; void f() { g += 1; }",
        ErrorCode::GLOBAL_USED_BEFORE_DECLARATION,
    );
    // Reached through another function.
    assert_error(
        "outer(); var g = 1; void outer() { inner(); } void inner() { var x = g; }",
        ErrorCode::GLOBAL_USED_BEFORE_DECLARATION,
    );
    // The declaration's own initializer runs before the global exists.
    assert_error(
        "var g = f(); int f() { return g + 1; }",
        ErrorCode::GLOBAL_USED_BEFORE_DECLARATION,
    );
    assert_error(
        "if true { f(); } var g = 1; void f() { g = 2; }",
        ErrorCode::GLOBAL_USED_BEFORE_DECLARATION,
    );

    assert_ok("var g = 1; f(); void f() { g += 1; }");
    assert_ok("var g = 1; void f() { g += 1; } f();");
    assert_ok("void f() { var g = 1; g += 1; } f(); var g = 2;");
    assert_ok("int even(int n) { return n == 0 ? 1 : odd(n - 1); } int odd(int n) { return n == 0 ? 0 : even(n - 1); } var e = even(4);");
}

#[test]
fn global_order_error_names_the_call_and_the_global() {
    let errors = check("var a = 1;\nf();\nvar g = 1;\nvoid f() { g += a; }");
    assert_eq!(errors.codes(), vec![ErrorCode::GLOBAL_USED_BEFORE_DECLARATION]);
    let err = &errors.errors[0];
    assert_eq!(err.span.start_line, 2);
    assert!(err.message.contains("'f'") && err.message.contains("'g'"), "{}", err.message);
    assert_eq!(err.suggestion.as_deref(), Some("declare 'g' above this call"));
}

#[test]
fn undeclared_names_suggest_the_other_kind() {
    let errors = check("void f() { } var x = f;");
    assert_eq!(errors.codes(), vec![ErrorCode::UNDECLARED_VARIABLE]);
    assert_eq!(
        errors.errors[0].suggestion.as_deref(),
        Some("'f' is a function; call it as 'f(...)'")
    );

    let errors = check("var x = 1; x();");
    assert_eq!(errors.codes(), vec![ErrorCode::UNDECLARED_FUNCTION]);
    assert_eq!(
        errors.errors[0].suggestion.as_deref(),
        Some("'x' is a variable, not a function")
    );

    assert!(check("var x = y;").errors[0].suggestion.is_none());
}

#[test]
fn redeclarations() {
    assert_error("var x = 1; var x = 2;", ErrorCode::VARIABLE_REDECLARATION);
    assert_error("void f(int a, int a) { }", ErrorCode::VARIABLE_REDECLARATION);
    assert_error("void f() { } void f() { }", ErrorCode::FUNCTION_REDECLARATION);
    assert_error("int f() { return 1; } void f(int a) { }", ErrorCode::FUNCTION_REDECLARATION);
}

#[test]
fn read_only_assignment() {
    assert_error("const c = 1; c = 2;", ErrorCode::READ_ONLY_ASSIGNMENT);
    assert_error("const c = 1; c += 2;", ErrorCode::READ_ONLY_ASSIGNMENT);
    assert_error("for i = 1 to 3 { i = 5; }", ErrorCode::READ_ONLY_ASSIGNMENT);
}

#[test]
fn loop_counter_is_not_visible_after_the_loop() {
    assert_error("for i = 1 to 3 { } var j = i;", ErrorCode::UNDECLARED_VARIABLE);
}

#[test]
fn loop_counter_cannot_appear_in_its_own_bounds() {
    assert_error("for i = 1 to i { }", ErrorCode::UNDECLARED_VARIABLE);
}

// ══════════════════════════════════════════════════════════════════════════════
// Control errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn break_and_continue_outside_loops() {
    assert_error("break;", ErrorCode::STATEMENT_NOT_IN_LOOP);
    assert_error("if true { continue; }", ErrorCode::STATEMENT_NOT_IN_LOOP);
    assert_error(
        "while true { void f() { } }",
        ErrorCode::MISPLACED_FUNCTION,
    );
}

#[test]
fn loops_do_not_leak_into_function_bodies() {
    assert_error(
        "void f() { break; } while true { f(); }",
        ErrorCode::STATEMENT_NOT_IN_LOOP,
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Error cascading and counts
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn error_type_suppresses_cascades() {
    // Only the undeclared name is reported, not the operators built on it.
    assert_n_errors("var x = -(missing + 1) * 2; x = x + 1;", 1);
    assert_n_errors("var x = nope(1) + 2;", 1);
}

#[test]
fn independent_errors_are_all_reported() {
    assert_n_errors(
        r#"
var a = "s" - 1;
var b = undeclared;
break;
const c = 1;
c = 2;
"#,
        4,
    );
}

#[test]
fn arguments_of_unknown_functions_are_checked() {
    assert_n_errors("nope(-\"s\", missing);", 3);
}

#[test]
fn wrong_arg_count_still_yields_the_return_type() {
    assert_n_errors("int f(int a) { return a; } var x = f() + 1;", 1);
}

#[test]
fn syntax_errors_skip_analysis() {
    let errors = check("var x = ;\nvar y = z;");
    assert!(errors.has_errors());
    assert!(errors.codes().iter().all(|c| *c == ErrorCode::UNEXPECTED_TOKEN));
}

// ══════════════════════════════════════════════════════════════════════════════
// Diagnostics content
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn diagnostics_carry_location_and_source_line() {
    let errors = check("var ok = 1;\nvar bad = ok + \"s\";");
    assert_eq!(errors.total_errors, 1);
    let err = &errors.errors[0];
    assert_eq!(err.code, ErrorCode::INVALID_BINARY_OPERATOR);
    assert_eq!(err.file, "test.pg");
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.span.start_col, 14);
    assert_eq!(err.source_line, "var bad = ok + \"s\";");
}

#[test]
fn diagnostics_serialize_to_json() {
    let errors = check("var x = 1; x = \"s\";");
    let json = errors.to_json().expect("serializable");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let first = &value["errors"][0];
    assert_eq!(first["code"], 207);
    assert_eq!(first["expected"], "int");
    assert_eq!(first["found"], "string");
    assert_eq!(first["line"], 1);
}

#[test]
fn diagnostics_are_deterministic() {
    let source = r#"
var a = "s" * 2;
int f(bool b) { }
f(1, 2);
g();
"#;
    let first = check(source);
    for i in 0..50 {
        assert_eq!(check(source), first, "Determinism failure at iteration {i}");
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Natives and the semantic model
// ══════════════════════════════════════════════════════════════════════════════

fn natives() -> Natives {
    let mut natives = Natives::new();
    natives.register("print", &[Type::String], Type::Void, |_| Ok(None));
    natives.register("sqrt", &[Type::Float], Type::Float, |args| {
        Ok(args[0].as_float().map(|x| Value::Float(x.sqrt())))
    });
    natives
}

#[test]
fn natives_are_callable_and_checked() {
    let ok = SourceFile::new("test.pg", "print(\"x\"); var r = sqrt(16);");
    assert!(compile_source(&ok, &natives()).is_ok());

    let bad = SourceFile::new("test.pg", "print(1); var r = sqrt();");
    let codes = compile_source(&bad, &natives()).diagnostics.codes();
    assert_eq!(
        codes,
        vec![ErrorCode::INVALID_ARGUMENT_TYPE, ErrorCode::WRONG_ARG_COUNT]
    );
}

#[test]
fn script_cannot_redeclare_a_native() {
    let source = SourceFile::new("test.pg", "void print(string s) { }");
    let codes = compile_source(&source, &natives()).diagnostics.codes();
    assert_eq!(codes, vec![ErrorCode::FUNCTION_REDECLARATION]);
}

#[test]
fn model_records_expression_types_and_scopes() {
    let source = SourceFile::new("test.pg", "var a = 1; { var b = a + 2.0; }");
    let compilation = compile_source(&source, &Natives::new());
    let program = compilation.into_runnable().expect("valid program");
    let model = program.model();

    let Item::Stmt(Stmt::Block(block)) = &program.ast().items[1] else {
        panic!("expected block");
    };
    let block_scope = model.scope_of(block.id).expect("block scope");
    assert_ne!(block_scope, ScopeId::GLOBAL);
    assert_eq!(program.scopes().parent(block_scope), Some(ScopeId::GLOBAL));

    let Stmt::VarDecl(decl) = &block.stmts[0] else {
        panic!("expected declaration");
    };
    assert_eq!(model.type_of(decl.value.id), Some(Type::Float));
    let ExprKind::Binary { left, .. } = &decl.value.kind else {
        panic!("expected binary");
    };
    assert_eq!(model.type_of(left.id), Some(Type::Int));
    assert_eq!(model.scope_of(left.id), Some(block_scope));
    assert_eq!(
        program
            .scopes()
            .lookup_variable(block_scope, "b")
            .map(|v| v.ty),
        Some(Type::Float)
    );
}

#[test]
fn parameters_and_counters_enclose_their_body_scopes() {
    let source = SourceFile::new(
        "test.pg",
        "void f(int a) { var b = a; } for i = 1 to 2 { var c = i; }",
    );
    let program = compile_source(&source, &Natives::new())
        .into_runnable()
        .expect("valid program");
    let (model, scopes) = (program.model(), program.scopes());

    let Item::Function(decl) = &program.ast().items[0] else {
        panic!("expected function");
    };
    let body = model.scope_of(decl.body.id).expect("body scope");
    let params = scopes.parent(body).expect("parameter scope");
    assert_eq!(scopes.parent(params), Some(ScopeId::GLOBAL));
    assert!(scopes.lookup_variable(params, "a").is_some());
    assert!(scopes.lookup_variable(params, "b").is_none());
    assert_eq!(scopes.resolve_variable(body, "a").map(|(s, _)| s), Some(params));

    let Item::Stmt(Stmt::For(stmt)) = &program.ast().items[1] else {
        panic!("expected for");
    };
    let body = model.scope_of(stmt.body.id).expect("body scope");
    let counter = scopes.parent(body).expect("counter scope");
    assert_eq!(scopes.parent(counter), Some(ScopeId::GLOBAL));
    assert!(scopes
        .lookup_variable(counter, "i")
        .is_some_and(|v| v.read_only));
}

#[test]
fn failed_compilation_is_not_runnable() {
    let source = SourceFile::new("test.pg", "var a = b;");
    let compilation = compile_source(&source, &Natives::new());
    assert!(!compilation.is_ok());
    assert!(compilation.program().is_some());
    assert!(compilation.into_runnable().is_err());
}

// ══════════════════════════════════════════════════════════════════════════════
// Language properties
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn redeclaration_in_one_block_is_reported_once() {
    assert_n_errors("{ var x = 1; var x = 2; }", 1);
    assert_n_errors("{ var x = 1; { var x = 2; } }", 0);
}

#[test]
fn function_locals_are_visible_inside_nested_loops() {
    assert_ok(
        r#"
int total(int n) {
    var acc = 0;
    for i = 1 to n {
        while acc < 0 {
            acc += i;
        }
        acc += i;
    }
    return acc;
}
"#,
    );
    assert_error(
        "void f() { while true { var inside = 1; break; } inside = 2; }",
        ErrorCode::UNDECLARED_VARIABLE,
    );
}

#[test]
fn add_is_checked_at_compile_time() {
    let add = "int add(int a, int b) { return a + b; }\n";
    assert_ok(&format!("{add}var r = add(2, 3);"));
    assert_error(&format!("{add}var r = add(2);"), ErrorCode::WRONG_ARG_COUNT);
    assert_error(
        &format!("{add}var r = add(2, \"3\");"),
        ErrorCode::INVALID_ARGUMENT_TYPE,
    );
}

#[test]
fn string_plus_assign_requires_a_string() {
    assert_error(r#"var s = "a"; s += 1;"#, ErrorCode::INVALID_ASSIGNMENT);
    assert_ok(r#"var s = "a"; s += "b";"#);
}

#[test]
fn return_mismatch_is_reported_at_the_return_statement() {
    let errors = check("bool f() {\n    return 1;\n}");
    assert_eq!(errors.total_errors, 1);
    let err = &errors.errors[0];
    assert_eq!(err.code, ErrorCode::RETURN_TYPE_MISMATCH);
    assert_eq!((err.span.start_line, err.span.start_col), (2, 5));
    assert_eq!((err.expected, err.found), (Some(Type::Bool), Some(Type::Int)));
}

#[test]
fn modulo_rejects_float_operands() {
    assert_error("var x = 7.0 % 2;", ErrorCode::INVALID_BINARY_OPERATOR);
    assert_error("var x = 7 % 2.0;", ErrorCode::INVALID_BINARY_OPERATOR);
}
