//! `eval`, `exec`, `locals` and `globals`: the dynamic-compilation surface.
//!
//! The session parser resolves canned sources, so each test registers the
//! trees its embedded code should parse to.

use super::harness::*;

/// Run a module body in a session whose parser knows the given sources.
fn run_dyn(
    modules: Vec<(&str, Vec<Stmt>)>,
    exprs: Vec<(&str, Expr)>,
    body: Vec<Stmt>,
) -> Value {
    let (sess, _) = session_with(modules, exprs);
    let module = sess.compile_module("main", &body).expect("module compiles");
    module.evaluate().expect("module evaluates")
}

fn exec(source: &str) -> Stmt {
    Stmt::Exec {
        source: string(source),
        globals: None,
        locals: None,
    }
}

#[test]
fn locals_in_a_function_reflects_the_frame() {
    let body = vec![
        def("f", &["a"], vec![ret(call(name("locals"), vec![]))]),
        assign("r", call(name("f"), vec![int(1)])),
        assign("n", call(name("len"), vec![name("r")])),
        assign("v", sub(name("r"), string("a"))),
    ];
    let (module, _) = run(body);
    assert_eq!(as_int(&module_attr(&module, "n")), 1);
    assert_eq!(as_int(&module_attr(&module, "v")), 1);
}

#[test]
fn globals_at_module_level_sees_earlier_bindings() {
    let body = vec![
        assign("x", int(3)),
        assign("g", call(name("globals"), vec![])),
        assign("r", sub(name("g"), string("x"))),
    ];
    assert_eq!(attr_int(body, "r"), 3);
}

#[test]
fn locals_at_module_level_is_the_module_view() {
    let body = vec![
        assign("x", int(4)),
        assign("l", call(name("locals"), vec![])),
        assign("r", sub(name("l"), string("x"))),
    ];
    assert_eq!(attr_int(body, "r"), 4);
}

#[test]
fn one_argument_eval_runs_in_the_current_scope() {
    let body = vec![
        assign("x", int(10)),
        assign("r", call(name("eval"), vec![string("x + 1")])),
    ];
    let module = run_dyn(
        vec![],
        vec![("x + 1", bin(BinOp::Add, name("x"), int(1)))],
        body,
    );
    assert_eq!(as_int(&module_attr(&module, "r")), 11);
}

#[test]
fn eval_sees_function_locals() {
    let body = vec![
        def(
            "f",
            &["y"],
            vec![ret(call(name("eval"), vec![string("y * 2")]))],
        ),
        assign("r", call(name("f"), vec![int(6)])),
    ];
    let module = run_dyn(
        vec![],
        vec![("y * 2", bin(BinOp::Mul, name("y"), int(2)))],
        body,
    );
    assert_eq!(as_int(&module_attr(&module, "r")), 12);
}

#[test]
fn eval_is_intercepted_by_identity_not_by_name() {
    // e = eval
    // r = e("x + 1")
    let body = vec![
        assign("x", int(10)),
        assign("e", name("eval")),
        assign("r", call(name("e"), vec![string("x + 1")])),
    ];
    let module = run_dyn(
        vec![],
        vec![("x + 1", bin(BinOp::Add, name("x"), int(1)))],
        body,
    );
    assert_eq!(as_int(&module_attr(&module, "r")), 11);
}

#[test]
fn a_user_definition_shadows_eval() {
    let body = vec![
        def("eval", &["s"], vec![ret(int(99))]),
        assign("r", call(name("eval"), vec![string("anything")])),
    ];
    assert_eq!(attr_int(body, "r"), 99);
}

#[test]
fn eval_with_an_explicit_globals_dict() {
    let body = vec![assign(
        "r",
        call(
            name("eval"),
            vec![string("z"), Expr::Dict(vec![(string("z"), int(42))])],
        ),
    )];
    let module = run_dyn(vec![], vec![("z", name("z"))], body);
    assert_eq!(as_int(&module_attr(&module, "r")), 42);
}

#[test]
fn eval_arity_is_checked_at_the_call_site() {
    let body = vec![expr_stmt(call(name("eval"), vec![]))];
    assert_eq!(
        uncaught(body),
        "TypeError: eval() takes 1..3 arguments (0 given)"
    );
}

#[test]
fn locals_takes_no_arguments() {
    let body = vec![expr_stmt(call(name("locals"), vec![int(1)]))];
    assert_eq!(uncaught(body), "TypeError: locals() takes no arguments");
}

#[test]
fn exec_rebinds_names_in_the_surrounding_scope() {
    let body = vec![assign("x", int(1)), exec("x = 2")];
    let module = run_dyn(vec![("x = 2", vec![assign("x", int(2))])], vec![], body);
    assert_eq!(as_int(&module_attr(&module, "x")), 2);
}

#[test]
fn exec_with_an_explicit_dict_writes_into_it() {
    let body = vec![
        assign("d", Expr::Dict(vec![])),
        Stmt::Exec {
            source: string("y = 5"),
            globals: Some(name("d")),
            locals: None,
        },
        assign("r", sub(name("d"), string("y"))),
    ];
    let module = run_dyn(vec![("y = 5", vec![assign("y", int(5))])], vec![], body);
    assert_eq!(as_int(&module_attr(&module, "r")), 5);
}

#[test]
fn exec_locals_shadow_the_supplied_globals() {
    // x = 1
    // g = {'x': 7}
    // l = {'x': 100}
    // exec "y = x + 1" in g, l
    let body = vec![
        assign("x", int(1)),
        assign("g", Expr::Dict(vec![(string("x"), int(7))])),
        assign("l", Expr::Dict(vec![(string("x"), int(100))])),
        Stmt::Exec {
            source: string("y = x + 1"),
            globals: Some(name("g")),
            locals: Some(name("l")),
        },
        assign("r", sub(name("l"), string("y"))),
        assign("gx", sub(name("g"), string("x"))),
    ];
    let module = run_dyn(
        vec![("y = x + 1", vec![assign("y", bin(BinOp::Add, name("x"), int(1)))])],
        vec![],
        body,
    );
    // The locals' x won over the globals' x, and the result landed in the
    // locals mapping.
    assert_eq!(as_int(&module_attr(&module, "r")), 101);
    assert_eq!(as_int(&module_attr(&module, "gx")), 7);
    // The surrounding module's own x was never involved.
    assert_eq!(as_int(&module_attr(&module, "x")), 1);
}

#[test]
fn unit_bindings_reach_nested_functions_only_after_exec_returns() {
    // Within one exec'd source, names the unit binds live in its lexical
    // frame; a function defined by the same source looks them up
    // dynamically and misses until the unit finishes and copies back.
    let src = "q = 7\ndef f(): return q\nr = f()";
    let body = vec![
        assign("hit", int(0)),
        try_except(
            vec![exec(src)],
            vec![handler(
                Some(name("NameError")),
                None,
                vec![assign("hit", int(1))],
            )],
            vec![],
        ),
    ];
    let module = run_dyn(
        vec![(
            src,
            vec![
                assign("q", int(7)),
                def("f", &[], vec![ret(name("q"))]),
                assign("r", call(name("f"), vec![])),
            ],
        )],
        vec![],
        body,
    );
    assert_eq!(as_int(&module_attr(&module, "hit")), 1);
}

#[test]
fn exec_introduced_names_are_visible_dynamically() {
    // exec "q = 7"
    // def f(): return q
    let body = vec![
        exec("q = 7"),
        def("f", &[], vec![ret(name("q"))]),
        assign("r", call(name("f"), vec![])),
    ];
    let module = run_dyn(vec![("q = 7", vec![assign("q", int(7))])], vec![], body);
    assert_eq!(as_int(&module_attr(&module, "r")), 7);
}

#[test]
fn an_exec_parse_failure_raises_a_catchable_syntax_error() {
    // The parser has no entry for the source, so compilation of the
    // embedded code fails at run time.
    let body = vec![
        assign("hit", int(0)),
        try_except(
            vec![exec("oops(")],
            vec![handler(
                Some(name("SyntaxError")),
                None,
                vec![assign("hit", int(1))],
            )],
            vec![],
        ),
    ];
    let module = run_dyn(vec![], vec![], body);
    assert_eq!(as_int(&module_attr(&module, "hit")), 1);
}

#[test]
fn exec_rejects_a_non_string_source() {
    let body = vec![Stmt::Exec {
        source: int(3),
        globals: None,
        locals: None,
    }];
    assert_eq!(
        uncaught(body),
        "TypeError: exec source must be a string, not int"
    );
}
