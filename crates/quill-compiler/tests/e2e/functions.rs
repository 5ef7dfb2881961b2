//! Functions: argument binding, scoping, lambdas, decorators, generators.

use super::harness::*;

fn grid_def() -> Stmt {
    // def f(a, b, c, d=42, e=100): return (a, b, c, d, e)
    def_full(
        "f",
        params_kw(&["a", "b", "c"], vec![("d", int(42)), ("e", int(100))]),
        vec![ret(tuple(vec![
            name("a"),
            name("b"),
            name("c"),
            name("d"),
            name("e"),
        ]))],
        vec![],
    )
}

fn tuple_ints(v: &Value) -> Vec<i64> {
    match v {
        Value::Tuple(items) => items.iter().map(as_int).collect(),
        other => panic!("expected tuple, got {:?}", other),
    }
}

#[test]
fn keyword_defaults_fill_unmatched_slots() {
    let body = vec![
        grid_def(),
        assign(
            "r",
            call_kw(name("f"), vec![int(1), int(2), int(3)], vec![("e", int(10))]),
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(tuple_ints(&module_attr(&module, "r")), vec![1, 2, 3, 42, 10]);
}

#[test]
fn positionals_spill_into_keyword_slots() {
    let body = vec![
        grid_def(),
        assign(
            "r",
            call(name("f"), vec![int(1), int(2), int(3), int(4), int(5)]),
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(tuple_ints(&module_attr(&module, "r")), vec![1, 2, 3, 4, 5]);
}

#[test]
fn a_keyword_overrides_one_default() {
    let body = vec![
        grid_def(),
        assign(
            "r",
            call_kw(name("f"), vec![int(1), int(2), int(3)], vec![("d", int(23))]),
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(tuple_ints(&module_attr(&module, "r")), vec![1, 2, 3, 23, 100]);
}

#[test]
fn missing_required_argument() {
    let body = vec![grid_def(), expr_stmt(call(name("f"), vec![int(1)]))];
    assert_eq!(
        uncaught(body),
        "TypeError: f() missing required argument 'b'"
    );
}

#[test]
fn duplicate_keyword_across_carriers_is_rejected() {
    // f(1, 2, 3, d=1, **{'d': 2})
    let body = vec![
        grid_def(),
        expr_stmt(Expr::Call {
            callee: Box::new(name("f")),
            args: vec![int(1), int(2), int(3)],
            keywords: vec![("d".to_string(), int(1))],
            star_args: None,
            star_kwargs: Some(Box::new(Expr::Dict(vec![(string("d"), int(2))]))),
        }),
    ];
    assert_eq!(
        uncaught(body),
        "TypeError: f() got duplicate keyword argument 'd'"
    );
}

#[test]
fn keyword_for_a_positionally_filled_slot() {
    let body = vec![
        grid_def(),
        expr_stmt(call_kw(
            name("f"),
            vec![int(1), int(2), int(3)],
            vec![("a", int(9))],
        )),
    ];
    assert_eq!(
        uncaught(body),
        "TypeError: f() got multiple values for argument 'a'"
    );
}

#[test]
fn rest_parameters_collect_the_excess() {
    // def g(a, *rest, **kw): return (a, len(rest), len(kw))
    let body = vec![
        def_full(
            "g",
            Params {
                rest_pos: Some("rest".to_string()),
                rest_kw: Some("kw".to_string()),
                ..params(&["a"])
            },
            vec![ret(tuple(vec![
                name("a"),
                call(name("len"), vec![name("rest")]),
                call(name("len"), vec![name("kw")]),
            ]))],
            vec![],
        ),
        assign(
            "r",
            call_kw(name("g"), vec![int(1), int(2), int(3)], vec![("x", int(4))]),
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(tuple_ints(&module_attr(&module, "r")), vec![1, 2, 1]);
}

#[test]
fn star_args_extend_the_positional_run() {
    let body = vec![
        grid_def(),
        assign("xs", list(vec![int(2), int(3)])),
        assign(
            "r",
            Expr::Call {
                callee: Box::new(name("f")),
                args: vec![int(1)],
                keywords: vec![],
                star_args: Some(Box::new(name("xs"))),
                star_kwargs: None,
            },
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(
        tuple_ints(&module_attr(&module, "r")),
        vec![1, 2, 3, 42, 100]
    );
}

#[test]
fn free_names_resolve_to_module_scope_not_the_enclosing_frame() {
    // z = 99
    // def outer():
    //     z = 5
    //     def inner(): return z
    //     return inner()
    let body = vec![
        assign("z", int(99)),
        def(
            "outer",
            &[],
            vec![
                assign("z", int(5)),
                def("inner", &[], vec![ret(name("z"))]),
                ret(call(name("inner"), vec![])),
            ],
        ),
        assign("r", call(name("outer"), vec![])),
    ];
    assert_eq!(attr_int(body, "r"), 99);
}

#[test]
fn defaults_are_evaluated_at_definition_time() {
    let body = vec![
        assign("d", int(1)),
        def_full(
            "f",
            params_kw(&[], vec![("x", name("d"))]),
            vec![ret(name("x"))],
            vec![],
        ),
        assign("d", int(2)),
        assign("r", call(name("f"), vec![])),
    ];
    assert_eq!(attr_int(body, "r"), 1);
}

#[test]
fn recursion_reaches_the_function_through_module_storage() {
    // def fact(n):
    //     if n < 2: return 1
    //     return n * fact(n - 1)
    let body = vec![
        def(
            "fact",
            &["n"],
            vec![
                if_(cmp(CmpOp::Lt, name("n"), int(2)), vec![ret(int(1))], vec![]),
                ret(bin(
                    BinOp::Mul,
                    name("n"),
                    call(name("fact"), vec![bin(BinOp::Sub, name("n"), int(1))]),
                )),
            ],
        ),
        assign("r", call(name("fact"), vec![int(5)])),
    ];
    assert_eq!(attr_int(body, "r"), 120);
}

#[test]
fn lambda_builds_an_anonymous_function() {
    let body = vec![
        assign(
            "sq",
            Expr::Lambda {
                params: params(&["x"]),
                body: Box::new(bin(BinOp::Mul, name("x"), name("x"))),
            },
        ),
        assign("r", call(name("sq"), vec![int(7)])),
    ];
    assert_eq!(attr_int(body, "r"), 49);
}

#[test]
fn decorators_apply_innermost_first() {
    // @da  (prints "a", runs second)
    // @db  (prints "b", runs first)
    // def base(): return 0
    let echo_def = |n: &str, tag: &str| {
        def(
            n,
            &["f"],
            vec![print1(string(tag)), ret(name("f"))],
        )
    };
    let body = vec![
        echo_def("da", "a"),
        echo_def("db", "b"),
        def_full(
            "base",
            params(&[]),
            vec![ret(int(0))],
            vec![name("da"), name("db")],
        ),
    ];
    assert_eq!(printed(body), "b\na\n");
}

#[test]
fn tuple_shaped_parameters_destructure_on_entry() {
    // def f((a, b)): return a + b
    let body = vec![
        def_full(
            "f",
            Params {
                required: vec![Param::Tuple(vec![
                    Param::Name("a".to_string()),
                    Param::Name("b".to_string()),
                ])],
                ..Params::default()
            },
            vec![ret(bin(BinOp::Add, name("a"), name("b")))],
            vec![],
        ),
        assign("r", call(name("f"), vec![tuple(vec![int(3), int(4)])])),
    ];
    assert_eq!(attr_int(body, "r"), 7);
}

#[test]
fn a_yielding_function_collects_into_a_list() {
    // def g(n):
    //     for i in range(n): yield i * 2
    let body = vec![
        def(
            "g",
            &["n"],
            vec![for_(
                "i",
                call(name("range"), vec![name("n")]),
                vec![Stmt::Yield(bin(BinOp::Mul, name("i"), int(2)))],
                vec![],
            )],
        ),
        assign("r", call(name("g"), vec![int(3)])),
        assign("n", call(name("len"), vec![name("r")])),
        assign("last", sub(name("r"), int(2))),
    ];
    let (module, _) = run(body);
    assert_eq!(as_int(&module_attr(&module, "n")), 3);
    assert_eq!(as_int(&module_attr(&module, "last")), 4);
}

#[test]
fn bare_return_ends_the_collection_early() {
    let body = vec![
        def(
            "g",
            &[],
            vec![
                Stmt::Yield(int(1)),
                Stmt::Return(None),
                Stmt::Yield(int(2)),
            ],
        ),
        assign("n", call(name("len"), vec![call(name("g"), vec![])])),
    ];
    assert_eq!(attr_int(body, "n"), 1);
}

#[test]
fn valued_return_in_a_generator_is_a_static_error() {
    let body = vec![def(
        "g",
        &[],
        vec![Stmt::Yield(int(1)), ret(int(2))],
    )];
    assert!(matches!(
        compile_err(body),
        CompileError::ReturnValueInGenerator
    ));
}

#[test]
fn yield_outside_a_function_is_a_static_error() {
    let body = vec![Stmt::Yield(int(1))];
    assert!(matches!(
        compile_err(body),
        CompileError::YieldOutsideFunction
    ));
}

#[test]
fn return_outside_a_function_is_a_static_error() {
    let body = vec![ret(int(1))];
    assert!(matches!(
        compile_err(body),
        CompileError::ReturnOutsideFunction
    ));
}

#[test]
fn boolean_operators_return_the_deciding_operand() {
    let body = vec![
        assign(
            "a",
            Expr::BoolOp {
                op: BoolOpKind::Or,
                left: Box::new(int(0)),
                right: Box::new(int(7)),
            },
        ),
        assign(
            "b",
            Expr::BoolOp {
                op: BoolOpKind::And,
                left: Box::new(int(3)),
                right: Box::new(int(9)),
            },
        ),
        assign(
            "c",
            Expr::BoolOp {
                op: BoolOpKind::And,
                left: Box::new(int(0)),
                right: Box::new(name("boom")),
            },
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(as_int(&module_attr(&module, "a")), 7);
    assert_eq!(as_int(&module_attr(&module, "b")), 9);
    // Short-circuit: `boom` was never evaluated.
    assert_eq!(as_int(&module_attr(&module, "c")), 0);
}
