//! Raising, handler matching, finally, and assertions.

use super::harness::*;

#[test]
fn a_matching_handler_binds_the_instance() {
    // try: raise ValueError, "boom"
    // except ValueError, e: msg = e.args[0]
    let body = vec![try_except(
        vec![raise(name("ValueError"), Some(string("boom")))],
        vec![handler(
            Some(name("ValueError")),
            Some("e"),
            vec![assign("msg", sub(attr(name("e"), "args"), int(0)))],
        )],
        vec![],
    )];
    let (module, _) = run(body);
    assert_eq!(module_attr(&module, "msg").as_str(), Some("boom"));
}

#[test]
fn handlers_match_through_the_class_hierarchy() {
    let body = vec![
        assign("hit", int(0)),
        try_except(
            vec![raise(name("TypeError"), Some(string("bad")))],
            vec![handler(
                Some(name("Exception")),
                None,
                vec![assign("hit", int(1))],
            )],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "hit"), 1);
}

#[test]
fn a_tuple_clause_matches_any_member() {
    let body = vec![
        assign("hit", int(0)),
        try_except(
            vec![raise(name("ValueError"), Some(string("v")))],
            vec![handler(
                Some(tuple(vec![name("TypeError"), name("ValueError")])),
                None,
                vec![assign("hit", int(1))],
            )],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "hit"), 1);
}

#[test]
fn a_bare_clause_catches_everything() {
    let body = vec![
        assign("hit", int(0)),
        try_except(
            vec![assign("x", bin(BinOp::Div, int(1), int(0)))],
            vec![handler(None, None, vec![assign("hit", int(1))])],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "hit"), 1);
}

#[test]
fn a_non_matching_raise_keeps_unwinding() {
    let body = vec![try_except(
        vec![raise(name("ValueError"), Some(string("x")))],
        vec![handler(Some(name("TypeError")), None, vec![Stmt::Pass])],
        vec![],
    )];
    assert_eq!(uncaught(body), "ValueError: x");
}

#[test]
fn handlers_are_tried_in_order() {
    let body = vec![
        try_except(
            vec![raise(name("ValueError"), Some(string("x")))],
            vec![
                handler(Some(name("TypeError")), None, vec![assign("hit", int(1))]),
                handler(Some(name("ValueError")), None, vec![assign("hit", int(2))]),
                handler(None, None, vec![assign("hit", int(3))]),
            ],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "hit"), 2);
}

#[test]
fn the_else_suite_runs_only_without_an_exception() {
    let attempt = |fails: bool| {
        let inner = if fails {
            vec![raise(name("ValueError"), Some(string("x")))]
        } else {
            vec![Stmt::Pass]
        };
        vec![
            assign("trail", int(0)),
            try_except(
                inner,
                vec![handler(None, None, vec![aug("trail", BinOp::Add, int(1))])],
                vec![aug("trail", BinOp::Add, int(10))],
            ),
        ]
    };
    assert_eq!(attr_int(attempt(false), "trail"), 10);
    assert_eq!(attr_int(attempt(true), "trail"), 1);
}

#[test]
fn a_non_class_clause_target_is_a_type_error() {
    let body = vec![try_except(
        vec![raise(name("ValueError"), Some(string("x")))],
        vec![handler(Some(int(3)), None, vec![Stmt::Pass])],
        vec![],
    )];
    assert_eq!(
        uncaught(body),
        "TypeError: except clause target must be a class or tuple of classes"
    );
}

#[test]
fn finally_runs_on_every_exit_path() {
    // hits collects one entry per finalizer execution: normal fall-through,
    // an exception unwinding past it, and a return unwinding past it.
    let body = vec![
        assign("hits", list(vec![])),
        Stmt::TryFinally {
            body: vec![assign("a", int(1))],
            finalizer: vec![aug("hits", BinOp::Add, list(vec![int(1)]))],
        },
        try_except(
            vec![Stmt::TryFinally {
                body: vec![raise(name("ValueError"), Some(string("x")))],
                finalizer: vec![aug("hits", BinOp::Add, list(vec![int(2)]))],
            }],
            vec![handler(None, None, vec![Stmt::Pass])],
            vec![],
        ),
        def(
            "f",
            &[],
            vec![
                Stmt::Global(vec!["hits".to_string()]),
                Stmt::TryFinally {
                    body: vec![ret(int(9))],
                    finalizer: vec![aug("hits", BinOp::Add, list(vec![int(3)]))],
                },
            ],
        ),
        expr_stmt(call(name("f"), vec![])),
        assign("n", call(name("len"), vec![name("hits")])),
    ];
    assert_eq!(attr_int(body, "n"), 3);
}

#[test]
fn a_return_in_finally_supersedes_the_exception() {
    let body = vec![
        def(
            "f",
            &[],
            vec![Stmt::TryFinally {
                body: vec![raise(name("ValueError"), Some(string("x")))],
                finalizer: vec![ret(int(7))],
            }],
        ),
        assign("r", call(name("f"), vec![])),
    ];
    assert_eq!(attr_int(body, "r"), 7);
}

#[test]
fn clause_types_are_evaluated_when_the_exception_propagates() {
    // E = TypeError
    // try:
    //     E = ValueError
    //     raise ValueError, "late"
    // except E:          # matches against the rebound value
    //     hit = 1
    let body = vec![
        assign("hit", int(0)),
        assign("E", name("TypeError")),
        try_except(
            vec![
                assign("E", name("ValueError")),
                raise(name("ValueError"), Some(string("late"))),
            ],
            vec![handler(Some(name("E")), None, vec![assign("hit", int(1))])],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "hit"), 1);
}

#[test]
fn a_bound_instance_can_be_re_raised() {
    let body = vec![try_except(
        vec![raise(name("ValueError"), Some(string("orig")))],
        vec![handler(
            Some(name("ValueError")),
            Some("e"),
            vec![raise(name("e"), None)],
        )],
        vec![],
    )];
    assert_eq!(uncaught(body), "ValueError: orig");
}

#[test]
fn division_by_zero_is_catchable() {
    let body = vec![
        assign("hit", int(0)),
        try_except(
            vec![assign("x", bin(BinOp::Div, int(1), int(0)))],
            vec![handler(
                Some(name("ZeroDivisionError")),
                None,
                vec![assign("hit", int(1))],
            )],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "hit"), 1);
}

#[test]
fn assert_failure_carries_the_explicit_message() {
    let body = vec![Stmt::Assert {
        test: int(0),
        message: Some(string("boom")),
    }];
    assert_eq!(uncaught(body), "AssertionError: boom");
}

#[test]
fn assert_failure_renders_the_test_expression() {
    let body = vec![Stmt::Assert {
        test: cmp(CmpOp::Lt, int(2), int(1)),
        message: None,
    }];
    assert_eq!(uncaught(body), "AssertionError: 2 < 1");
}

#[test]
fn a_passing_assert_is_a_no_op() {
    let body = vec![
        Stmt::Assert {
            test: int(1),
            message: Some(string("never")),
        },
        assign("r", int(5)),
    ];
    assert_eq!(attr_int(body, "r"), 5);
}

#[test]
fn the_assert_suppression_flag_is_one_shot() {
    let body = vec![
        Stmt::Assert {
            test: int(0),
            message: Some(string("first")),
        },
        Stmt::Assert {
            test: int(0),
            message: Some(string("second")),
        },
    ];
    let (sess, _) = session();
    let module = sess.compile_module("main", &body).unwrap();
    sess.ignore_next_assert_failure();
    let err = module.evaluate().expect_err("second assert still fails");
    match err {
        ExecError::Uncaught(raised) => {
            assert_eq!(raised.to_string(), "AssertionError: second")
        }
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}
