//! Loops, loop else suites, and comprehensions.

use super::harness::*;

#[test]
fn while_counts_and_runs_its_else_on_exhaustion() {
    // i = 0
    // while i < 3: i = i + 1
    // else: done = 1
    let body = vec![
        assign("i", int(0)),
        while_(
            cmp(CmpOp::Lt, name("i"), int(3)),
            vec![assign("i", bin(BinOp::Add, name("i"), int(1)))],
            vec![assign("done", int(1))],
        ),
    ];
    let (module, _) = run(body);
    assert_eq!(as_int(&module_attr(&module, "i")), 3);
    assert_eq!(as_int(&module_attr(&module, "done")), 1);
}

#[test]
fn break_exits_and_skips_the_else_suite() {
    let body = vec![
        assign("hit", int(0)),
        while_(
            int(1),
            vec![Stmt::Break],
            vec![assign("hit", int(1))],
        ),
        assign("r", name("hit")),
    ];
    assert_eq!(attr_int(body, "r"), 0);
}

#[test]
fn continue_resumes_with_the_next_iteration() {
    // total = 0
    // for x in range(5):
    //     if x % 2 == 0: continue
    //     total = total + x
    let body = vec![
        assign("total", int(0)),
        for_(
            "x",
            call(name("range"), vec![int(5)]),
            vec![
                if_(
                    cmp(CmpOp::Eq, bin(BinOp::Mod, name("x"), int(2)), int(0)),
                    vec![Stmt::Continue],
                    vec![],
                ),
                assign("total", bin(BinOp::Add, name("total"), name("x"))),
            ],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "total"), 4);
}

#[test]
fn for_else_runs_only_without_break() {
    let search = |needle: i64| {
        vec![
            assign("found", int(0)),
            for_(
                "x",
                list(vec![int(1), int(2), int(3)]),
                vec![if_(
                    cmp(CmpOp::Eq, name("x"), int(needle)),
                    vec![assign("found", int(1)), Stmt::Break],
                    vec![],
                )],
                vec![assign("found", bin(BinOp::Sub, int(0), int(1)))],
            ),
        ]
    };
    assert_eq!(attr_int(search(2), "found"), 1);
    assert_eq!(attr_int(search(9), "found"), -1);
}

#[test]
fn break_in_a_nested_loop_exits_the_inner_loop_only() {
    // count = 0
    // for i in range(2):
    //     for j in range(5):
    //         if j == 1: break
    //         count = count + 1
    let body = vec![
        assign("count", int(0)),
        for_(
            "i",
            call(name("range"), vec![int(2)]),
            vec![for_(
                "j",
                call(name("range"), vec![int(5)]),
                vec![
                    if_(
                        cmp(CmpOp::Eq, name("j"), int(1)),
                        vec![Stmt::Break],
                        vec![],
                    ),
                    assign("count", bin(BinOp::Add, name("count"), int(1))),
                ],
                vec![],
            )],
            vec![],
        ),
    ];
    assert_eq!(attr_int(body, "count"), 2);
}

#[test]
fn break_outside_a_loop_is_a_static_error() {
    assert!(matches!(
        compile_err(vec![Stmt::Break]),
        CompileError::BreakOutsideLoop
    ));
    assert!(matches!(
        compile_err(vec![Stmt::Continue]),
        CompileError::ContinueOutsideLoop
    ));
}

#[test]
fn break_in_a_loop_else_suite_is_outside_the_loop() {
    let body = vec![while_(int(0), vec![], vec![Stmt::Break])];
    assert!(matches!(
        compile_err(body),
        CompileError::BreakOutsideLoop
    ));
}

#[test]
fn comprehension_filters_and_maps() {
    // ys = [x * x for x in range(5) if x % 2 == 1]
    let body = vec![
        assign(
            "ys",
            Expr::ListComp {
                item: Box::new(bin(BinOp::Mul, name("x"), name("x"))),
                clauses: vec![CompClause {
                    target: Target::Name("x".to_string()),
                    iter: call(name("range"), vec![int(5)]),
                    conds: vec![cmp(
                        CmpOp::Eq,
                        bin(BinOp::Mod, name("x"), int(2)),
                        int(1),
                    )],
                }],
            },
        ),
        assign("n", call(name("len"), vec![name("ys")])),
        assign("last", sub(name("ys"), int(1))),
    ];
    let (module, _) = run(body);
    assert_eq!(as_int(&module_attr(&module, "n")), 2);
    assert_eq!(as_int(&module_attr(&module, "last")), 9);
}

#[test]
fn nested_comprehension_clauses_pair_every_combination() {
    // pairs = [(i, j) for i in range(2) for j in range(3)]
    let body = vec![
        assign(
            "pairs",
            Expr::ListComp {
                item: Box::new(tuple(vec![name("i"), name("j")])),
                clauses: vec![
                    CompClause {
                        target: Target::Name("i".to_string()),
                        iter: call(name("range"), vec![int(2)]),
                        conds: vec![],
                    },
                    CompClause {
                        target: Target::Name("j".to_string()),
                        iter: call(name("range"), vec![int(3)]),
                        conds: vec![],
                    },
                ],
            },
        ),
        assign("n", call(name("len"), vec![name("pairs")])),
    ];
    assert_eq!(attr_int(body, "n"), 6);
}

#[test]
fn iteration_works_over_a_snapshot_of_the_list() {
    // xs = [1, 2]
    // for x in xs: xs += [x]
    // n = len(xs)
    let body = vec![
        assign("xs", list(vec![int(1), int(2)])),
        for_(
            "x",
            name("xs"),
            vec![aug("xs", BinOp::Add, list(vec![name("x")]))],
            vec![],
        ),
        assign("n", call(name("len"), vec![name("xs")])),
    ];
    assert_eq!(attr_int(body, "n"), 4);
}
