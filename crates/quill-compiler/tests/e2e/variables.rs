//! Module storage, name binding and the binding-error variants.

use super::harness::*;

#[test]
fn module_assignment_round_trip() {
    let body = vec![
        assign("x", int(1)),
        assign("y", bin(BinOp::Add, name("x"), int(2))),
    ];
    assert_eq!(attr_int(body, "y"), 3);
}

#[test]
fn shadowing_slot_is_seeded_from_the_builtin() {
    // `len` is usable before the assignment, rebindable, and deleting the
    // user binding re-exposes the builtin.
    let body = vec![
        assign("n1", call(name("len"), vec![string("abc")])),
        assign("len", int(5)),
        assign("n2", name("len")),
        del("len"),
        assign("n3", call(name("len"), vec![string("abcd")])),
    ];
    let (module, _) = run(body);
    assert_eq!(as_int(&module_attr(&module, "n1")), 3);
    assert_eq!(as_int(&module_attr(&module, "n2")), 5);
    assert_eq!(as_int(&module_attr(&module, "n3")), 4);
}

#[test]
fn read_before_module_assignment_is_the_static_variant() {
    let body = vec![assign("y", name("x")), assign("x", int(1))];
    assert_eq!(uncaught(body), "NameError: module variable 'x' is unbound");
}

#[test]
fn unknown_global_from_a_function_is_the_dynamic_variant() {
    let body = vec![
        def("f", &[], vec![ret(name("nope"))]),
        assign("r", call(name("f"), vec![])),
    ];
    assert_eq!(
        uncaught(body),
        "NameError: module variable 'nope' is not defined"
    );
}

#[test]
fn deleted_local_reads_as_unassigned() {
    let body = vec![
        def(
            "f",
            &[],
            vec![assign("x", int(1)), del("x"), ret(name("x"))],
        ),
        assign("r", call(name("f"), vec![])),
    ];
    assert_eq!(
        uncaught(body),
        "NameError: local variable 'x' referenced before assignment"
    );
}

#[test]
fn function_read_then_write_is_a_static_error() {
    let body = vec![def(
        "f",
        &[],
        vec![assign("y", name("x")), assign("x", int(1))],
    )];
    assert!(matches!(
        compile_err(body),
        CompileError::LocalReferencedBeforeAssignment { name } if name == "x"
    ));
}

#[test]
fn deleting_a_never_assigned_module_name_fails() {
    let body = vec![del("x"), assign("x", int(1))];
    assert_eq!(uncaught(body), "NameError: module variable 'x' is unbound");
}

#[test]
fn tuple_targets_unpack_by_position() {
    let body = vec![
        assign_to(
            Target::Tuple(vec![
                Target::Name("a".to_string()),
                Target::Name("b".to_string()),
            ]),
            tuple(vec![int(1), int(2)]),
        ),
        assign("r", bin(BinOp::Add, name("a"), name("b"))),
    ];
    assert_eq!(attr_int(body, "r"), 3);
}

#[test]
fn tuple_unpack_length_mismatch() {
    let body = vec![assign_to(
        Target::Tuple(vec![
            Target::Name("a".to_string()),
            Target::Name("b".to_string()),
        ]),
        tuple(vec![int(1), int(2), int(3)]),
    )];
    assert_eq!(uncaught(body), "ValueError: unpack expected 2 values, got 3");
}

#[test]
fn global_declaration_routes_writes_to_module_storage() {
    let body = vec![
        assign("x", int(1)),
        def(
            "f",
            &[],
            vec![
                Stmt::Global(vec!["x".to_string()]),
                assign("x", int(5)),
            ],
        ),
        expr_stmt(call(name("f"), vec![])),
        assign("r", name("x")),
    ];
    assert_eq!(attr_int(body, "r"), 5);
}

#[test]
fn augmented_add_on_a_list_mutates_in_place() {
    let body = vec![
        assign("xs", list(vec![int(1)])),
        assign("ys", name("xs")),
        aug("xs", BinOp::Add, list(vec![int(2)])),
        assign("n", call(name("len"), vec![name("ys")])),
    ];
    assert_eq!(attr_int(body, "n"), 2);
}

#[test]
fn augmented_assign_rejects_tuple_targets() {
    let body = vec![Stmt::AugAssign {
        target: Target::Tuple(vec![Target::Name("a".to_string())]),
        op: BinOp::Add,
        value: int(1),
    }];
    assert!(matches!(
        compile_err(body),
        CompileError::AugmentedAssignToTuple
    ));
}

#[test]
fn trailing_comma_suppresses_the_newline() {
    let body = vec![
        Stmt::Print {
            items: vec![int(1), int(2)],
            trailing_comma: true,
            dest: None,
        },
        print1(int(3)),
    ];
    assert_eq!(printed(body), "1 2 3\n");
}

#[test]
fn evaluation_starts_from_fresh_storage_each_time() {
    let body = vec![
        assign("xs", list(vec![])),
        aug("xs", BinOp::Add, list(vec![int(1)])),
        assign("n", call(name("len"), vec![name("xs")])),
    ];
    let (sess, _) = session();
    let module = sess.compile_module("main", &body).unwrap();
    for _ in 0..2 {
        let value = module.evaluate().unwrap();
        assert_eq!(as_int(&module_attr(&value, "n")), 1);
    }
}
