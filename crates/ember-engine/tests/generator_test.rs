// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Generator integration tests.
//!
//! Programs are built with the AST builders (or loaded from JSON) and the
//! emitted records are checked through the public decoder.

use ember_engine::ast::{
    BinaryOp, CatchClause, Expr, ForInit, Program, Stmt, SwitchCase, UpdateOp, VariableDeclaration,
    VariableKind, resolve,
};
use ember_engine::compiler::bytecode::{FieldKind, field};
use ember_engine::compiler::{Bytecode, Code, Instruction, OpCode};
use ember_engine::{GeneratorOptions, generate};
use pretty_assertions::assert_eq;

fn compile(body: Vec<Stmt>) -> Bytecode {
    let mut program = Program::new(body);
    let mut scopes = resolve(&mut program).unwrap();
    generate(&program, &mut scopes, &GeneratorOptions::default()).unwrap()
}

fn records(code: &Code) -> Vec<Instruction> {
    code.instructions().collect::<Result<Vec<_>, _>>().unwrap()
}

fn all(code: &Code, op: OpCode) -> Vec<Instruction> {
    records(code).into_iter().filter(|r| r.opcode == op).collect()
}

fn at(code: &Code, offset: usize) -> Instruction {
    records(code)
        .into_iter()
        .find(|r| r.offset == offset)
        .unwrap_or_else(|| panic!("no record at {offset}"))
}

fn assert_jumps_closed(bytecode: &Bytecode) {
    for code in bytecode.units() {
        let records = records(code);
        let mut starts: Vec<usize> = records.iter().map(|r| r.offset).collect();
        starts.push(code.bytes.len());

        for record in &records {
            for (i, f) in record.opcode.fields().iter().enumerate() {
                if f.kind != FieldKind::Offset {
                    continue;
                }
                if record.opcode == OpCode::Finally && record.operands[i] as usize == field(i) {
                    continue;
                }

                let target = record.jump_target(f.name).unwrap();
                assert!(starts.contains(&target), "{:?} jumps to {target}", record);
            }
        }
    }
}

fn increment(name: &str) -> Stmt {
    Stmt::expression(Expr::update(UpdateOp::Increment, false, Expr::name(name)))
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_for_condition_lowered_once() {
    let bytecode = compile(vec![
        Stmt::var("sum", Some(Expr::number(0.0))),
        Stmt::for_(
            Some(ForInit::Var(vec![VariableDeclaration::new(
                VariableKind::Let,
                "i",
                Some(Expr::number(0.0)),
            )])),
            Some(Expr::binary(BinaryOp::Lt, Expr::name("i"), Expr::number(3.0))),
            Some(Expr::update(UpdateOp::Increment, false, Expr::name("i"))),
            Stmt::block(vec![Stmt::expression(Expr::assign(
                Expr::name("sum"),
                Expr::add(Expr::name("sum"), Expr::name("i")),
            ))]),
        ),
    ]);

    let code = &bytecode.main;
    let less = all(code, OpCode::Less);
    assert_eq!(less.len(), 1);

    let entry = &all(code, OpCode::Jump)[0];
    assert_eq!(entry.jump_target("offset"), Some(less[0].offset));

    let back = &all(code, OpCode::IfTrueJump)[0];
    assert_eq!(back.offset, less[0].offset + less[0].size());
    assert_eq!(back.jump_target("offset"), Some(entry.offset + entry.size()));
    assert_eq!(back.get("cond"), less[0].get("dst"));

    // The body writes the sum in place.
    let add = &all(code, OpCode::Addition)[0];
    assert_eq!(add.get("dst"), add.get("src1"));

    assert_jumps_closed(&bytecode);
}

#[test]
fn test_nested_loops_with_labels() {
    let bytecode = compile(vec![
        Stmt::var("i", Some(Expr::number(0.0))),
        Stmt::labeled(
            "outer",
            Stmt::while_(
                Expr::binary(BinaryOp::Lt, Expr::name("i"), Expr::number(10.0)),
                Stmt::block(vec![
                    increment("i"),
                    Stmt::do_while(
                        Stmt::if_(
                            Expr::binary(BinaryOp::Gt, Expr::name("i"), Expr::number(5.0)),
                            Stmt::break_(Some("outer")),
                            Some(Stmt::continue_(Some("outer"))),
                        ),
                        Expr::boolean(false),
                    ),
                ]),
            ),
        ),
    ]);

    assert_jumps_closed(&bytecode);

    let code = &bytecode.main;
    let stop = &all(code, OpCode::Stop)[0];
    let outer_cond = &all(code, OpCode::Less)[0];
    let outer_head = &all(code, OpCode::PostIncrement)[0];
    let inner_head = &all(code, OpCode::Greater)[0];
    let back_edges = all(code, OpCode::IfTrueJump);

    // entry, break outer, skip else, continue outer
    let jumps = all(code, OpCode::Jump);
    assert_eq!(jumps.len(), 4);
    assert_eq!(jumps[0].jump_target("offset"), Some(outer_cond.offset));
    assert_eq!(jumps[1].jump_target("offset"), Some(stop.offset));
    assert_eq!(jumps[2].jump_target("offset"), Some(back_edges[0].offset));
    assert_eq!(jumps[3].jump_target("offset"), Some(outer_cond.offset));

    let skip = &all(code, OpCode::IfFalseJump)[0];
    assert_eq!(skip.jump_target("offset"), Some(jumps[2].offset + jumps[2].size()));

    assert_eq!(back_edges.len(), 2);
    assert_eq!(back_edges[0].jump_target("offset"), Some(inner_head.offset));
    assert_eq!(back_edges[1].jump_target("offset"), Some(outer_head.offset));
    assert_eq!(back_edges[1].offset + back_edges[1].size(), stop.offset);

    assert_eq!(outer_head.offset, jumps[0].offset + jumps[0].size());
    assert_eq!(outer_cond.offset, back_edges[0].offset + back_edges[0].size());
}

// ============================================================================
// Switch
// ============================================================================

#[test]
fn test_switch_dispatches_to_each_case() {
    let case = |n: f64| {
        SwitchCase::new(
            Some(Expr::number(n)),
            vec![
                Stmt::expression(Expr::assign(Expr::name("y"), Expr::number(n))),
                Stmt::break_(None),
            ],
        )
    };

    let bytecode = compile(vec![
        Stmt::var("x", None),
        Stmt::var("y", None),
        Stmt::switch(
            Expr::name("x"),
            vec![
                case(1.0),
                case(2.0),
                case(3.0),
                SwitchCase::new(
                    None,
                    vec![Stmt::expression(Expr::assign(Expr::name("y"), Expr::number(0.0)))],
                ),
            ],
        ),
    ]);

    let code = &bytecode.main;
    let tests = all(code, OpCode::IfEqualJump);
    assert_eq!(tests.len(), 3);

    // Each test lands on the store of its own case value.
    for test in &tests {
        let body = at(code, test.jump_target("offset").unwrap());
        assert_eq!(body.opcode, OpCode::Move);
        assert_eq!(body.get("src"), test.get("value2"));
    }

    // Each case body leaves the switch.
    let stop = &all(code, OpCode::Stop)[0];
    let breaks: Vec<_> = all(code, OpCode::Jump)
        .into_iter()
        .filter(|j| j.jump_target("offset") == Some(stop.offset))
        .collect();
    assert_eq!(breaks.len(), 3);

    // No case matched: straight to the default body.
    let records = records(code);
    let default_body = &records[records.len() - 2];
    let dispatch = &all(code, OpCode::Jump)[0];
    assert_eq!(dispatch.offset, tests[2].offset + tests[2].size());
    assert_eq!(dispatch.jump_target("offset"), Some(default_body.offset));
    assert_eq!(default_body.opcode, OpCode::Move);

    assert_jumps_closed(&bytecode);
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_break_runs_finally_before_leaving_loop() {
    let bytecode = compile(vec![
        Stmt::var("n", Some(Expr::number(0.0))),
        Stmt::while_(
            Expr::boolean(true),
            Stmt::block(vec![Stmt::try_(
                vec![Stmt::break_(None)],
                None,
                Some(vec![increment("n")]),
            )]),
        ),
        Stmt::expression(Expr::name("n")),
    ]);

    let code = &bytecode.main;
    let records = records(code);

    let position = |op: OpCode| records.iter().position(|r| r.opcode == op).unwrap();

    // break -> TRY_BREAK -> TRY_END -> finally body -> FINALLY -> loop exit
    let break_jump = &records[position(OpCode::TryStart) + 1];
    assert_eq!(break_jump.opcode, OpCode::Jump);

    let trampoline = &records[position(OpCode::TryBreak)];
    assert_eq!(break_jump.jump_target("offset"), Some(trampoline.offset));

    let finally = &records[position(OpCode::Finally)];
    assert!(position(OpCode::PostIncrement) < position(OpCode::Finally));

    let exit = finally.jump_target("break_offset").unwrap();
    let cond = &records[position(OpCode::IfTrueJump)];
    assert_eq!(exit, cond.offset + cond.size());

    assert_eq!(finally.get("exit_value"), trampoline.get("exit_value"));

    let try_start = &records[position(OpCode::TryStart)];
    let try_end = &records[position(OpCode::TryEnd)];
    let catch = &records[position(OpCode::Catch)];
    let finally_body = &records[position(OpCode::PostIncrement)];
    assert_eq!(trampoline.jump_target("offset"), Some(try_end.offset));
    assert_eq!(try_end.jump_target("offset"), Some(finally_body.offset));
    assert_eq!(try_start.jump_target("offset"), Some(catch.offset));

    // Loop entry lands on the condition, the back edge on the try.
    let entry = &records[position(OpCode::Jump)];
    assert_eq!(entry.jump_target("offset"), Some(cond.offset));
    assert_eq!(cond.jump_target("offset"), Some(try_start.offset));

    assert_jumps_closed(&bytecode);
}

#[test]
fn test_nested_try_return() {
    let body = vec![Stmt::try_(
        vec![Stmt::try_(
            vec![Stmt::return_(Some(Expr::number(1.0)))],
            None,
            Some(vec![]),
        )],
        Some(CatchClause::new(Some("e"), vec![])),
        Some(vec![]),
    )];
    let bytecode = compile(vec![Stmt::function("f", &[], body)]);

    let code = &bytecode.lambdas[0].code;
    let starts = all(code, OpCode::TryStart);
    let ret = &all(code, OpCode::TryReturn)[0];

    // The value is saved in the exit slot of the outermost region.
    assert_eq!(ret.get("save"), starts[0].get("exit_value"));
    assert_ne!(ret.get("save"), starts[1].get("exit_value"));

    // inner TRY_RETURN -> inner TRY_BREAK -> inner TRY_END, then the inner
    // FINALLY hands the return to the outer region's trampoline.
    let ends = all(code, OpCode::TryEnd);
    let breaks = all(code, OpCode::TryBreak);
    let finallys = all(code, OpCode::Finally);
    assert_eq!(breaks.len(), 2);
    assert_eq!(finallys.len(), 2);

    assert_eq!(ret.jump_target("offset"), Some(breaks[0].offset));
    assert_eq!(breaks[0].jump_target("offset"), Some(ends[0].offset));
    assert_eq!(finallys[0].jump_target("break_offset"), Some(breaks[1].offset));
    assert_eq!(breaks[1].jump_target("offset"), Some(ends[1].offset));

    // Nothing encloses the outer region.
    assert_eq!(finallys[1].get("break_offset"), Some(field(3) as u32));

    assert_jumps_closed(&bytecode);
}

// ============================================================================
// Slots
// ============================================================================

#[test]
fn test_live_temporaries_do_not_share_slots() {
    let bytecode = compile(vec![
        Stmt::var("a", None),
        Stmt::var("b", None),
        Stmt::var("c", None),
        Stmt::var("d", None),
        Stmt::expression(Expr::binary(
            BinaryOp::Mul,
            Expr::add(Expr::name("a"), Expr::name("b")),
            Expr::add(Expr::name("c"), Expr::name("d")),
        )),
    ]);

    let adds = all(&bytecode.main, OpCode::Addition);
    let mul = &all(&bytecode.main, OpCode::Multiplication)[0];

    assert_ne!(adds[0].get("dst"), adds[1].get("dst"));
    assert_eq!(mul.get("src1"), adds[0].get("dst"));
    assert_eq!(mul.get("src2"), adds[1].get("dst"));
}

#[test]
fn test_call_arguments_in_order() {
    let bytecode = compile(vec![
        Stmt::var("f", None),
        Stmt::expression(Expr::call(
            Expr::name("f"),
            vec![
                Expr::add(Expr::name("f"), Expr::number(1.0)),
                Expr::add(Expr::name("f"), Expr::number(2.0)),
            ],
        )),
    ]);

    let args = all(&bytecode.main, OpCode::MoveArg);
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].get("dst"), Some(0));
    assert_eq!(args[1].get("dst"), Some(1));

    let frame = &all(&bytecode.main, OpCode::FunctionFrame)[0];
    assert_eq!(frame.get("nargs"), Some(2));
}

// ============================================================================
// JSON input
// ============================================================================

#[test]
fn test_generate_from_json_ast() {
    let json = r#"{
        "body": [
            {
                "kind": { "var": { "kind": "var", "id": { "name": "x" }, "init": { "kind": { "number": 1.0 } } } },
                "line": 1
            },
            {
                "kind": { "expression": {
                    "kind": { "binary": {
                        "op": "add",
                        "left": { "kind": { "name": { "name": "x" } }, "line": 2 },
                        "right": { "kind": { "string": "a" }, "line": 2 }
                    } },
                    "line": 2
                } },
                "line": 2
            }
        ]
    }"#;

    let mut program: Program = serde_json::from_str(json).unwrap();
    let mut scopes = resolve(&mut program).unwrap();
    let bytecode = generate(&program, &mut scopes, &GeneratorOptions::default()).unwrap();

    let ops: Vec<_> = records(&bytecode.main).iter().map(|r| r.opcode).collect();
    assert_eq!(ops, vec![OpCode::Move, OpCode::Addition, OpCode::Stop]);
    assert_eq!(bytecode.main.line(12), Some(2));
}
