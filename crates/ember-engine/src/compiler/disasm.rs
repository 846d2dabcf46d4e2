// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Text listing of generated code.
//!
//! Each record prints as one line:
//!
//! ```text
//!     3 | 00012 ADD               G2 G1 S1
//! ```
//!
//! with the source line (or `-` when line tracking is off), the byte offset,
//! the mnemonic and the fields in layout order. Static indexes are followed
//! by the pooled value they name.

use crate::Result;
use crate::compiler::bytecode::{Bytecode, Code, ErrorKind, FieldKind, Instruction};
use crate::compiler::index::{Index, Level};

/// Renders every code unit of `bytecode`, top-level first.
pub fn disassemble(bytecode: &Bytecode) -> Result<String> {
    let mut out = String::new();

    for (n, code) in bytecode.units().enumerate() {
        if n > 0 {
            out.push('\n');
        }

        out.push_str(&format!("{}:\n", code.name));
        disassemble_code(bytecode, code, &mut out)?;
    }

    Ok(out)
}

fn disassemble_code(bytecode: &Bytecode, code: &Code, out: &mut String) -> Result<()> {
    for declaration in &code.declarations {
        out.push_str(&format!(
            "      | DECLARE {} lambda {}\n",
            declaration.index, declaration.lambda
        ));
    }

    for instruction in code.instructions() {
        let instruction = instruction?;

        let line = code
            .line(instruction.offset)
            .map_or_else(|| "-".to_string(), |line| line.to_string());

        out.push_str(&format!(
            "{:>5} | {:05} {:<17}",
            line,
            instruction.offset,
            instruction.opcode.mnemonic()
        ));
        out.push_str(&operands(bytecode, &instruction).join(" "));
        out.push('\n');
    }

    Ok(())
}

fn operands(bytecode: &Bytecode, instruction: &Instruction) -> Vec<String> {
    instruction
        .opcode
        .fields()
        .iter()
        .zip(instruction.operands.iter())
        .map(|(field, &raw)| match field.kind {
            FieldKind::Index => slot(bytecode, Index::from_bits(raw)),
            FieldKind::Offset => format!("{:+}", raw as i32),
            FieldKind::Count => raw.to_string(),
            FieldKind::Lambda => format!("#{raw}"),
            FieldKind::Kind => ErrorKind::from_u32(raw)
                .map_or_else(|| format!("?{raw}"), |kind| kind.name().to_string()),
        })
        .collect()
}

fn slot(bytecode: &Bytecode, index: Index) -> String {
    if index.level() != Level::Static {
        return index.to_string();
    }

    match bytecode.constant(index) {
        Some(value) => format!("{index}({value})"),
        None => index.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Program, Stmt, resolve};
    use crate::compiler::generate;
    use crate::config::GeneratorOptions;

    fn listing(body: Vec<Stmt>, options: &GeneratorOptions) -> String {
        let mut program = Program::new(body);
        let mut scopes = resolve(&mut program).unwrap();
        let bytecode = generate(&program, &mut scopes, options).unwrap();
        disassemble(&bytecode).unwrap()
    }

    #[test]
    fn test_disassemble_main() {
        let text = listing(
            vec![
                Stmt::var("x", Some(Expr::number(1.0))).at(1),
                Stmt::expression(Expr::add(Expr::name("x"), Expr::number(2.0)).at(2)).at(2),
            ],
            &GeneratorOptions::default(),
        );

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "main:");
        assert_eq!(lines[1], "    1 | 00000 MOVE             G1 S1(1)");
        assert!(lines[2].starts_with("    2 | 00012 ADD"));
        assert!(lines[2].ends_with("G1 S2(2)"));
        assert!(lines[3].contains("STOP"));
    }

    #[test]
    fn test_disassemble_without_lines() {
        let text = listing(
            vec![Stmt::expression(Expr::name("y"))],
            &GeneratorOptions::default().with_lines(false),
        );

        let get = text.lines().nth(1).unwrap();
        assert!(get.starts_with("    - | 00000 GLOBAL GET"));
        assert!(get.ends_with("S1(\"y\")"));
        assert!(text.contains("ERROR"));
        assert!(text.contains("ReferenceError"));
    }

    #[test]
    fn test_disassemble_lambdas() {
        let text = listing(
            vec![Stmt::function("f", &["a"], vec![Stmt::return_(Some(Expr::name("a")))])],
            &GeneratorOptions::default(),
        );

        assert!(text.contains("DECLARE G1 lambda 0"));
        assert!(text.contains("\nf:\n"));
        assert!(text.contains("RETURN           L1"));
    }

    #[test]
    fn test_disassemble_jump_offsets() {
        let text = listing(
            vec![Stmt::while_(Expr::boolean(true), Stmt::break_(None))],
            &GeneratorOptions::default(),
        );

        // Entry jump to the condition, then the break past the loop.
        assert!(text.contains("00000 JUMP             +16"));
        assert!(text.contains("00008 JUMP             +20"));
        assert!(text.contains("00016 JUMP IF TRUE     -8"));
    }
}
