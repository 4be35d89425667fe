//! Line-oriented parser implementation

use super::{Instruction, Opcode, Operand, OperandKind, ParseError, ParseResult, Program};

/// Parse assembly source text into a [`Program`].
///
/// Comments start with `#` and run to end of line. A token ending in `:`
/// at the start of a line defines a label at the next instruction index;
/// the rest of the line, if any, is parsed as the labelled instruction.
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut program = Program::default();

    for (idx, line) in source.lines().enumerate() {
        parse_line(&mut program, line, idx + 1)?;
    }

    Ok(program)
}

fn parse_line(program: &mut Program, line: &str, line_number: usize) -> ParseResult<()> {
    let clean = strip_comment(line).trim();
    if clean.is_empty() {
        return Ok(());
    }

    let tokens: Vec<&str> = clean.split_whitespace().collect();
    let first = tokens[0];

    if let Some(label_name) = first.strip_suffix(':') {
        program
            .labels
            .insert(label_name.to_string(), program.instructions.len());

        if tokens.len() > 1 {
            let mut inst = parse_instruction(&tokens[1..], line_number)?;
            inst.label = Some(label_name.to_string());
            program.instructions.push(inst);
        } else {
            let mut inst = Instruction::new(Opcode::Label);
            inst.label = Some(label_name.to_string());
            program.instructions.push(inst);
        }
    } else {
        let inst = parse_instruction(&tokens, line_number)?;
        program.instructions.push(inst);
    }

    Ok(())
}

fn parse_instruction(tokens: &[&str], line_number: usize) -> ParseResult<Instruction> {
    let opcode =
        Opcode::from_mnemonic(tokens[0]).ok_or_else(|| ParseError::UnknownInstruction {
            line: line_number,
            mnemonic: tokens[0].to_string(),
        })?;

    let mut inst = Instruction::new(opcode);
    for token in &tokens[1..] {
        inst.operands.push(parse_operand(token));
    }

    Ok(inst)
}

/// Classify a single operand token. A trailing comma separator is stripped
/// before classification.
fn parse_operand(token: &str) -> Operand {
    let trimmed = token.strip_suffix(',').unwrap_or(token);

    if trimmed.len() >= 2 && trimmed.starts_with('%') {
        return Operand::new(OperandKind::Register, trimmed);
    }

    if trimmed.len() >= 3 && trimmed.starts_with('(') && trimmed.ends_with(')') {
        return Operand::new(OperandKind::Memory, trimmed);
    }

    if !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '+')
    {
        return Operand::new(OperandKind::Immediate, trimmed);
    }

    Operand::new(OperandKind::Label, trimmed)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}
