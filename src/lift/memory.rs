//! Address expression lowering.
//!
//! A memory operand is the parenthesized form `(...)`. The recognized
//! shapes, tried in order:
//!
//! 1. `base+index*scale`: base and index registers, positive integer scale
//! 2. `base+offset`: integer literal offset
//! 3. `base+offset_reg`: register offset
//! 4. bare register
//! 5. bare integer: absolute address
//!
//! Anything else is a `BadAddressExpression`.

use super::{FunctionBuilder, LiftError, LiftResult};
use crate::ir::{BinaryOp, InstKind, Value};

/// Lower the text of a memory operand (parentheses included) to the
/// address value it denotes.
pub fn lower_address(builder: &mut FunctionBuilder, text: &str) -> LiftResult<Value> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| bad(text))?;

    if let Some((base_part, offset_part)) = inner.split_once('+') {
        if !base_part.starts_with('%') || base_part.len() < 2 {
            return Err(bad(text));
        }
        let base = builder.load_slot(base_part);

        if let Some((index_part, scale_part)) = offset_part.split_once('*') {
            // base + index*scale
            if !index_part.starts_with('%') || index_part.len() < 2 {
                return Err(bad(text));
            }
            let scale: i32 = scale_part.parse().map_err(|_| bad(text))?;
            if scale <= 0 {
                return Err(bad(text));
            }

            let index = builder.load_slot(index_part);
            let scaled = builder.emit(InstKind::Binary {
                op: BinaryOp::Mul,
                lhs: Value::Inst(index),
                rhs: Value::Const(scale),
            });
            let sum = builder.emit(InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Value::Inst(base),
                rhs: Value::Inst(scaled),
            });
            Ok(Value::Inst(sum))
        } else if offset_part
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '+')
            && !offset_part.is_empty()
        {
            // base + literal offset
            let offset: i32 = offset_part.parse().map_err(|_| bad(text))?;
            let sum = builder.emit(InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Value::Inst(base),
                rhs: Value::Const(offset),
            });
            Ok(Value::Inst(sum))
        } else if offset_part.starts_with('%') && offset_part.len() >= 2 {
            // base + register offset
            let offset = builder.load_slot(offset_part);
            let sum = builder.emit(InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Value::Inst(base),
                rhs: Value::Inst(offset),
            });
            Ok(Value::Inst(sum))
        } else {
            Err(bad(text))
        }
    } else if inner.starts_with('%') && inner.len() >= 2 {
        // bare register
        let load = builder.load_slot(inner);
        Ok(Value::Inst(load))
    } else {
        // bare integer: absolute address
        let value: i32 = inner.parse().map_err(|_| bad(text))?;
        Ok(Value::Const(value))
    }
}

fn bad(text: &str) -> LiftError {
    LiftError::BadAddressExpression {
        expr: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::FunctionBuilder;

    fn builder() -> FunctionBuilder {
        FunctionBuilder::new("test", "entry")
    }

    #[test]
    fn test_bare_register() {
        let mut b = builder();
        let value = lower_address(&mut b, "(%eax)").unwrap();
        assert!(matches!(value, Value::Inst(_)));
    }

    #[test]
    fn test_bare_integer_is_absolute() {
        let mut b = builder();
        let value = lower_address(&mut b, "(100)").unwrap();
        assert_eq!(value, Value::Const(100));
    }

    #[test]
    fn test_base_plus_offset() {
        let mut b = builder();
        let value = lower_address(&mut b, "(%ebx+8)").unwrap();
        let Value::Inst(id) = value else {
            panic!("expected instruction result")
        };
        // load base, then add with the literal.
        let func = b.finish();
        assert!(matches!(
            func.inst(id).kind,
            InstKind::Binary {
                op: BinaryOp::Add,
                rhs: Value::Const(8),
                ..
            }
        ));
    }

    #[test]
    fn test_base_plus_index_scale() {
        let mut b = builder();
        let value = lower_address(&mut b, "(%ebx+%ecx*4)").unwrap();
        let Value::Inst(id) = value else {
            panic!("expected instruction result")
        };
        let func = b.finish();
        // Outer add of base and the scaled index.
        let InstKind::Binary {
            op: BinaryOp::Add,
            rhs: Value::Inst(scaled),
            ..
        } = func.inst(id).kind
        else {
            panic!("expected add of scaled index")
        };
        assert!(matches!(
            func.inst(scaled).kind,
            InstKind::Binary {
                op: BinaryOp::Mul,
                rhs: Value::Const(4),
                ..
            }
        ));
    }

    #[test]
    fn test_base_plus_register_offset() {
        let mut b = builder();
        let value = lower_address(&mut b, "(%ebx+%edi)").unwrap();
        assert!(matches!(value, Value::Inst(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let mut b = builder();
        for expr in ["(foo)", "(%ebx+)", "(4+%ebx)", "(%ebx+%ecx*0)", "(%ebx+%ecx*x)", "()"] {
            let err = lower_address(&mut b, expr).unwrap_err();
            assert!(
                err.to_string().contains("BadAddressExpression"),
                "expected BadAddressExpression for {}",
                expr
            );
        }
    }

    #[test]
    fn test_negative_offset() {
        let mut b = builder();
        let value = lower_address(&mut b, "(%ebp+-4)").unwrap();
        let Value::Inst(id) = value else {
            panic!("expected instruction result")
        };
        let func = b.finish();
        assert!(matches!(
            func.inst(id).kind,
            InstKind::Binary {
                op: BinaryOp::Add,
                rhs: Value::Const(-4),
                ..
            }
        ));
    }
}
