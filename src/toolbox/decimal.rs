//! `_DecStr68K` (`_Pack7`), the binary/decimal package.
//!
//! The selector word sits at `a7` and is popped by the trap.

use log::trace;

use super::TrapRegisters;
use crate::{
    error::{MpwError, Result},
    memory::GuestMemory,
};

const NUM_TO_STRING: u16 = 0x00;
const STRING_TO_NUM: u16 = 0x01;

const SELECTOR_FRAME: u32 = 2;

pub(super) fn decstr68k(memory: &mut GuestMemory, regs: TrapRegisters) -> Result<TrapRegisters> {
    let selector = memory.read_word(regs.a7);
    let regs = regs.pop(SELECTOR_FRAME);

    match selector {
        // in: a0 = string, d0 = number; out: d0 = result code
        NUM_TO_STRING => {
            let number = regs.d0 as i32;
            trace!("     NumToString({number:08x}, {:08x})", regs.a0);
            memory.write_pstring(regs.a0, num_to_string(number).as_bytes());
            Ok(TrapRegisters { d0: 0, ..regs })
        }
        // in: a0 = string; out: d0 = number
        STRING_TO_NUM => {
            let text = memory.read_pstring(regs.a0);
            trace!("     StringToNum({})", String::from_utf8_lossy(&text));
            Ok(TrapRegisters {
                d0: string_to_num(&text) as u32,
                ..regs
            })
        }
        _ => Err(MpwError::UnsupportedTrap {
            trap: super::DECSTR68K,
            selector,
        }),
    }
}

pub fn num_to_string(number: i32) -> String {
    number.to_string()
}

/// Decimal text to a 32-bit integer.
///
/// Accepts one leading `+` or `-`. Digits are not validated: each byte
/// contributes its low nibble. Overflow wraps. Empty text is 0.
pub fn string_to_num(text: &[u8]) -> i32 {
    let (negative, digits) = match text.split_first() {
        None => return 0,
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        Some(_) => (false, text),
    };

    let value = digits.iter().fold(0u32, |acc, &byte| {
        acc.wrapping_mul(10).wrapping_add((byte & 0x0f) as u32)
    });

    if negative {
        value.wrapping_neg() as i32
    } else {
        value as i32
    }
}
