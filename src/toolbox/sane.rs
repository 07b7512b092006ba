//! `_FP68K` arithmetic.
//!
//! The selector word combines an operand format (bits 11-13) with an
//! operation code (low byte). Binary operations use a 10-byte frame:
//!
//! ```text
//! a7+0  u16 selector
//! a7+2  u32 destination address (always extended)
//! a7+6  u32 source address (in the selector's format)
//! ```

use log::{trace, warn};

use super::{TrapRegisters, frame_long};
use crate::{
    error::{MpwError, Result},
    memory::GuestMemory,
    numeric::{Extended, read_num, write_num},
};

const FORMAT_MASK: u16 = 0x3800;
const OPERATION_MASK: u16 = 0x00ff;

/// `FX2DEC`: extended to decimal record.
const FX2DEC: u16 = 0x000b;

const BINARY_FRAME: u32 = 10;
const FX2DEC_FRAME: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Extended,
    Double,
    Single,
    Integer,
    Long,
}

impl Format {
    pub fn from_selector(selector: u16) -> Option<Self> {
        match selector & FORMAT_MASK {
            0x0000 => Some(Format::Extended),
            0x0800 => Some(Format::Double),
            0x1000 => Some(Format::Single),
            0x2000 => Some(Format::Integer),
            0x2800 => Some(Format::Long),
            // 0x3000 is comp, which nothing here handles.
            _ => None,
        }
    }

    /// Suffix used in SANE mnemonics (FADDX, FADDD, ...).
    pub fn suffix(self) -> char {
        match self {
            Format::Extended => 'X',
            Format::Double => 'D',
            Format::Single => 'S',
            Format::Integer => 'I',
            Format::Long => 'L',
        }
    }

    fn read(self, memory: &GuestMemory, addr: u32) -> Extended {
        match self {
            Format::Extended => read_num::<Extended>(memory, addr),
            Format::Double => Extended::from_f64(read_num::<f64>(memory, addr)),
            Format::Single => Extended::from_f64(read_num::<f32>(memory, addr) as f64),
            Format::Integer => Extended::from_i32(read_num::<i16>(memory, addr) as i32),
            Format::Long => Extended::from_i32(read_num::<i32>(memory, addr)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    /// Convert the source to extended (FOZ2X).
    ToExtended,
}

impl Operation {
    pub fn from_selector(selector: u16) -> Option<Self> {
        match selector & OPERATION_MASK {
            0x00 => Some(Operation::Add),
            0x02 => Some(Operation::Sub),
            0x04 => Some(Operation::Mul),
            0x06 => Some(Operation::Div),
            0x0e => Some(Operation::ToExtended),
            _ => None,
        }
    }

    pub fn mnemonic(self, format: Format) -> String {
        let name = match self {
            Operation::Add => "FADD",
            Operation::Sub => "FSUB",
            Operation::Mul => "FMUL",
            Operation::Div => "FDIV",
            Operation::ToExtended => return format!("F{}2X", format.suffix()),
        };
        format!("{name}{}", format.suffix())
    }

    fn apply(self, dest: Extended, src: Extended) -> Extended {
        match self {
            Operation::Add => dest + src,
            Operation::Sub => dest - src,
            Operation::Mul => dest * src,
            Operation::Div => dest / src,
            Operation::ToExtended => src,
        }
    }
}

pub(super) fn fp68k(memory: &mut GuestMemory, regs: TrapRegisters) -> Result<TrapRegisters> {
    let selector = memory.read_word(regs.a7);

    if selector == FX2DEC {
        return fx2dec(memory, regs);
    }

    let unsupported = || MpwError::UnsupportedTrap {
        trap: super::FP68K,
        selector,
    };
    if selector & !(FORMAT_MASK | OPERATION_MASK) != 0 {
        return Err(unsupported());
    }
    let format = Format::from_selector(selector).ok_or_else(unsupported)?;
    let operation = Operation::from_selector(selector).ok_or_else(unsupported)?;

    let dest = frame_long(memory, regs.a7, 0);
    let src = frame_long(memory, regs.a7, 1);
    trace!(
        "     {}({src:08x}, {dest:08x}, {selector:04x})",
        operation.mnemonic(format)
    );

    let s = format.read(memory, src);
    let d = read_num::<Extended>(memory, dest);
    let result = operation.apply(d, s);
    trace!(
        "     {} {:?} {} = {}",
        d.to_f64(),
        operation,
        s.to_f64(),
        result.to_f64()
    );

    write_num(memory, result, dest);

    Ok(TrapRegisters {
        d0: 0,
        ..regs.pop(BINARY_FRAME)
    })
}

/// Extended to decimal record. Not a real conversion: the record at the
/// destination is cleared to zero.
fn fx2dec(memory: &mut GuestMemory, regs: TrapRegisters) -> Result<TrapRegisters> {
    let d_adr = frame_long(memory, regs.a7, 0);
    let a_adr = frame_long(memory, regs.a7, 1);
    let f_adr = frame_long(memory, regs.a7, 2);
    trace!("     FX2DEC({f_adr:08x}, {a_adr:08x}, {d_adr:08x}, {FX2DEC:04x})");

    let value = read_num::<Extended>(memory, a_adr);
    warn!(
        "FX2DEC is approximated: {} becomes a zero decimal record",
        value.to_f64()
    );

    // sgn, exp, sig length + first digit
    memory.write_word(d_adr, 0);
    memory.write_word(d_adr.wrapping_add(2), 0);
    memory.write_word(d_adr.wrapping_add(4), 0);

    Ok(TrapRegisters {
        d0: 0,
        ..regs.pop(FX2DEC_FRAME)
    })
}
