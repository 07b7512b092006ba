//! Toolbox traps the CPU core cannot execute itself.
//!
//! The core hands over a snapshot of the registers a trap reads and gets back
//! the registers the trap leaves behind; guest memory is updated in place.

mod decimal;
mod names;
mod sane;

pub use decimal::{num_to_string, string_to_num};
pub use names::trap_name;
pub use sane::{Format, Operation};

use log::trace;

use crate::{
    error::{MpwError, Result},
    memory::GuestMemory,
};

/// `_FP68K` (`_Pack4`): SANE floating point arithmetic.
pub const FP68K: u16 = 0xA9EB;
/// `_DecStr68K` (`_Pack7`): binary/decimal conversion.
pub const DECSTR68K: u16 = 0xA9EE;

/// The registers trap handlers read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrapRegisters {
    pub d0: u32,
    pub a0: u32,
    /// Stack pointer. The trap's operand frame starts here.
    pub a7: u32,
}

impl TrapRegisters {
    pub fn from_core<C: CpuCore + ?Sized>(core: &C) -> Self {
        Self {
            d0: core.d_reg(0),
            a0: core.a_reg(0),
            a7: core.a_reg(7),
        }
    }

    pub fn apply_to<C: CpuCore + ?Sized>(&self, core: &mut C) {
        core.set_d_reg(0, self.d0);
        core.set_a_reg(0, self.a0);
        core.set_a_reg(7, self.a7);
    }

    /// Registers after popping a `bytes`-long operand frame.
    fn pop(self, bytes: u32) -> Self {
        Self {
            a7: self.a7.wrapping_add(bytes),
            ..self
        }
    }
}

/// Register access the host CPU core provides to trap handlers.
pub trait CpuCore {
    fn d_reg(&self, n: usize) -> u32;
    fn a_reg(&self, n: usize) -> u32;
    fn set_d_reg(&mut self, n: usize, value: u32);
    fn set_a_reg(&mut self, n: usize, value: u32);
}

/// Run `trap` against a register snapshot.
pub fn dispatch(memory: &mut GuestMemory, trap: u16, regs: TrapRegisters) -> Result<TrapRegisters> {
    trace!(
        "{trap:04x} {} d0={:08x} a0={:08x} a7={:08x}",
        trap_name(trap).unwrap_or("?"),
        regs.d0,
        regs.a0,
        regs.a7
    );

    match trap {
        FP68K => sane::fp68k(memory, regs),
        DECSTR68K => decimal::decstr68k(memory, regs),
        _ => Err(MpwError::UnsupportedTrap { trap, selector: 0 }),
    }
}

/// Run `trap` on a live core, reading and writing its registers.
pub fn dispatch_trap<C: CpuCore + ?Sized>(
    core: &mut C,
    memory: &mut GuestMemory,
    trap: u16,
) -> Result<()> {
    let regs = dispatch(memory, trap, TrapRegisters::from_core(core))?;
    regs.apply_to(core);
    Ok(())
}

/// Read the `index`-th long of an operand frame whose selector word sits at
/// `sp`. Longs follow the selector in reverse push order.
fn frame_long(memory: &GuestMemory, sp: u32, index: u32) -> u32 {
    memory.read_long(sp.wrapping_add(2 + 4 * index))
}
