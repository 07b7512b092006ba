//! Process setup for an MPW tool.
//!
//! MPW tools find their arguments through a low-memory pointer at `0x0316`:
//!
//! ```text
//! +0   u32 'MPGM'
//! +4   u32 pointer to +8
//! +8   u16 'SH'
//! +10  u32 argc
//! +14  u32 argv   (NULL-terminated array of C strings)
//! +18  u32 envp   (NULL-terminated array of "key\0value\0" entries)
//! ```
//!
//! The tool name lives in the 32-byte Pascal string CurApName at `0x0910`.

use log::debug;

use crate::{
    error::{MpwError, Result},
    memory::GuestMemory,
};

/// Low-memory slot holding the argument block pointer.
pub const ARGUMENT_BLOCK_PTR: u32 = 0x0316;
/// Low-memory CurApName Pascal string.
pub const CUR_AP_NAME: u32 = 0x0910;
pub const CUR_AP_NAME_LEN: usize = 32;

pub const MPGM_MAGIC: u32 = 0x4d50_474d;
pub const SH_MAGIC: u16 = 0x5348;

const ARGUMENT_BLOCK_LEN: u32 = 22;

/// Addresses written while setting up the tool's process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentBlock {
    pub address: u32,
    pub argc: u32,
    pub argv: u32,
    pub envp: u32,
}

impl ArgumentBlock {
    /// Decode the block that [`ARGUMENT_BLOCK_PTR`] points at.
    pub fn read(memory: &GuestMemory) -> Option<Self> {
        let address = memory.read_long(ARGUMENT_BLOCK_PTR);
        if address == 0
            || memory.read_long(address) != MPGM_MAGIC
            || memory.read_word(address.wrapping_add(8)) != SH_MAGIC
        {
            return None;
        }
        Some(Self {
            address,
            argc: memory.read_long(address.wrapping_add(10)),
            argv: memory.read_long(address.wrapping_add(14)),
            envp: memory.read_long(address.wrapping_add(18)),
        })
    }
}

/// Write CurApName, the argv/envp spines and the argument block.
///
/// `args[0]` is the tool name. An empty `env` leaves the envp field zero.
pub fn initialize_process(
    memory: &mut GuestMemory,
    args: &[String],
    env: &[(String, String)],
) -> Result<ArgumentBlock> {
    let name = args.first().ok_or(MpwError::NoArguments)?;
    write_application_name(memory, name.as_bytes());

    let strings: Vec<Vec<u8>> = args.iter().map(|a| a.as_bytes().to_vec()).collect();
    let argv = write_string_spine(memory, &strings)?;

    let envp = if env.is_empty() {
        0
    } else {
        let entries: Vec<Vec<u8>> = env
            .iter()
            .map(|(key, value)| {
                let mut entry = Vec::with_capacity(key.len() + value.len() + 1);
                entry.extend_from_slice(key.as_bytes());
                entry.push(0);
                entry.extend_from_slice(value.as_bytes());
                entry
            })
            .collect();
        write_string_spine(memory, &entries)?
    };

    let address = memory.allocate(ARGUMENT_BLOCK_LEN)?;
    memory.write_long(ARGUMENT_BLOCK_PTR, address);
    memory.write_long(address, MPGM_MAGIC);
    memory.write_long(address.wrapping_add(4), address.wrapping_add(8));
    memory.write_word(address.wrapping_add(8), SH_MAGIC);
    memory.write_long(address.wrapping_add(10), args.len() as u32);
    memory.write_long(address.wrapping_add(14), argv);
    memory.write_long(address.wrapping_add(18), envp);

    debug!(
        "argument block at {address:#08x}: argc {} argv {argv:#08x} envp {envp:#08x}",
        args.len()
    );

    Ok(ArgumentBlock {
        address,
        argc: args.len() as u32,
        argv,
        envp,
    })
}

/// Store `name` as CurApName: at most 31 bytes, zero padded to 32.
pub fn write_application_name(memory: &mut GuestMemory, name: &[u8]) {
    let mut slot = [0u8; CUR_AP_NAME_LEN];
    let len = name.len().min(CUR_AP_NAME_LEN - 1);
    slot[0] = len as u8;
    slot[1..=len].copy_from_slice(&name[..len]);
    memory.write_data(CUR_AP_NAME, &slot);
}

/// Allocate each string (NUL terminated) and then a NULL-terminated array of
/// pointers to them. Returns the array's address.
fn write_string_spine(memory: &mut GuestMemory, strings: &[Vec<u8>]) -> Result<u32> {
    let mut spine = Vec::with_capacity(strings.len() + 1);
    for s in strings {
        let address = memory.allocate(s.len() as u32 + 1)?;
        memory.write_cstring(address, s);
        spine.push(address);
    }
    spine.push(0);

    let array = memory.allocate(4 * spine.len() as u32)?;
    for (i, pointer) in spine.iter().enumerate() {
        memory.write_long(array + 4 * i as u32, *pointer);
    }
    Ok(array)
}

/// Allocate the tool's stack and return its top (the initial A7).
pub fn allocate_stack(memory: &mut GuestMemory, size: u32) -> Result<u32> {
    let base = memory.allocate(size)?;
    let top = (base + size) & !3;
    debug!("stack {base:#08x}..{top:#08x}");
    Ok(top)
}
