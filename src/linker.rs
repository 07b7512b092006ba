use std::ops::Range;

use log::trace;

use crate::{
    error::{MpwError, Result},
    loader::SegmentTable,
    memory::GuestMemory,
};

pub const JUMP_TABLE_ENTRY_LEN: u32 = 8;

/// `MOVE.W #segment,-(SP)` opcode in an unloaded entry.
pub const MOVE_MARKER: u16 = 0x3F3C;
/// `_LoadSeg` trap in an unloaded entry.
pub const LOADSEG_MARKER: u16 = 0xA9F0;
/// `JMP abs.L` opcode written over a linked entry.
pub const JMP_ABS_LONG: u16 = 0x4EF9;

/// Each code segment starts with a 4-byte jump table info header.
const SEGMENT_HEADER_LEN: u32 = 4;

/// An entry as found in CODE 0 before linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTableEntry {
    pub offset: u16,
    pub marker1: u16,
    pub segment: u16,
    pub marker2: u16,
}

impl JumpTableEntry {
    pub fn read(memory: &GuestMemory, addr: u32) -> Self {
        Self {
            offset: memory.read_word(addr),
            marker1: memory.read_word(addr.wrapping_add(2)),
            segment: memory.read_word(addr.wrapping_add(4)),
            marker2: memory.read_word(addr.wrapping_add(6)),
        }
    }

    pub fn is_unloaded(&self) -> bool {
        self.marker1 == MOVE_MARKER && self.marker2 == LOADSEG_MARKER
    }
}

/// Rewrite every entry in `range` into a direct jump to its routine.
///
/// Each entry `{offset, 0x3F3C, segment, 0xA9F0}` becomes
/// `{offset, 0x4EF9, target}` with `target = base(segment) + offset + 4`.
/// Returns the number of entries linked.
pub fn link_jump_table(
    memory: &mut GuestMemory,
    segments: &SegmentTable,
    range: Range<u32>,
) -> Result<u32> {
    let mut linked = 0;
    let mut address = range.start;

    while address < range.end {
        let entry = JumpTableEntry::read(memory, address);
        let target = resolve_entry(segments, address, &entry)?;

        memory.write_word(address.wrapping_add(2), JMP_ABS_LONG);
        memory.write_long(address.wrapping_add(4), target);

        trace!(
            "jump table {address:#08x}: segment {} + {:#06x} -> {target:#08x}",
            entry.segment, entry.offset
        );

        linked += 1;
        address = address.wrapping_add(JUMP_TABLE_ENTRY_LEN);
    }

    Ok(linked)
}

fn resolve_entry(segments: &SegmentTable, address: u32, entry: &JumpTableEntry) -> Result<u32> {
    if !entry.is_unloaded() {
        return Err(MpwError::CorruptJumpTable {
            address,
            marker1: entry.marker1,
            marker2: entry.marker2,
        });
    }

    let unresolved = || MpwError::UnresolvedSegment {
        address,
        segment: entry.segment,
        offset: entry.offset,
    };

    let segment = segments.get(entry.segment).ok_or_else(unresolved)?;
    if segment.base == 0 || segment.length == 0 || entry.offset as u32 >= segment.length {
        return Err(unresolved());
    }

    Ok(segment
        .base
        .wrapping_add(entry.offset as u32)
        .wrapping_add(SEGMENT_HEADER_LEN))
}
