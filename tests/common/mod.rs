#![allow(dead_code)]

use mpw::{GuestMemory, resource::ResourceRecord};

/// CODE 0 payload: A5 world header followed by the jump table.
pub fn code0(above: u32, below: u32, jt_offset: u32, entries: &[(u16, u16)]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&above.to_be_bytes());
    data.extend_from_slice(&below.to_be_bytes());
    data.extend_from_slice(&(entries.len() as u32 * 8).to_be_bytes());
    data.extend_from_slice(&jt_offset.to_be_bytes());
    for &(offset, segment) in entries {
        data.extend_from_slice(&jump_table_entry(offset, segment));
    }
    data
}

pub fn jump_table_entry(offset: u16, segment: u16) -> [u8; 8] {
    let mut entry = [0u8; 8];
    entry[0..2].copy_from_slice(&offset.to_be_bytes());
    entry[2..4].copy_from_slice(&0x3F3Cu16.to_be_bytes());
    entry[4..6].copy_from_slice(&segment.to_be_bytes());
    entry[6..8].copy_from_slice(&0xA9F0u16.to_be_bytes());
    entry
}

/// 64 bytes of recognisable code.
pub fn segment_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(1)).collect()
}

/// The smallest tool: CODE 1 (64 bytes) and an A5 world with one entry
/// pointing at CODE 1 offset 4. CODE 1 comes first so the jump table, which
/// lies above the 32-byte A5 world, is not overwritten by a later segment.
pub fn minimal_tool() -> Vec<ResourceRecord> {
    vec![
        ResourceRecord::code(1, segment_bytes(64)),
        ResourceRecord::code(0, code0(0, 32, 0, &[(4, 1)])),
    ]
}

pub fn read_cstring(memory: &GuestMemory, mut addr: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    loop {
        let byte = memory.read_byte(addr);
        if byte == 0 {
            return bytes;
        }
        bytes.push(byte);
        addr += 1;
    }
}
