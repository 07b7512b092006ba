use mpw::{
    Extended, GuestMemory, MpwError,
    numeric::{GuestNumber, read_num, write_num},
    toolbox::{
        CpuCore, DECSTR68K, FP68K, TrapRegisters, dispatch, dispatch_trap, num_to_string,
        string_to_num, trap_name,
    },
};

const SP: u32 = 0x8000;
const DEST: u32 = 0x2000;
const SRC: u32 = 0x2010;

/// Push a binary SANE frame: selector at SP, then dest and src addresses.
fn binary_frame(memory: &mut GuestMemory, selector: u16) -> TrapRegisters {
    memory.write_word(SP, selector);
    memory.write_long(SP + 2, DEST);
    memory.write_long(SP + 6, SRC);
    TrapRegisters {
        d0: 0xffff_ffff,
        a0: 0,
        a7: SP,
    }
}

fn run_binary<T: GuestNumber>(selector: u16, dest: f64, src: T) -> (f64, TrapRegisters) {
    let mut memory = GuestMemory::new();
    write_num(&mut memory, Extended::from_f64(dest), DEST);
    write_num(&mut memory, src, SRC);
    let regs = binary_frame(&mut memory, selector);
    let out = dispatch(&mut memory, FP68K, regs).unwrap();
    (read_num::<Extended>(&memory, DEST).to_f64(), out)
}

#[test]
fn fdivx_divides_destination_by_source() {
    let (result, regs) = run_binary(0x0006, 10.0, Extended::from_f64(4.0));
    assert_eq!(result, 2.5);
    assert_eq!(regs.a7, SP + 10);
    assert_eq!(regs.d0, 0);
}

#[test]
fn fmulx_multiplies() {
    let (result, _) = run_binary(0x0004, -1.5, Extended::from_f64(3.0));
    assert_eq!(result, -4.5);
}

#[test]
fn faddi_adds_a_16_bit_integer() {
    let (result, regs) = run_binary(0x2000, 1.5, -3i16);
    assert_eq!(result, -1.5);
    assert_eq!(regs.a7, SP + 10);
}

#[test]
fn fl2x_converts_a_long() {
    let (result, _) = run_binary(0x280e, 99.0, 123_456i32);
    assert_eq!(result, 123_456.0);

    let (result, _) = run_binary(0x280e, 0.0, i32::MIN);
    assert_eq!(result, i32::MIN as f64);
}

#[test]
fn other_formats_and_subtraction() {
    let (result, _) = run_binary(0x0802, 1.0, 0.25f64);
    assert_eq!(result, 0.75);

    let (result, _) = run_binary(0x1000, 2.0, 0.5f32);
    assert_eq!(result, 2.5);

    let (result, _) = run_binary(0x2806, 9.0, 4i32);
    assert_eq!(result, 2.25);

    let (result, _) = run_binary(0x0002, 1.0, Extended::from_f64(3.0));
    assert_eq!(result, -2.0);
}

fn run_extended(selector: u16, dest: Extended, src: Extended) -> Extended {
    let mut memory = GuestMemory::new();
    write_num(&mut memory, dest, DEST);
    write_num(&mut memory, src, SRC);
    let regs = binary_frame(&mut memory, selector);
    dispatch(&mut memory, FP68K, regs).unwrap();
    read_num::<Extended>(&memory, DEST)
}

#[test]
fn extended_operations_keep_full_precision() {
    let max_integer = Extended::new(0x403e, u64::MAX);
    assert_eq!(run_extended(0x0000, max_integer, Extended::ZERO), max_integer);

    let one = Extended::from_i32(1);
    let ulp = Extended::new(0x3fff - 63, 1 << 63);
    let result = run_extended(0x0000, one, ulp);
    assert_eq!(result, Extended::new(0x3fff, 0x8000_0000_0000_0001));
    assert_eq!(run_extended(0x0002, result, one), ulp);

    let third = run_extended(0x0006, one, Extended::from_i32(3));
    assert_eq!(third, Extended::new(0x3ffd, 0xaaaa_aaaa_aaaa_aaab));
}

#[test]
fn extended_operations_cover_the_extended_range() {
    let huge = Extended::new(0x3fff + 2000, 1 << 63);
    let one = Extended::from_i32(1);
    assert_eq!(run_extended(0x0004, huge, one), huge);
    assert_eq!(
        run_extended(0x0004, huge, huge),
        Extended::new(0x3fff + 4000, 1 << 63)
    );

    let tiny = Extended::new(0x3fff - 2000, 1 << 63);
    assert_eq!(run_extended(0x0006, tiny, huge), Extended::new(0x3fff - 4000, 1 << 63));
}

#[test]
fn division_by_zero_follows_ieee() {
    let (result, _) = run_binary(0x0006, 1.0, Extended::ZERO);
    assert_eq!(result, f64::INFINITY);
}

#[test]
fn fx2dec_writes_a_zero_decimal_record() {
    let mut memory = GuestMemory::new();
    let (f_adr, a_adr, d_adr) = (0x3000, 0x3010, 0x3020);
    write_num(&mut memory, Extended::from_f64(3.25), a_adr);
    memory.write_data(d_adr, &[0xff; 8]);

    memory.write_word(SP, 0x000b);
    memory.write_long(SP + 2, d_adr);
    memory.write_long(SP + 6, a_adr);
    memory.write_long(SP + 10, f_adr);

    let regs = TrapRegisters {
        a7: SP,
        ..Default::default()
    };
    let out = dispatch(&mut memory, FP68K, regs).unwrap();

    assert_eq!(out.a7, SP + 14);
    assert_eq!(memory.read_data(d_adr, 6), vec![0; 6]);
    assert_eq!(memory.read_byte(d_adr + 6), 0xff);
    // The source is left alone.
    assert_eq!(read_num::<Extended>(&memory, a_adr).to_f64(), 3.25);
}

#[test]
fn unknown_sane_selectors_are_fatal() {
    for selector in [0x0008u16, 0x3000, 0x4000, 0x0010, 0x080b] {
        let mut memory = GuestMemory::new();
        let regs = binary_frame(&mut memory, selector);
        let err = dispatch(&mut memory, FP68K, regs).unwrap_err();
        assert!(
            matches!(err, MpwError::UnsupportedTrap { trap: FP68K, selector: s } if s == selector),
            "{selector:#06x}: {err}"
        );
    }
}

#[test]
fn unsupported_trap_message() {
    let mut memory = GuestMemory::new();
    let regs = binary_frame(&mut memory, 0x0008);
    let err = dispatch(&mut memory, FP68K, regs).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"trap 0xa9eb selector 0x0008 is not supported");
}

#[test]
fn unknown_traps_are_fatal() {
    let mut memory = GuestMemory::new();
    let err = dispatch(&mut memory, 0xa9f4, TrapRegisters::default()).unwrap_err();
    assert!(matches!(
        err,
        MpwError::UnsupportedTrap {
            trap: 0xa9f4,
            selector: 0
        }
    ));
    assert_eq!(trap_name(0xa9f4), Some("ExitToShell"));
    assert_eq!(trap_name(FP68K), Some("FP68K"));
    assert_eq!(trap_name(0x1234), None);
}

#[test]
fn num_to_string_writes_a_pascal_string() {
    let mut memory = GuestMemory::new();
    memory.write_word(SP, 0);
    let regs = TrapRegisters {
        d0: (-7i32) as u32,
        a0: 0x3000,
        a7: SP,
    };
    let out = dispatch(&mut memory, DECSTR68K, regs).unwrap();

    assert_eq!(memory.read_pstring(0x3000), b"-7");
    assert_eq!(out.a0, 0x3000);
    assert_eq!(out.a7, SP + 2);
    assert_eq!(out.d0, 0);
}

#[test]
fn string_to_num_reads_a_pascal_string() {
    let mut memory = GuestMemory::new();
    memory.write_word(SP, 1);
    memory.write_pstring(0x3000, b"-42");
    let regs = TrapRegisters {
        d0: 0,
        a0: 0x3000,
        a7: SP,
    };
    let out = dispatch(&mut memory, DECSTR68K, regs).unwrap();
    assert_eq!(out.d0 as i32, -42);
    assert_eq!(out.a7, SP + 2);
}

#[test]
fn decimal_package_rejects_other_selectors() {
    let mut memory = GuestMemory::new();
    memory.write_word(SP, 2);
    let regs = TrapRegisters {
        a7: SP,
        ..Default::default()
    };
    assert!(matches!(
        dispatch(&mut memory, DECSTR68K, regs),
        Err(MpwError::UnsupportedTrap {
            trap: DECSTR68K,
            selector: 2
        })
    ));
}

#[test]
fn string_to_num_edge_cases() {
    assert_eq!(string_to_num(b"-42"), -42);
    assert_eq!(string_to_num(b""), 0);
    assert_eq!(string_to_num(b"+17"), 17);
    assert_eq!(string_to_num(b"2147483647"), i32::MAX);
    assert_eq!(string_to_num(b"-2147483648"), i32::MIN);
    // Digits are not validated: 'a' contributes its low nibble, 1.
    assert_eq!(string_to_num(b"1a"), 11);
    assert_eq!(string_to_num(b"-"), 0);
}

#[test]
fn num_to_string_edge_cases() {
    assert_eq!(num_to_string(-7), "-7");
    assert_eq!(num_to_string(0), "0");
    assert_eq!(num_to_string(i32::MIN), "-2147483648");
}

#[derive(Default)]
struct Registers {
    d: [u32; 8],
    a: [u32; 8],
}

impl CpuCore for Registers {
    fn d_reg(&self, n: usize) -> u32 {
        self.d[n]
    }

    fn a_reg(&self, n: usize) -> u32 {
        self.a[n]
    }

    fn set_d_reg(&mut self, n: usize, value: u32) {
        self.d[n] = value;
    }

    fn set_a_reg(&mut self, n: usize, value: u32) {
        self.a[n] = value;
    }
}

#[test]
fn dispatch_trap_updates_a_live_core() {
    let mut memory = GuestMemory::new();
    memory.write_word(SP, 1);
    memory.write_pstring(0x3000, b"1234");

    let mut core = Registers::default();
    core.a[0] = 0x3000;
    core.a[7] = SP;
    core.d[1] = 0x5555;

    dispatch_trap(&mut core, &mut memory, DECSTR68K).unwrap();
    assert_eq!(core.d[0], 1234);
    assert_eq!(core.a[7], SP + 2);
    assert_eq!(core.d[1], 0x5555);
}
