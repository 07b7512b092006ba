use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

pub const DEFAULT_RAM: u32 = 16 * 1024 * 1024;
pub const DEFAULT_STACK: u32 = 8 * 1024;
pub const DEFAULT_MACHINE: u32 = 68030;

const MACHINES: [u32; 5] = [68000, 68010, 68020, 68030, 68040];

#[derive(Parser, Debug)]
#[command(
    name = "mpw",
    version,
    about = "Load an MPW tool into a 68k guest address space."
)]
pub struct Args {
    /// Guest memory available to the allocator (accepts K/M suffixes).
    #[arg(short, long, value_parser = parse_number, default_value_t = DEFAULT_RAM)]
    pub ram: u32,

    /// Tool stack size (accepts K/M suffixes).
    #[arg(short, long, value_parser = parse_number, default_value_t = DEFAULT_STACK)]
    pub stack: u32,

    /// CPU model to report to the tool.
    #[arg(short, long, value_parser = parse_machine, default_value_t = DEFAULT_MACHINE)]
    pub machine: u32,

    /// Environment entry passed to the tool (can repeat).
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Log trap calls and loader activity.
    #[arg(short, long, default_value_t = false)]
    pub trace: bool,

    /// MPW tool to load, followed by the arguments passed to it.
    #[arg(
        value_name = "TOOL",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl Args {
    pub fn tool(&self) -> PathBuf {
        PathBuf::from(self.command.first().map(String::as_str).unwrap_or_default())
    }
}

/// Parse a non-negative number with an optional `K` or `M` suffix.
///
/// Leading whitespace is skipped and `0x` selects hexadecimal. A leading zero
/// followed by a digit is read as decimal, never octal. The result must fit
/// in 32 bits.
pub fn parse_number(input: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidNumber(input.to_string());
    let text = input.trim_start();

    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let hex_digits = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_hexdigit()));

    let (digits, rest, radix) = match hex_digits {
        Some(rest) => {
            let end = rest
                .find(|c: char| !c.is_ascii_hexdigit())
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..], 16)
        }
        None => {
            let end = unsigned
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(unsigned.len());
            (&unsigned[..end], &unsigned[end..], 10)
        }
    };

    if digits.is_empty() {
        return Err(invalid());
    }
    let value = u64::from_str_radix(digits, radix).map_err(|_| invalid())?;
    if negative && value != 0 {
        return Err(invalid());
    }

    let multiplier: u64 = if rest.is_empty() {
        1
    } else if rest.eq_ignore_ascii_case("K") {
        1024
    } else if rest.eq_ignore_ascii_case("M") {
        1024 * 1024
    } else {
        return Err(invalid());
    };

    value
        .checked_mul(multiplier)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(invalid)
}

pub fn parse_machine(input: &str) -> Result<u32, ConfigError> {
    let machine = parse_number(input)?;
    if MACHINES.contains(&machine) {
        Ok(machine)
    } else {
        Err(ConfigError::UnsupportedMachine(machine))
    }
}

pub fn parse_env(input: &str) -> Result<(String, String), ConfigError> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(ConfigError::InvalidEnvironment(input.to_string())),
    }
}
