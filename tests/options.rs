use mpw::{
    ConfigError,
    options::{parse_env, parse_machine, parse_number},
};

#[test]
fn plain_and_suffixed_numbers() {
    assert_eq!(parse_number("1024"), Ok(1024));
    assert_eq!(parse_number("2K"), Ok(2048));
    assert_eq!(parse_number("2k"), Ok(2048));
    assert_eq!(parse_number("1M"), Ok(1_048_576));
    assert_eq!(parse_number("16m"), Ok(16 * 1024 * 1024));
    assert_eq!(parse_number("  64"), Ok(64));
    assert_eq!(parse_number("+8"), Ok(8));
    assert_eq!(parse_number("0"), Ok(0));
}

#[test]
fn leading_zero_is_decimal_and_0x_is_hex() {
    assert_eq!(parse_number("010"), Ok(10));
    assert_eq!(parse_number("0008K"), Ok(8192));
    assert_eq!(parse_number("0x10"), Ok(16));
    assert_eq!(parse_number("0X1fK"), Ok(31 * 1024));
}

#[test]
fn rejects_bad_input() {
    for input in ["-5", "", "abc", "K", "12Q", "1KB", "0x", "- 1"] {
        assert_eq!(
            parse_number(input),
            Err(ConfigError::InvalidNumber(input.to_string())),
            "{input:?}"
        );
    }
}

#[test]
fn rejects_overflow() {
    assert!(parse_number("99999999999M").is_err());
    assert!(parse_number("4194304K").is_err());
    assert!(parse_number("4294967296").is_err());
    assert_eq!(parse_number("4294967295"), Ok(u32::MAX));
    assert_eq!(parse_number("4095M"), Ok(4095 * 1024 * 1024));
}

#[test]
fn error_names_the_offending_token() {
    insta::assert_snapshot!(parse_number("12Q").unwrap_err().to_string(), @"12Q - invalid input");
}

#[test]
fn machines() {
    assert_eq!(parse_machine("68000"), Ok(68000));
    assert_eq!(parse_machine("68030"), Ok(68030));
    assert_eq!(parse_machine("68060"), Err(ConfigError::UnsupportedMachine(68060)));
    assert!(parse_machine("fast").is_err());
}

#[test]
fn environment_entries() {
    assert_eq!(
        parse_env("MPW=/mpw/"),
        Ok(("MPW".to_string(), "/mpw/".to_string()))
    );
    assert_eq!(parse_env("EMPTY="), Ok(("EMPTY".to_string(), String::new())));
    assert!(parse_env("=value").is_err());
    assert!(parse_env("novalue").is_err());
}
