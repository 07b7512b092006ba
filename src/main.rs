use anyhow::Result;
use clap::{Parser, error::ErrorKind};
use log::LevelFilter;

use mpw::{
    GuestMemory,
    bootstrap::{allocate_stack, initialize_process},
    load_executable,
    options::Args,
    resource::ResourceFork,
};

// sysexits.h
const EX_USAGE: i32 = 64;
const EX_CONFIG: i32 = 78;

fn main() {
    let args = parse_args();
    init_logging(args.trace);

    if let Err(err) = run(&args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            // Raised by the numeric and machine value parsers.
            ErrorKind::ValueValidation => {
                let _ = err.print();
                std::process::exit(EX_CONFIG);
            }
            _ => {
                let _ = err.print();
                std::process::exit(EX_USAGE);
            }
        },
    }
}

fn init_logging(trace: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if trace {
        builder.filter_level(LevelFilter::Trace);
    }
    builder.format_timestamp(None).init();
}

fn run(args: &Args) -> Result<()> {
    let tool = args.tool();
    let mut memory = GuestMemory::with_limit(args.ram)?;

    let fork = ResourceFork::open(&tool)?;
    let image = load_executable(&mut memory, &fork)?;
    let block = initialize_process(&mut memory, &args.command, &args.env)?;
    let stack_top = allocate_stack(&mut memory, args.stack)?;

    println!("{}: {} CODE segments", tool.display(), image.segments.len());
    for segment in image.segments.iter() {
        println!(
            "  CODE {:<5} {:#08x} {:#08x} bytes",
            segment.resource_id, segment.base, segment.length
        );
    }
    println!(
        "a5 {:#08x}, jump table {:#08x}..{:#08x} ({} entries)",
        image.a5,
        image.jump_table.start,
        image.jump_table.end,
        image.jump_table_entries()
    );
    println!("entry point {:#08x}", image.entry_point());
    println!(
        "argument block {:#08x} (argc {}), stack top {stack_top:#08x}, machine {}",
        block.address, block.argc, args.machine
    );
    println!("heap high water {:#08x}", memory.high_water());

    Ok(())
}
