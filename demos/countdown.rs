use std::io;

use color_eyre::eyre::Result;
use log::LevelFilter;
use regvm::processor::Processor;
use regvm::program::Program;
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()?; // logging

    let program = Program::from_file("demos/programs/countdown.asm")?;
    let mut cpu = Processor::new(program);

    cpu.run(&mut io::stdout())?;

    Ok(())
}
