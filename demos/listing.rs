use std::io;

use color_eyre::eyre::Result;
use regvm::processor::Processor;
use regvm::program::Program;
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init()?; // logging

    let program = Program::from_file("demos/programs/factorial.asm")?;

    let mut out = io::stdout();
    program.write_listing(&mut out)?;
    program.write_labels(&mut out)?;

    let mut cpu = Processor::new(program);
    cpu.run(&mut out)?;
    cpu.write_registers(&mut out)?;

    Ok(())
}
