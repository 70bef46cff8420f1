use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "ucode")]
#[command(about = "Compiles the instruction table into control-store ROM images", long_about = None)]
struct Args {
    /// Directory the ROM images are written into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Also write a customasm ruledef for the instruction table
    #[arg(long)]
    ruledef: bool,

    /// Print the opcode table and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let set = ucode::instruction_set()?;

    if args.list {
        for (opcode, instruction) in set.table.instructions().iter().enumerate() {
            println!("{:02x}  {}", opcode, instruction.name());
        }
        return Ok(());
    }

    let matrix = ucode::expand(&set)?;
    let images = ucode::emit(&matrix)?;

    std::fs::create_dir_all(&args.output)?;
    for path in images.write_to_dir(&args.output)? {
        println!("wrote {} ({} bytes)", path.display(), common::ROM_BYTES);
    }

    if args.ruledef {
        let path = args.output.join("ruledef.asm");
        std::fs::write(&path, ucode::ruledef(&set))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}
