pub mod emit;
pub mod error;
pub mod expand;
pub mod isa;
pub mod ruledef;
pub mod table;

pub use emit::{emit, RomImages};
pub use error::UcodeError;
pub use expand::{expand, FlagMatrix, FLAG_STATES};
pub use isa::{instruction_set, InstructionSet};
pub use ruledef::ruledef;
pub use table::{BaseTable, Instruction, TableBuilder, FETCH, MAX_CALLER_STEPS, OPCODE_COUNT, STEP_COUNT};

use lazy_static::lazy_static;
lazy_static! {
    pub static ref ROM_IMAGES: RomImages =
        build_roms().expect("builtin instruction table must expand cleanly");
}

/// The whole pipeline: build the table, specialize it per flag state, sweep
/// the address space.
pub fn build_roms() -> Result<RomImages, UcodeError> {
    let set = instruction_set()?;
    let matrix = expand(&set)?;
    emit(&matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ROM_BYTES;

    #[test]
    fn pipeline_produces_full_images() {
        for rom in 0..common::ROM_COUNT {
            assert_eq!(ROM_BYTES, ROM_IMAGES.rom(rom).len());
        }
    }
}
