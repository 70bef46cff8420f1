//! Sweeps the full 18-bit address space and serializes the three ROM images.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use common::{Flags, RomAddress, ROM_BYTES, ROM_COUNT, ROM_WORDS};

use crate::error::UcodeError;
use crate::expand::FlagMatrix;

pub struct RomImages {
    roms: [Vec<u8>; ROM_COUNT],
}

impl RomImages {
    pub fn rom(&self, rom: usize) -> &[u8] {
        &self.roms[rom]
    }

    pub fn file_names() -> [&'static str; ROM_COUNT] {
        ["microcode_rom_0.bin", "microcode_rom_1.bin", "microcode_rom_2.bin"]
    }

    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (name, bytes) in Self::file_names().iter().zip(&self.roms) {
            let path = dir.join(name);
            let mut file = File::create(&path)?;
            file.write_all(bytes)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Every address resolves to (opcode, step, flags); the word found there is
/// normalized once and split 16 bits per chip, low word first in each file.
pub fn emit(matrix: &FlagMatrix) -> Result<RomImages, UcodeError> {
    let mut roms: [Vec<u8>; ROM_COUNT] = std::array::from_fn(|_| Vec::with_capacity(ROM_BYTES));

    for index in 0..ROM_WORDS as u32 {
        let address = RomAddress::from_index(index);
        let flags = Flags::from_bits_truncate(*address.flags);
        let word = matrix
            .control_word(address.opcode, *address.step, flags)?
            .normalized();
        for (rom, out) in roms.iter_mut().enumerate() {
            out.extend_from_slice(&word.rom_word(rom).to_le_bytes());
        }
    }

    Ok(RomImages { roms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ControlWord as W;
    use crate::expand::expand;
    use crate::isa::instruction_set;
    use crate::table::FETCH;

    fn images() -> (crate::isa::InstructionSet, FlagMatrix, RomImages) {
        let set = instruction_set().unwrap();
        let matrix = expand(&set).unwrap();
        let roms = emit(&matrix).unwrap();
        (set, matrix, roms)
    }

    fn word_at(roms: &RomImages, index: u32) -> u64 {
        let mut word = 0u64;
        for rom in 0..ROM_COUNT {
            let bytes = roms.rom(rom);
            let at = index as usize * 2;
            let half = u16::from_le_bytes([bytes[at], bytes[at + 1]]);
            word |= (half as u64) << (16 * rom);
        }
        word
    }

    #[test]
    fn images_cover_the_address_space() {
        let (_, _, roms) = images();
        for rom in 0..ROM_COUNT {
            assert_eq!(ROM_BYTES, roms.rom(rom).len());
        }
    }

    #[test]
    fn emitted_words_round_trip_to_the_matrix() {
        let (_, matrix, roms) = images();
        // a coarse stride plus the corners keeps this fast while still
        // touching every opcode
        let indices = (0..ROM_WORDS as u32)
            .step_by(997)
            .chain([0, 1, ROM_WORDS as u32 - 1]);
        for index in indices {
            let address = RomAddress::from_index(index);
            let flags = Flags::from_bits_truncate(*address.flags);
            let expected = matrix
                .control_word(address.opcode, *address.step, flags)
                .unwrap();
            let denormalized = word_at(&roms, index) ^ W::ACTIVE_LOW.bits();
            assert_eq!(expected.bits(), denormalized, "index {:#07x}", index);
        }
    }

    #[test]
    fn emission_is_deterministic() {
        let set = instruction_set().unwrap();
        let matrix = expand(&set).unwrap();
        let first = emit(&matrix).unwrap();
        let second = emit(&matrix).unwrap();
        for rom in 0..ROM_COUNT {
            assert_eq!(first.rom(rom), second.rom(rom));
        }
    }

    #[test]
    fn nop_fetch_reaches_the_image() {
        let (set, _, roms) = images();
        let nop = set.table.opcode_of("NOP").unwrap();
        let index = RomAddress::new(nop, 0, Flags::empty()).to_index();
        assert_eq!(FETCH.normalized().bits(), word_at(&roms, index));
    }

    #[test]
    fn halt_bit_reaches_the_image() {
        let (set, _, roms) = images();
        let hlt = set.table.opcode_of("HLT").unwrap();
        let index = RomAddress::new(hlt, 1, Flags::empty()).to_index();
        let word = word_at(&roms, index);
        // only the halt line is asserted; everything else idles
        assert_eq!(W::HALT.bits(), word ^ W::ACTIVE_LOW.bits());
    }

    #[test]
    fn unreachable_padding_idles_every_line() {
        let (set, _, roms) = images();
        let nop = set.table.opcode_of("NOP").unwrap();
        // NOP resets at step 1; steps 2.. are padding
        let index = RomAddress::new(nop, 5, Flags::empty()).to_index();
        assert_eq!(W::ACTIVE_LOW.bits(), word_at(&roms, index));
    }
}
