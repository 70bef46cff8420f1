//! Specializes the flag-independent table for each of the 64 flag states.
//! Every row is a deep copy of the base table; only the templated opcodes
//! (conditional jumps, inhibit toggles, interrupt dispatch) differ per row.

use common::ControlWord as W;
use common::Flags;

use crate::error::UcodeError;
use crate::isa::InstructionSet;
use crate::table::Instruction;

pub const FLAG_STATES: usize = 64;

/// One fully specialized copy of the instruction table per flag state.
pub struct FlagMatrix {
    rows: Vec<Vec<Instruction>>,
}

impl FlagMatrix {
    pub fn row(&self, flags: Flags) -> &[Instruction] {
        &self.rows[flags.bits() as usize]
    }

    pub fn control_word(&self, opcode: u8, step: u8, flags: Flags) -> Result<W, UcodeError> {
        let missing = UcodeError::MissingControlWord {
            opcode,
            step,
            flags,
        };
        let row = self.rows.get(flags.bits() as usize).ok_or(missing.clone())?;
        let instruction = row.get(opcode as usize).ok_or(missing.clone())?;
        instruction.steps().get(step as usize).copied().ok_or(missing)
    }
}

/// Operand bytes at PC into the transfer register, then into PC: the branch
/// is taken.
fn branch_taken_tail() -> [W; 4] {
    [
        W::PC_ENABLE | W::MEM_ENABLE | W::XFER_LOW_WRITE | W::PC_COUNT,
        W::PC_ENABLE | W::MEM_ENABLE | W::XFER_HIGH_WRITE,
        W::XFER_ENABLE | W::PC_WRITE,
        W::STEP_RESET,
    ]
}

fn toggle_inhibit_tail() -> [W; 2] {
    [W::TOGGLE_INHIBIT, W::STEP_RESET]
}

/// The interrupt register is hardwired to the service entry address: zero the
/// high byte through the accumulator and jump through the transfer register.
fn interrupt_dispatch_tail() -> [W; 5] {
    [
        W::ACC_WRITE | W::REG_I_WRITE,
        W::ACC_ENABLE | W::XFER_HIGH_WRITE,
        W::REG_I_ENABLE | W::XFER_LOW_WRITE,
        W::XFER_ENABLE | W::PC_WRITE,
        W::STEP_RESET,
    ]
}

pub fn expand(set: &InstructionSet) -> Result<FlagMatrix, UcodeError> {
    let mut rows = Vec::with_capacity(FLAG_STATES);
    for bits in 0..FLAG_STATES as u8 {
        let flags = Flags::from_bits_truncate(bits);
        let mut row = set.table.instructions().to_vec();
        patch_row(set, flags, &mut row)?;
        rows.push(row);
    }
    Ok(FlagMatrix { rows })
}

fn patch_row(set: &InstructionSet, flags: Flags, row: &mut [Instruction]) -> Result<(), UcodeError> {
    patch_jumps(set, flags, row)?;

    let irq = flags.contains(Flags::IRQ);
    let inhibit = flags.contains(Flags::INHIBIT);

    if irq && inhibit {
        // a pending but inhibited request must not disturb ordinary control
        // flow, and toggling here would drop the mask
    } else if irq {
        // service the interrupt once the current instruction completes:
        // every eligible opcode's tail jumps to the service entry instead of
        // resetting the step counter
        let dispatch = interrupt_dispatch_tail();
        for opcode in 0..=u8::MAX {
            if opcode == set.reset_vector
                || opcode == set.interrupt_entry
                || set.table.is_filler(opcode)
            {
                continue;
            }
            row[opcode as usize].splice_at_reset(&dispatch)?;
        }
    } else if inhibit {
        row[set.clear_inhibit as usize].replace_tail(&toggle_inhibit_tail())?;
    } else {
        row[set.set_inhibit as usize].replace_tail(&toggle_inhibit_tail())?;
    }

    Ok(())
}

/// For each data flag, exactly one of the true/false templates takes the
/// branch in this row; the other keeps its fall-through body.
fn patch_jumps(set: &InstructionSet, flags: Flags, row: &mut [Instruction]) -> Result<(), UcodeError> {
    let taken = branch_taken_tail();

    let z = flags.contains(Flags::ZERO);
    let o = flags.contains(Flags::OVERFLOW);
    let n = flags.contains(Flags::NEG);
    let c = flags.contains(Flags::CARRY);

    row[if z { set.jz } else { set.jnz } as usize].replace_tail(&taken)?;
    row[if o { set.jo } else { set.jno } as usize].replace_tail(&taken)?;
    row[if n { set.jn } else { set.jp } as usize].replace_tail(&taken)?;
    row[if c { set.jc } else { set.jnc } as usize].replace_tail(&taken)?;
    if !n && !z {
        row[set.jgz as usize].replace_tail(&taken)?;
    }

    Ok(())
}
