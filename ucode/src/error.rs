use common::Flags;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UcodeError {
    #[error("{name}: every caller step slot is in use, no room for the step-counter reset")]
    StepBudgetExhausted { name: String },

    #[error("{name}: {needed}-step patch at slot {at} runs past the 16-step budget")]
    PatchOverflow { name: String, at: usize, needed: usize },

    #[error("{name}: no step-counter reset sentinel to patch at")]
    MissingResetSentinel { name: String },

    #[error("{name}: opcode space exhausted, 256 instructions already registered")]
    OpcodeSpaceExhausted { name: String },

    #[error("opcode {opcode:#04x} is not an open slot")]
    BadSlot { opcode: u8 },

    #[error("no control word for opcode {opcode:#04x} step {step} flags {flags:?}")]
    MissingControlWord { opcode: u8, step: u8, flags: Flags },
}
