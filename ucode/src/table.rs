use std::collections::BTreeSet;

use common::ControlWord;

use crate::error::UcodeError;

pub const STEP_COUNT: usize = 16;
pub const MAX_CALLER_STEPS: usize = STEP_COUNT - 1;
pub const OPCODE_COUNT: usize = 256;

/// Step 0 of every table-built instruction.
pub const FETCH: ControlWord = ControlWord::FETCH;

/// One opcode's worth of control store: a mnemonic and exactly 16 micro-steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    name: String,
    steps: [ControlWord; STEP_COUNT],
}

impl Instruction {
    /// Builds the 16-step sequence from up to 15 caller steps: the fetch step
    /// is prepended, and the first all-zero slot after it becomes the
    /// step-counter reset. Fails if every slot is already spoken for.
    pub fn with_steps(name: &str, caller_steps: &[ControlWord]) -> Result<Instruction, UcodeError> {
        if caller_steps.len() > MAX_CALLER_STEPS {
            return Err(UcodeError::StepBudgetExhausted {
                name: name.to_string(),
            });
        }

        let mut steps = [ControlWord::empty(); STEP_COUNT];
        steps[0] = FETCH;
        steps[1..=caller_steps.len()].copy_from_slice(caller_steps);

        match steps[1..].iter().position(|s| s.is_empty()) {
            Some(i) => {
                let at = i + 1;
                steps[at] = ControlWord::STEP_RESET;
                for step in steps[at + 1..].iter_mut() {
                    *step = ControlWord::empty();
                }
            }
            None => {
                return Err(UcodeError::StepBudgetExhausted {
                    name: name.to_string(),
                })
            }
        }

        Ok(Instruction {
            name: name.to_string(),
            steps,
        })
    }

    /// All 16 steps verbatim: no fetch prefix, no reset sentinel. Only the
    /// power-on reset vector is built this way; its 4-bit step counter wraps
    /// back to step 0 on its own.
    pub fn raw(name: &str, steps: [ControlWord; STEP_COUNT]) -> Instruction {
        Instruction {
            name: name.to_string(),
            steps,
        }
    }

    pub(crate) fn filler(n: usize) -> Instruction {
        let mut steps = [ControlWord::empty(); STEP_COUNT];
        steps[0] = FETCH;
        steps[1] = ControlWord::STEP_RESET;
        Instruction {
            name: format!("FILLER_{}", n),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[ControlWord; STEP_COUNT] {
        &self.steps
    }

    pub fn step(&self, i: usize) -> ControlWord {
        self.steps[i]
    }

    pub(crate) fn reset_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| *s == ControlWord::STEP_RESET)
    }

    /// Replaces everything after the fetch step with `tail`, zero-padded.
    /// `tail` carries its own reset sentinel as its last step.
    pub(crate) fn replace_tail(&mut self, tail: &[ControlWord]) -> Result<(), UcodeError> {
        assert_eq!(Some(&ControlWord::STEP_RESET), tail.last());
        if tail.len() > MAX_CALLER_STEPS {
            return Err(UcodeError::PatchOverflow {
                name: self.name.clone(),
                at: 1,
                needed: tail.len(),
            });
        }
        self.steps[1..=tail.len()].copy_from_slice(tail);
        for step in self.steps[tail.len() + 1..].iter_mut() {
            *step = ControlWord::empty();
        }
        Ok(())
    }

    /// Splices `patch` in at the reset sentinel, so the patched sequence runs
    /// where the instruction used to end. Never truncates: a patch that runs
    /// past step 15 is a fatal budget error.
    pub(crate) fn splice_at_reset(&mut self, patch: &[ControlWord]) -> Result<(), UcodeError> {
        assert_eq!(Some(&ControlWord::STEP_RESET), patch.last());
        let at = self
            .reset_index()
            .ok_or_else(|| UcodeError::MissingResetSentinel {
                name: self.name.clone(),
            })?;
        if at + patch.len() > STEP_COUNT {
            return Err(UcodeError::PatchOverflow {
                name: self.name.clone(),
                at,
                needed: patch.len(),
            });
        }
        self.steps[at..at + patch.len()].copy_from_slice(patch);
        Ok(())
    }
}

/// Assigns opcodes in registration order and fills what is left over.
///
/// Slots can also be reserved up front and later claimed or released;
/// released slots are handed back out by `register_recycled`, so redundant
/// combinations (a register moved to itself, say) need not burn an opcode.
pub struct TableBuilder {
    slots: Vec<Option<Instruction>>,
    recycled: Vec<u8>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder {
            slots: Vec::new(),
            recycled: Vec::new(),
        }
    }

    pub fn register(&mut self, instruction: Instruction) -> Result<u8, UcodeError> {
        let opcode = self.fresh_slot(instruction.name())?;
        self.slots[opcode as usize] = Some(instruction);
        Ok(opcode)
    }

    /// Like `register`, but draws from the released-slot pool first.
    pub fn register_recycled(&mut self, instruction: Instruction) -> Result<u8, UcodeError> {
        match self.recycled.pop() {
            Some(opcode) => {
                self.claim(opcode, instruction)?;
                Ok(opcode)
            }
            None => self.register(instruction),
        }
    }

    /// Takes the next opcode without binding an instruction to it yet.
    pub fn reserve(&mut self) -> Result<u8, UcodeError> {
        self.fresh_slot("(reserved)")
    }

    pub fn claim(&mut self, opcode: u8, instruction: Instruction) -> Result<(), UcodeError> {
        match self.slots.get_mut(opcode as usize) {
            Some(slot @ None) => {
                *slot = Some(instruction);
                Ok(())
            }
            _ => Err(UcodeError::BadSlot { opcode }),
        }
    }

    /// Returns a reserved slot to the recycle pool.
    pub fn release(&mut self, opcode: u8) -> Result<(), UcodeError> {
        match self.slots.get(opcode as usize) {
            Some(None) if !self.recycled.contains(&opcode) => {
                self.recycled.push(opcode);
                Ok(())
            }
            _ => Err(UcodeError::BadSlot { opcode }),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn fresh_slot(&mut self, name: &str) -> Result<u8, UcodeError> {
        if self.slots.len() == OPCODE_COUNT {
            return Err(UcodeError::OpcodeSpaceExhausted {
                name: name.to_string(),
            });
        }
        self.slots.push(None);
        Ok((self.slots.len() - 1) as u8)
    }

    /// Pads the table out to all 256 opcodes with uniquely named no-op
    /// fillers, so every opcode decodes to something harmless.
    pub fn finish(mut self) -> BaseTable {
        self.slots.resize(OPCODE_COUNT, None);

        let mut fillers = BTreeSet::new();
        let mut filler_n = 0;
        let instructions = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(opcode, slot)| match slot {
                Some(instruction) => instruction,
                None => {
                    filler_n += 1;
                    fillers.insert(opcode as u8);
                    Instruction::filler(filler_n)
                }
            })
            .collect();

        BaseTable {
            instructions,
            fillers,
        }
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        TableBuilder::new()
    }
}

/// The flag-independent instruction table: all 256 opcodes, populated.
#[derive(Clone, Debug)]
pub struct BaseTable {
    instructions: Vec<Instruction>,
    fillers: BTreeSet<u8>,
}

impl BaseTable {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, opcode: u8) -> &Instruction {
        &self.instructions[opcode as usize]
    }

    pub fn is_filler(&self, opcode: u8) -> bool {
        self.fillers.contains(&opcode)
    }

    pub fn filler_count(&self) -> usize {
        self.fillers.len()
    }

    pub fn opcode_of(&self, name: &str) -> Option<u8> {
        self.instructions
            .iter()
            .position(|i| i.name() == name)
            .map(|i| i as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(bit: u64) -> ControlWord {
        ControlWord::from_bits_truncate(1 << bit)
    }

    #[test]
    fn fetch_prefix_and_sentinel() {
        let inst = Instruction::with_steps("T", &[word(41), word(5)]).unwrap();
        assert_eq!(FETCH, inst.step(0));
        assert_eq!(word(41), inst.step(1));
        assert_eq!(word(5), inst.step(2));
        assert_eq!(ControlWord::STEP_RESET, inst.step(3));
        for i in 4..STEP_COUNT {
            assert!(inst.step(i).is_empty());
        }
    }

    #[test]
    fn no_steps_means_immediate_reset() {
        let inst = Instruction::with_steps("T", &[]).unwrap();
        assert_eq!(ControlWord::STEP_RESET, inst.step(1));
        assert_eq!(Some(1), inst.reset_index());
    }

    #[test]
    fn sentinel_takes_first_zero_slot() {
        let inst =
            Instruction::with_steps("T", &[word(2), ControlWord::empty(), word(3)]).unwrap();
        assert_eq!(ControlWord::STEP_RESET, inst.step(2));
        // the step after the reset is unreachable and is dropped
        assert!(inst.step(3).is_empty());
    }

    #[test]
    fn full_budget_is_a_capacity_error() {
        let steps: Vec<ControlWord> = (0..MAX_CALLER_STEPS as u64).map(|i| word(i)).collect();
        assert_eq!(
            Err(UcodeError::StepBudgetExhausted {
                name: "T".to_string()
            }),
            Instruction::with_steps("T", &steps)
        );

        // one free slot left is fine: the sentinel lands there
        let inst = Instruction::with_steps("T", &steps[..MAX_CALLER_STEPS - 1]).unwrap();
        assert_eq!(ControlWord::STEP_RESET, inst.step(STEP_COUNT - 1));
    }

    #[test]
    fn raw_keeps_steps_verbatim() {
        let mut steps = [ControlWord::empty(); STEP_COUNT];
        steps[15] = word(19);
        let inst = Instruction::raw("T", steps);
        assert_ne!(FETCH, inst.step(0));
        assert_eq!(word(19), inst.step(15));
        assert_eq!(None, inst.reset_index());
    }

    #[test]
    fn splice_lands_on_the_sentinel() {
        let mut inst = Instruction::with_steps("T", &[word(2), word(3)]).unwrap();
        let patch = [word(7), word(8), ControlWord::STEP_RESET];
        inst.splice_at_reset(&patch).unwrap();
        assert_eq!(word(3), inst.step(2));
        assert_eq!(word(7), inst.step(3));
        assert_eq!(word(8), inst.step(4));
        assert_eq!(ControlWord::STEP_RESET, inst.step(5));
    }

    #[test]
    fn splice_may_end_exactly_at_the_boundary() {
        let steps: Vec<ControlWord> = (0..12).map(|i| word(i)).collect();
        let mut inst = Instruction::with_steps("T", &steps).unwrap();
        assert_eq!(Some(13), inst.reset_index());
        let patch = [word(20), word(21), ControlWord::STEP_RESET];
        inst.splice_at_reset(&patch).unwrap();
        assert_eq!(ControlWord::STEP_RESET, inst.step(15));
    }

    #[test]
    fn splice_overflow_is_fatal() {
        let steps: Vec<ControlWord> = (0..13).map(|i| word(i)).collect();
        let mut inst = Instruction::with_steps("T", &steps).unwrap();
        assert_eq!(Some(14), inst.reset_index());
        let patch = [word(20), word(21), ControlWord::STEP_RESET];
        assert_eq!(
            Err(UcodeError::PatchOverflow {
                name: "T".to_string(),
                at: 14,
                needed: 3
            }),
            inst.splice_at_reset(&patch)
        );
    }

    #[test]
    fn splice_needs_a_sentinel() {
        let mut inst = Instruction::raw("T", [ControlWord::empty(); STEP_COUNT]);
        assert_eq!(
            Err(UcodeError::MissingResetSentinel {
                name: "T".to_string()
            }),
            inst.splice_at_reset(&[ControlWord::STEP_RESET])
        );
    }

    #[test]
    fn replace_tail_reseats_the_sentinel() {
        let steps: Vec<ControlWord> = (0..10).map(|i| word(i)).collect();
        let mut inst = Instruction::with_steps("T", &steps).unwrap();
        inst.replace_tail(&[word(30), ControlWord::STEP_RESET]).unwrap();
        assert_eq!(FETCH, inst.step(0));
        assert_eq!(word(30), inst.step(1));
        assert_eq!(ControlWord::STEP_RESET, inst.step(2));
        for i in 3..STEP_COUNT {
            assert!(inst.step(i).is_empty());
        }
    }

    #[test]
    fn opcodes_assigned_in_registration_order() {
        let mut b = TableBuilder::new();
        assert_eq!(0, b.register(Instruction::with_steps("A", &[]).unwrap()).unwrap());
        assert_eq!(1, b.register(Instruction::with_steps("B", &[]).unwrap()).unwrap());
        assert_eq!(2, b.register(Instruction::with_steps("C", &[]).unwrap()).unwrap());
    }

    #[test]
    fn released_slots_are_recycled() {
        let mut b = TableBuilder::new();
        b.register(Instruction::with_steps("A", &[]).unwrap()).unwrap();
        let spare = b.reserve().unwrap();
        b.register(Instruction::with_steps("B", &[]).unwrap()).unwrap();
        b.release(spare).unwrap();

        // the recycled slot is preferred over a fresh opcode
        let reused = b
            .register_recycled(Instruction::with_steps("C", &[]).unwrap())
            .unwrap();
        assert_eq!(spare, reused);

        // the pool is drained, so the counter advances again
        let next = b
            .register_recycled(Instruction::with_steps("D", &[]).unwrap())
            .unwrap();
        assert_eq!(3, next);

        let table = b.finish();
        assert_eq!("C", table.instruction(spare).name());
    }

    #[test]
    fn double_release_is_rejected() {
        let mut b = TableBuilder::new();
        let spare = b.reserve().unwrap();
        b.release(spare).unwrap();
        assert_eq!(Err(UcodeError::BadSlot { opcode: spare }), b.release(spare));
        // occupied slots cannot be released either
        let taken = b.register(Instruction::with_steps("A", &[]).unwrap()).unwrap();
        assert_eq!(Err(UcodeError::BadSlot { opcode: taken }), b.release(taken));
    }

    #[test]
    fn finish_fills_the_opcode_space() {
        let mut b = TableBuilder::new();
        b.register(Instruction::with_steps("A", &[]).unwrap()).unwrap();
        let spare = b.reserve().unwrap();
        b.release(spare).unwrap();

        let table = b.finish();
        assert_eq!(OPCODE_COUNT, table.instructions().len());
        assert_eq!(OPCODE_COUNT - 1, table.filler_count());
        assert!(!table.is_filler(0));
        assert!(table.is_filler(spare));

        // synthetic names keep opcode assignment injective
        let mut names: Vec<&str> = table.instructions().iter().map(|i| i.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(OPCODE_COUNT, names.len());
    }

    #[test]
    fn opcode_space_overflow_is_fatal() {
        let mut b = TableBuilder::new();
        for i in 0..OPCODE_COUNT {
            b.register(Instruction::with_steps(&format!("I{}", i), &[]).unwrap())
                .unwrap();
        }
        assert_eq!(
            Err(UcodeError::OpcodeSpaceExhausted {
                name: "X".to_string()
            }),
            b.register(Instruction::with_steps("X", &[]).unwrap())
        );
    }
}
