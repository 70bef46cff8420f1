//! Renders the instruction table as a customasm `#ruledef` block, so the
//! assembler's mnemonics stay in lockstep with the opcodes burned into the
//! control store.

use std::fmt::Write;

use crate::isa::InstructionSet;

pub fn ruledef(set: &InstructionSet) -> String {
    let mut out = String::new();
    out.push_str("#ruledef\n{\n");

    for (opcode, instruction) in set.table.instructions().iter().enumerate() {
        if set.table.is_filler(opcode as u8) {
            continue;
        }

        let mut tail = "";
        out.push_str("    ");
        for token in instruction.name().split_whitespace() {
            let rendered = if token.contains('@') {
                tail = "@ le(address)";
                token
                    .replace('@', "address: u16")
                    .replace('[', "{")
                    .replace(']', "}")
            } else if token == "#" {
                tail = "@ im";
                "{im: i8}".to_string()
            } else {
                token.to_string()
            };
            let _ = write!(out, "{:<5}", rendered);
        }
        let _ = writeln!(out, " => 0x{:02x} {}", opcode, tail);
    }

    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::instruction_set;

    #[test]
    fn renders_operand_captures() {
        let set = instruction_set().unwrap();
        let rules = ruledef(&set);

        assert!(rules.starts_with("#ruledef\n{\n"));
        assert!(rules.ends_with('}'));

        // absolute jump carries a 16-bit address capture
        let jmp = rules
            .lines()
            .find(|l| l.trim_start().starts_with("JMP  {address: u16}"))
            .unwrap();
        assert!(jmp.contains("@ le(address)"));

        // immediates capture a byte
        let mov = rules
            .lines()
            .find(|l| l.trim_start().starts_with("MOV  $A,"))
            .unwrap();
        assert!(mov.contains("{im: i8}"));
        assert!(mov.contains("@ im"));

        // bare mnemonics map straight to their opcode
        assert!(rules.lines().any(|l| l.trim() == "RST   => 0x00"));
        assert!(rules.lines().any(|l| l.trim() == "HLT   => 0xff"));
    }

    #[test]
    fn one_rule_per_real_opcode() {
        let set = instruction_set().unwrap();
        let rules = ruledef(&set);
        let body_lines = rules.lines().filter(|l| l.contains("=>")).count();
        assert_eq!(256 - set.table.filler_count(), body_lines);
    }
}
