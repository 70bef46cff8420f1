//! The instruction set itself: every opcode's micro-step sequence, registered
//! in table order. Step sequences follow the board's bus discipline: a source
//! enable and a destination write per cycle, ALU results staged through the
//! accumulator, 16-bit addresses staged through the transfer register.

use common::ControlWord as W;
use common::{GpRegister, GP4};

use crate::error::UcodeError;
use crate::table::{BaseTable, Instruction, TableBuilder};

/// The base table plus the opcodes the flag-matrix expander rewrites.
pub struct InstructionSet {
    pub table: BaseTable,

    pub reset_vector: u8,
    pub interrupt_entry: u8,

    pub jz: u8,
    pub jo: u8,
    pub jn: u8,
    pub jc: u8,
    pub jnz: u8,
    pub jno: u8,
    pub jp: u8,
    pub jnc: u8,
    pub jgz: u8,

    pub set_inhibit: u8,
    pub clear_inhibit: u8,
}

impl InstructionSet {
    pub fn template_opcodes(&self) -> [u8; 11] {
        [
            self.jz,
            self.jo,
            self.jn,
            self.jc,
            self.jnz,
            self.jno,
            self.jp,
            self.jnc,
            self.jgz,
            self.set_inhibit,
            self.clear_inhibit,
        ]
    }
}

const ALU_OPS: [(&str, W); 5] = [
    ("ADD", W::ALU_ADD),
    ("SUB", W::ALU_ACC_MINUS_BUS),
    ("AND", W::ALU_AND),
    ("OR", W::ALU_OR),
    ("XOR", W::ALU_XOR),
];

/// Copy a register onto the bus and capture it in the accumulator via the
/// shift register's mirror mode, freeing the bus for the second operand.
fn mirror(reg: GpRegister) -> [W; 2] {
    [reg.read_lines() | W::ALU_MIRROR_BUS, W::SHIFT_HOLD | W::ACC_WRITE]
}

/// dest = dest <op> immediate-at-PC
fn alu_imm(dest: GpRegister, alu: W) -> [W; 4] {
    let [m0, m1] = mirror(dest);
    [
        m0,
        m1,
        W::PC_ENABLE | W::MEM_ENABLE | alu | W::ACC_WRITE | W::FLAGS_WRITE,
        dest.write_lines() | W::ACC_ENABLE | W::PC_COUNT,
    ]
}

fn cmp_imm(dest: GpRegister) -> [W; 3] {
    let [m0, m1] = mirror(dest);
    [
        m0,
        m1,
        W::PC_ENABLE | W::MEM_ENABLE | W::ALU_ACC_MINUS_BUS | W::FLAGS_WRITE | W::PC_COUNT,
    ]
}

/// dest = dest <op> src
fn alu_reg(dest: GpRegister, src: GpRegister, alu: W) -> [W; 4] {
    let [m0, m1] = mirror(dest);
    [
        m0,
        m1,
        src.read_lines() | alu | W::FLAGS_WRITE | W::ACC_WRITE,
        dest.write_lines() | W::ACC_ENABLE,
    ]
}

fn cmp_reg(dest: GpRegister, src: GpRegister) -> [W; 3] {
    let [m0, m1] = mirror(dest);
    [m0, m1, src.read_lines() | W::ALU_ACC_MINUS_BUS | W::FLAGS_WRITE]
}

/// C:D into the transfer register, for [$CD] addressing.
fn xfer_from_cd() -> [W; 2] {
    [
        W::REG_C_ENABLE | W::XFER_LOW_WRITE,
        W::REG_D_ENABLE | W::XFER_HIGH_WRITE,
    ]
}

/// The two operand bytes at PC into the transfer register. Only the low read
/// bumps PC; absolute forms carry the second bump in a later step.
fn xfer_from_operand() -> [W; 2] {
    [
        W::PC_ENABLE | W::MEM_ENABLE | W::XFER_LOW_WRITE | W::PC_COUNT,
        W::PC_ENABLE | W::MEM_ENABLE | W::XFER_HIGH_WRITE,
    ]
}

/// dest = dest <op> mem[$CD]
fn alu_indirect(dest: GpRegister, alu: W) -> [W; 6] {
    let [x0, x1] = xfer_from_cd();
    let [m0, m1] = mirror(dest);
    [
        x0,
        x1,
        m0,
        m1,
        W::XFER_ENABLE | W::MEM_ENABLE | alu | W::ACC_WRITE | W::FLAGS_WRITE,
        dest.write_lines() | W::ACC_ENABLE,
    ]
}

fn cmp_indirect(dest: GpRegister) -> [W; 5] {
    let [x0, x1] = xfer_from_cd();
    let [m0, m1] = mirror(dest);
    [
        x0,
        x1,
        m0,
        m1,
        W::XFER_ENABLE | W::MEM_ENABLE | W::ALU_ACC_MINUS_BUS | W::FLAGS_WRITE,
    ]
}

/// dest = dest <op> mem[operand address]
fn alu_absolute(dest: GpRegister, alu: W) -> [W; 6] {
    let [x0, x1] = xfer_from_operand();
    let [m0, m1] = mirror(dest);
    [
        x0,
        x1,
        m0 | W::PC_COUNT,
        m1,
        W::XFER_ENABLE | W::MEM_ENABLE | alu | W::ACC_WRITE | W::FLAGS_WRITE,
        dest.write_lines() | W::ACC_ENABLE,
    ]
}

fn cmp_absolute(dest: GpRegister) -> [W; 5] {
    let [x0, x1] = xfer_from_operand();
    let [m0, m1] = mirror(dest);
    [
        x0,
        x1,
        m0 | W::PC_COUNT,
        m1,
        W::XFER_ENABLE | W::MEM_ENABLE | W::ALU_ACC_MINUS_BUS | W::FLAGS_WRITE,
    ]
}

fn shift(reg: GpRegister, dir: W) -> [W; 3] {
    [
        reg.read_lines() | dir | W::FLAGS_WRITE,
        W::SHIFT_HOLD | W::ACC_WRITE,
        reg.write_lines() | W::ACC_ENABLE,
    ]
}

fn shift_absolute(dir: W) -> [W; 5] {
    let [x0, x1] = xfer_from_operand();
    [
        x0,
        x1,
        W::XFER_ENABLE | W::MEM_ENABLE | dir | W::FLAGS_WRITE,
        W::SHIFT_HOLD | W::ACC_WRITE | W::PC_COUNT,
        W::XFER_ENABLE | W::ACC_ENABLE | W::MEM_WRITE,
    ]
}

fn shift_indirect(dir: W) -> [W; 5] {
    let [x0, x1] = xfer_from_cd();
    [
        x0,
        x1,
        W::XFER_ENABLE | W::MEM_ENABLE | dir | W::FLAGS_WRITE,
        W::SHIFT_HOLD | W::ACC_WRITE,
        W::XFER_ENABLE | W::ACC_ENABLE | W::MEM_WRITE,
    ]
}

/// The power-on sequence at opcode 0: zero the accumulator and every
/// register, park SP and the displays, shift a start address together, jump
/// to it, and re-enable interrupts. Built raw; the step counter wraps into
/// the trailing fetch.
fn reset_vector() -> Instruction {
    Instruction::raw(
        "RST",
        [
            W::ACC_WRITE | W::OLED_CLEAR,
            W::ACC_WRITE | W::OLED_CLEAR,
            W::ACC_ENABLE | W::REG_A_WRITE | W::XFER_LOW_WRITE | W::XFER_HIGH_WRITE | W::IR_LOAD | W::OLED_CLEAR,
            W::ACC_ENABLE | W::REG_C_WRITE | W::XFER_ENABLE | W::SP_LOAD | W::ALU_MIRROR_BUS | W::FLAGS_WRITE | W::OLED_CLEAR,
            W::ACC_ENABLE | W::SEG_DISPLAY_TEMP_WRITE | W::SP_COUNT | W::SP_DOWN,
            W::ACC_ENABLE | W::SEG_DISPLAY_WRITE | W::REG_B_WRITE | W::REG_D_WRITE | W::REG_E_WRITE | W::SHIFT_RIGHT | W::SHIFT_CARRY_IN,
            W::SHIFT_HOLD | W::ACC_WRITE,
            W::ACC_ENABLE | W::SHIFT_RIGHT | W::SHIFT_CARRY_IN,
            W::SHIFT_HOLD | W::ACC_WRITE,
            W::ACC_ENABLE | W::XFER_HIGH_WRITE,
            W::XFER_ENABLE | W::PC_WRITE,
            W::TOGGLE_INHIBIT,
            W::empty(),
            W::empty(),
            W::empty(),
            W::PC_ENABLE | W::MEM_ENABLE | W::IR_LOAD,
        ],
    )
}

pub fn instruction_set() -> Result<InstructionSet, UcodeError> {
    let mut b = TableBuilder::new();

    let reset = b.register(reset_vector())?;

    b.register(Instruction::with_steps("STC", &[W::FLAGS_SET_CARRY | W::FLAGS_WRITE])?)?;
    b.register(Instruction::with_steps("CLC", &[W::FLAGS_CLEAR_CARRY | W::FLAGS_WRITE])?)?;

    // immediate operand at PC
    for dest in GP4 {
        b.register(Instruction::with_steps(
            &format!("MOV ${}, #", dest),
            &[W::PC_ENABLE | W::MEM_ENABLE | dest.write_lines() | W::PC_COUNT],
        )?)?;
        for (op, alu) in ALU_OPS {
            b.register(Instruction::with_steps(&format!("{} ${}, #", op, dest), &alu_imm(dest, alu))?)?;
        }
        b.register(Instruction::with_steps(&format!("CMP ${}, #", dest), &cmp_imm(dest))?)?;
    }

    // immediate with E
    b.register(Instruction::with_steps(
        "MOV $E, #",
        &[W::PC_ENABLE | W::MEM_ENABLE | W::REG_E_WRITE | W::PC_COUNT],
    )?)?;
    b.register(Instruction::with_steps("ADD $E, #", &alu_imm(GpRegister::E, W::ALU_ADD))?)?;
    b.register(Instruction::with_steps("SUB $E, #", &alu_imm(GpRegister::E, W::ALU_ACC_MINUS_BUS))?)?;
    b.register(Instruction::with_steps("CMP $E, #", &cmp_imm(GpRegister::E))?)?;

    // register moves and compares through E
    for reg in GP4 {
        b.register(Instruction::with_steps(
            &format!("MOV ${}, $E", reg),
            &[reg.write_lines() | W::REG_E_ENABLE],
        )?)?;
        b.register(Instruction::with_steps(
            &format!("MOV $E, ${}", reg),
            &[W::REG_E_WRITE | reg.read_lines()],
        )?)?;
        b.register(Instruction::with_steps(
            &format!("CMP $E, ${}", reg),
            &cmp_reg(GpRegister::E, reg),
        )?)?;
    }

    // clock control
    b.register(Instruction::with_steps(
        "MOV $CLK, #",
        &[W::PC_ENABLE | W::MEM_ENABLE | W::CLOCK_SELECT, W::PC_COUNT],
    )?)?;
    b.register(Instruction::with_steps("MOV $CLK, $E", &[W::CLOCK_SELECT | W::REG_E_ENABLE])?)?;

    // register to register; a register moved to itself stays out of the table
    for dest in GP4 {
        for src in GP4 {
            if dest == src {
                continue;
            }
            b.register(Instruction::with_steps(
                &format!("MOV ${}, ${}", dest, src),
                &[dest.write_lines() | src.read_lines()],
            )?)?;
            for (op, alu) in ALU_OPS {
                b.register(Instruction::with_steps(
                    &format!("{} ${}, ${}", op, dest, src),
                    &alu_reg(dest, src, alu),
                )?)?;
            }
            b.register(Instruction::with_steps(
                &format!("CMP ${}, ${}", dest, src),
                &cmp_reg(dest, src),
            )?)?;
        }
    }

    // indirect through C:D
    for dest in GP4 {
        let [x0, x1] = xfer_from_cd();
        b.register(Instruction::with_steps(
            &format!("MOV ${}, [$CD]", dest),
            &[x0, x1, W::XFER_ENABLE | W::MEM_ENABLE | dest.write_lines()],
        )?)?;
        b.register(Instruction::with_steps(
            &format!("MOV [$CD], ${}", dest),
            &[x0, x1, W::XFER_ENABLE | W::MEM_WRITE | dest.read_lines()],
        )?)?;
        for (op, alu) in ALU_OPS {
            b.register(Instruction::with_steps(
                &format!("{} ${}, [$CD]", op, dest),
                &alu_indirect(dest, alu),
            )?)?;
        }
        b.register(Instruction::with_steps(&format!("CMP ${}, [$CD]", dest), &cmp_indirect(dest))?)?;
    }

    // absolute operand address
    for dest in GP4 {
        let [x0, x1] = xfer_from_operand();
        b.register(Instruction::with_steps(
            &format!("MOV ${}, [@]", dest),
            &[x0, x1, W::XFER_ENABLE | W::MEM_ENABLE | dest.write_lines() | W::PC_COUNT],
        )?)?;
        b.register(Instruction::with_steps(
            &format!("MOV [@], ${}", dest),
            &[x0, x1, W::XFER_ENABLE | W::MEM_WRITE | dest.read_lines() | W::PC_COUNT],
        )?)?;
        for (op, alu) in ALU_OPS {
            b.register(Instruction::with_steps(
                &format!("{} ${}, [@]", op, dest),
                &alu_absolute(dest, alu),
            )?)?;
        }
        b.register(Instruction::with_steps(&format!("CMP ${}, [@]", dest), &cmp_absolute(dest))?)?;
    }

    // segmented display, low then high byte
    for reg in [GpRegister::A, GpRegister::B] {
        b.register(Instruction::with_steps(
            &format!("SDL ${}", reg),
            &[reg.read_lines() | W::SEG_DISPLAY_TEMP_WRITE],
        )?)?;
    }
    for reg in [GpRegister::A, GpRegister::B] {
        b.register(Instruction::with_steps(
            &format!("SDH ${}", reg),
            &[reg.read_lines() | W::SEG_DISPLAY_WRITE],
        )?)?;
    }

    // port selector
    b.register(Instruction::with_steps(
        "OUT #, RA",
        &[
            W::PC_ENABLE | W::MEM_ENABLE | W::PORT_SELECT | W::PC_COUNT,
            W::REG_A_ENABLE | W::PORT_WRITE,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "INP RA, #",
        &[
            W::PC_ENABLE | W::MEM_ENABLE | W::PORT_SELECT | W::PC_COUNT,
            W::REG_A_WRITE | W::PORT_ENABLE,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "OUT RB, RA",
        &[W::REG_B_ENABLE | W::PORT_SELECT, W::REG_A_ENABLE | W::PORT_WRITE],
    )?)?;
    b.register(Instruction::with_steps(
        "INP RA, RB",
        &[W::REG_B_ENABLE | W::PORT_SELECT, W::REG_A_WRITE | W::PORT_ENABLE],
    )?)?;

    // OLED display
    b.register(Instruction::with_steps(
        "OLR",
        &[W::OLED_CLEAR, W::OLED_CLEAR, W::OLED_CLEAR, W::OLED_CLEAR, W::OLED_CLEAR, W::OLED_CLEAR],
    )?)?;
    b.register(Instruction::with_steps(
        "OLD #",
        &[
            W::PC_ENABLE | W::MEM_ENABLE,
            W::OLED_ENABLE | W::PC_ENABLE | W::MEM_ENABLE | W::PC_COUNT,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "OLC #",
        &[
            W::OLED_SELECT | W::PC_ENABLE | W::MEM_ENABLE,
            W::OLED_ENABLE | W::OLED_SELECT | W::PC_ENABLE | W::MEM_ENABLE | W::PC_COUNT,
        ],
    )?)?;
    for reg in [GpRegister::A, GpRegister::B] {
        b.register(Instruction::with_steps(
            &format!("OLD ${}", reg),
            &[reg.read_lines(), W::OLED_ENABLE | reg.read_lines()],
        )?)?;
    }
    for reg in [GpRegister::A, GpRegister::B] {
        b.register(Instruction::with_steps(
            &format!("OLC ${}", reg),
            &[
                W::OLED_SELECT | reg.read_lines(),
                W::OLED_SELECT | W::OLED_ENABLE | reg.read_lines(),
            ],
        )?)?;
    }

    // logical shifts
    for src in GP4 {
        b.register(Instruction::with_steps(&format!("LSL ${}", src), &shift(src, W::SHIFT_LEFT))?)?;
    }
    b.register(Instruction::with_steps("LSL [@]", &shift_absolute(W::SHIFT_LEFT))?)?;
    b.register(Instruction::with_steps("LSL [$CD]", &shift_indirect(W::SHIFT_LEFT))?)?;
    for src in GP4 {
        b.register(Instruction::with_steps(&format!("LSR ${}", src), &shift(src, W::SHIFT_RIGHT))?)?;
    }
    b.register(Instruction::with_steps("LSR [@]", &shift_absolute(W::SHIFT_RIGHT))?)?;
    b.register(Instruction::with_steps("LSR [$CD]", &shift_indirect(W::SHIFT_RIGHT))?)?;

    // stack push/pull
    for reg in GP4 {
        b.register(Instruction::with_steps(
            &format!("PSH ${}", reg),
            &[
                reg.read_lines() | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
                W::SP_COUNT | W::SP_DOWN,
            ],
        )?)?;
        b.register(Instruction::with_steps(
            &format!("PUL ${}", reg),
            &[W::SP_COUNT, reg.write_lines() | W::SP_ENABLE | W::MEM_ENABLE],
        )?)?;
    }
    b.register(Instruction::with_steps(
        "PSF",
        &[
            W::FLAGS_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
            W::SP_COUNT | W::SP_DOWN,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "PLF",
        &[
            W::SP_COUNT | W::ACC_WRITE,
            W::SP_ENABLE | W::MEM_ENABLE | W::ALU_OR | W::FLAGS_WRITE,
        ],
    )?)?;

    // stack pointer moves
    b.register(Instruction::with_steps(
        "MOV $SP, $CD",
        &[
            W::REG_C_ENABLE | W::XFER_LOW_WRITE,
            W::REG_D_ENABLE | W::XFER_HIGH_WRITE,
            W::XFER_ENABLE | W::SP_LOAD,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "MOV $CD, $SP",
        &[
            W::SP_LOW_ENABLE | W::REG_C_WRITE,
            W::SP_HIGH_ENABLE | W::REG_D_WRITE,
        ],
    )?)?;

    // jumps and subroutines
    b.register(Instruction::with_steps(
        "JMP [@]",
        &[
            W::PC_ENABLE | W::MEM_ENABLE | W::XFER_LOW_WRITE | W::PC_COUNT,
            W::PC_ENABLE | W::MEM_ENABLE | W::XFER_HIGH_WRITE,
            W::XFER_ENABLE | W::PC_WRITE,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "JSR [@]",
        &[
            W::PC_ENABLE | W::MEM_ENABLE | W::XFER_LOW_WRITE | W::PC_COUNT,
            W::PC_ENABLE | W::MEM_ENABLE | W::XFER_HIGH_WRITE | W::PC_COUNT,
            W::PC_LOW_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
            W::SP_COUNT | W::SP_DOWN,
            W::PC_HIGH_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
            W::XFER_ENABLE | W::PC_WRITE | W::SP_COUNT | W::SP_DOWN,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "JMP [$CD]",
        &[
            W::REG_C_ENABLE | W::XFER_LOW_WRITE,
            W::REG_D_ENABLE | W::XFER_HIGH_WRITE,
            W::XFER_ENABLE | W::PC_WRITE,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "JSR [$CD]",
        &[
            W::REG_C_ENABLE | W::XFER_LOW_WRITE,
            W::REG_D_ENABLE | W::XFER_HIGH_WRITE,
            W::PC_LOW_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
            W::SP_COUNT | W::SP_DOWN,
            W::PC_HIGH_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
            W::XFER_ENABLE | W::PC_WRITE | W::SP_COUNT | W::SP_DOWN,
        ],
    )?)?;
    b.register(Instruction::with_steps(
        "RTS",
        &[
            W::SP_COUNT,
            W::XFER_HIGH_WRITE | W::SP_ENABLE | W::MEM_ENABLE,
            W::SP_COUNT,
            W::XFER_LOW_WRITE | W::SP_ENABLE | W::MEM_ENABLE,
            W::XFER_ENABLE | W::PC_WRITE,
        ],
    )?)?;

    // conditional jumps: the base body falls through, skipping the two
    // operand bytes; the expander installs the taken body per flag state
    let jz = b.register(Instruction::with_steps("JZ [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jo = b.register(Instruction::with_steps("JO [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jn = b.register(Instruction::with_steps("JN [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jc = b.register(Instruction::with_steps("JC [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jnz = b.register(Instruction::with_steps("JNZ [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jno = b.register(Instruction::with_steps("JNO [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jp = b.register(Instruction::with_steps("JP [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jnc = b.register(Instruction::with_steps("JNC [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;
    let jgz = b.register(Instruction::with_steps("JGZ [@]", &[W::PC_COUNT, W::PC_COUNT])?)?;

    // inhibit toggles: no-ops in the base table, made live per flag state
    let sii = b.register(Instruction::with_steps("SII", &[])?)?;
    let cii = b.register(Instruction::with_steps("CII", &[])?)?;

    // interrupt entry: push flags and the return address, mask further
    // requests, vector through the table at the transfer register
    let itr = b.register(Instruction::with_steps(
        "ITR",
        &[
            W::TOGGLE_INHIBIT | W::FLAGS_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::ALU_ALL_ONES | W::ACC_WRITE | W::SP_DOWN,
            W::ACC_ENABLE | W::SHIFT_LEFT | W::XFER_HIGH_WRITE | W::SP_COUNT | W::SP_DOWN,
            W::PC_LOW_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SHIFT_HOLD | W::ACC_WRITE | W::SP_DOWN,
            W::ACC_ENABLE | W::XFER_LOW_WRITE | W::SP_COUNT | W::SP_DOWN,
            W::PC_HIGH_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::ALU_ALL_ONES | W::ACC_WRITE | W::SP_DOWN,
            W::XFER_ENABLE | W::MEM_ENABLE | W::ALU_AND | W::ACC_WRITE | W::SP_COUNT | W::SP_DOWN,
            W::ACC_ENABLE | W::SP_ENABLE | W::MEM_WRITE | W::SP_DOWN,
            W::ALU_ALL_ONES | W::ACC_WRITE,
            W::ACC_ENABLE | W::XFER_LOW_WRITE,
            W::XFER_ENABLE | W::MEM_ENABLE | W::ALU_AND | W::ACC_WRITE,
            W::ACC_ENABLE | W::XFER_HIGH_WRITE,
            W::SP_ENABLE | W::MEM_ENABLE | W::XFER_LOW_WRITE,
            W::XFER_ENABLE | W::PC_WRITE | W::FLAGS_CLEAR_CARRY | W::FLAGS_WRITE,
        ],
    )?)?;

    b.register(Instruction::with_steps(
        "RTI",
        &[
            W::SP_COUNT,
            W::XFER_HIGH_WRITE | W::SP_ENABLE | W::MEM_ENABLE,
            W::SP_COUNT,
            W::XFER_LOW_WRITE | W::SP_ENABLE | W::MEM_ENABLE,
            W::XFER_ENABLE | W::PC_WRITE | W::SP_COUNT,
            W::SP_ENABLE | W::MEM_ENABLE | W::ALU_MIRROR_BUS | W::FLAGS_WRITE | W::TOGGLE_INHIBIT,
        ],
    )?)?;

    b.register(Instruction::with_steps("NOP", &[])?)?;
    b.register(Instruction::with_steps("HLT", &[W::HALT])?)?;

    Ok(InstructionSet {
        table: b.finish(),
        reset_vector: reset,
        interrupt_entry: itr,
        jz,
        jo,
        jn,
        jc,
        jnz,
        jno,
        jp,
        jnc,
        jgz,
        set_inhibit: sii,
        clear_inhibit: cii,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FETCH, OPCODE_COUNT};

    #[test]
    fn table_fills_the_opcode_space_exactly() {
        let set = instruction_set().unwrap();
        assert_eq!(OPCODE_COUNT, set.table.instructions().len());
        assert_eq!(0, set.table.filler_count());
    }

    #[test]
    fn names_are_unique() {
        let set = instruction_set().unwrap();
        let mut names: Vec<&str> = set.table.instructions().iter().map(|i| i.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(OPCODE_COUNT, names.len());
    }

    #[test]
    fn well_known_opcodes() {
        let set = instruction_set().unwrap();
        assert_eq!(0x00, set.reset_vector);
        assert_eq!(Some(0x01), set.table.opcode_of("STC"));
        assert_eq!(Some(0x02), set.table.opcode_of("CLC"));
        assert_eq!(0xF1, set.jz);
        assert_eq!(0xF9, set.jgz);
        assert_eq!(0xFA, set.set_inhibit);
        assert_eq!(0xFB, set.clear_inhibit);
        assert_eq!(0xFC, set.interrupt_entry);
        assert_eq!(Some(0xFD), set.table.opcode_of("RTI"));
        assert_eq!(Some(0xFE), set.table.opcode_of("NOP"));
        assert_eq!(Some(0xFF), set.table.opcode_of("HLT"));
    }

    #[test]
    fn every_table_built_instruction_starts_with_fetch() {
        let set = instruction_set().unwrap();
        for (opcode, inst) in set.table.instructions().iter().enumerate() {
            if opcode as u8 == set.reset_vector {
                continue;
            }
            assert_eq!(FETCH, inst.step(0), "{}", inst.name());
        }
    }

    #[test]
    fn every_table_built_instruction_carries_one_sentinel() {
        let set = instruction_set().unwrap();
        for (opcode, inst) in set.table.instructions().iter().enumerate() {
            if opcode as u8 == set.reset_vector {
                continue;
            }
            let sentinels = inst
                .steps()
                .iter()
                .filter(|s| **s == W::STEP_RESET)
                .count();
            assert_eq!(1, sentinels, "{}", inst.name());
        }
    }

    #[test]
    fn halt_asserts_the_halt_line() {
        let set = instruction_set().unwrap();
        let hlt = set.table.opcode_of("HLT").unwrap();
        let inst = set.table.instruction(hlt);
        assert_eq!(W::HALT, inst.step(1));
        assert_eq!(W::STEP_RESET, inst.step(2));
    }

    #[test]
    fn templates_are_distinct() {
        let set = instruction_set().unwrap();
        let mut ops = set.template_opcodes().to_vec();
        ops.push(set.reset_vector);
        ops.push(set.interrupt_entry);
        ops.sort_unstable();
        ops.dedup();
        assert_eq!(13, ops.len());
    }
}
