extern crate strum;
#[macro_use]
extern crate strum_macros;

extern crate packed_struct;
extern crate packed_struct_codegen;
use packed_struct::prelude::*;

#[macro_use]
extern crate bitflags;

bitflags! {
    pub struct Flags: u8 {
        const CARRY = 0b000001;
        const NEG = 0b000010;
        const OVERFLOW = 0b000100;
        const ZERO = 0b001000;
        const IRQ = 0b010000;
        const INHIBIT = 0b100000;
    }
}

pub const WORD_BITS: u32 = 48;
pub const ADDRESS_BITS: u32 = 18;
pub const ROM_COUNT: usize = 3;
pub const ROM_WORD_BITS: u32 = 16;
pub const ROM_WORDS: usize = 1 << ADDRESS_BITS;
pub const ROM_BYTES: usize = ROM_WORDS * 2;

bitflags! {
    pub struct ControlWord: u64 {
        // ROM 0
        const OLED_CLEAR         = 1 << 0;  // active low
        const OLED_ENABLE        = 1 << 1;  // active low
        const OLED_READ          = 1 << 2;
        const OLED_SELECT        = 1 << 3;  // active low, command when asserted
        const TOGGLE_INHIBIT     = 1 << 4;  // flips the interrupt-inhibit flip-flop
        const IR_LOAD            = 1 << 5;
        const FLAGS_WRITE        = 1 << 6;  // active low
        const ALU_1              = 1 << 7;
        const ALU_2              = 1 << 8;
        const ALU_SELECT         = 1 << 9;  // 0: '382 function ALU, 1: '194 shift register
        const SHIFT_CLEAR        = 1 << 10; // active low
        const SEG_DISPLAY_ENABLE = 1 << 11;
        const SHIFT_CARRY_IN     = 1 << 12;
        const REG_B_WRITE        = 1 << 13; // active low
        const REG_D_WRITE        = 1 << 14; // active low
        const CLOCK_SELECT       = 1 << 15; // active low

        // ROM 1
        const SP_COUNT           = 1 << 16; // active low
        const SP_DOWN            = 1 << 17;
        const SP_LOAD            = 1 << 18;
        const HALT               = 1 << 19;
        const PORT_WRITE         = 1 << 20; // active low
        const PORT_ENABLE        = 1 << 21; // active low
        const AUX_2              = 1 << 22;
        const REG_E_WRITE        = 1 << 23;
        const REG_E_ENABLE       = 1 << 24; // active low
        const PC_LOW_ENABLE      = 1 << 25; // active low
        const PC_HIGH_ENABLE     = 1 << 26; // active low
        const XFER_LOW_WRITE     = 1 << 27;
        const STEP_RESET         = 1 << 28; // active low
        const ALU_0              = 1 << 29;
        const SEG_DISPLAY_SIGNED = 1 << 30;
        const AUX                = 1 << 31;

        // ROM 2
        const READ_0             = 1 << 32;
        const READ_1             = 1 << 33;
        const READ_2             = 1 << 34;
        const READ_3             = 1 << 35;
        const WRITE_0            = 1 << 36;
        const WRITE_1            = 1 << 37;
        const WRITE_2            = 1 << 38;
        const PORT_SELECT        = 1 << 39; // active low
        const PC_WRITE           = 1 << 40; // active low
        const PC_COUNT           = 1 << 41;
        const PC_ENABLE          = 1 << 42; // active low
        const XFER_ENABLE        = 1 << 43; // active low
        const ACC_WRITE          = 1 << 44;
        const MEM_WRITE          = 1 << 45; // active low
        const XFER_HIGH_WRITE    = 1 << 46;
        const SP_ENABLE          = 1 << 47; // active low

        // 74HCT238 3-to-8 non-inverting write decoder
        const SEG_DISPLAY_WRITE      = Self::WRITE_2.bits | Self::WRITE_1.bits | Self::WRITE_0.bits;
        const REG_I_WRITE            = Self::WRITE_2.bits | Self::WRITE_1.bits;
        const SEG_DISPLAY_TEMP_WRITE = Self::WRITE_2.bits | Self::WRITE_0.bits;
        const REG_C_WRITE            = Self::WRITE_1.bits | Self::WRITE_0.bits;
        const REG_A_WRITE            = Self::WRITE_1.bits;

        // 74HCT154 4-to-16 inverting read decoder
        const ACC_ENABLE       = Self::READ_3.bits | Self::READ_2.bits | Self::READ_1.bits | Self::READ_0.bits;
        const REG_D_ENABLE     = Self::READ_3.bits | Self::READ_2.bits | Self::READ_1.bits;
        const REG_C_ENABLE     = Self::READ_3.bits | Self::READ_2.bits | Self::READ_0.bits;
        const REG_A_ENABLE     = Self::READ_3.bits | Self::READ_2.bits;
        const REG_B_ENABLE     = Self::READ_3.bits | Self::READ_1.bits | Self::READ_0.bits;
        const FLAGS_ENABLE     = Self::READ_3.bits | Self::READ_1.bits;
        const XFER_HIGH_ENABLE = Self::READ_3.bits | Self::READ_0.bits;
        const XFER_LOW_ENABLE  = Self::READ_3.bits;
        const SP_HIGH_ENABLE   = Self::READ_2.bits | Self::READ_1.bits | Self::READ_0.bits;
        const SP_LOW_ENABLE    = Self::READ_2.bits | Self::READ_1.bits;
        const REG_I_ENABLE     = Self::READ_2.bits | Self::READ_0.bits;
        const MEM_ENABLE       = Self::READ_2.bits;

        // '382 ALU function select (ALU_ZERO is the all-clear encoding)
        const ALU_ACC_MINUS_BUS = Self::ALU_0.bits;
        const ALU_BUS_MINUS_ACC = Self::ALU_1.bits;
        const ALU_ADD           = Self::ALU_1.bits | Self::ALU_0.bits;
        const ALU_XOR           = Self::ALU_2.bits;
        const ALU_OR            = Self::ALU_2.bits | Self::ALU_0.bits;
        const ALU_AND           = Self::ALU_2.bits | Self::ALU_1.bits;
        const ALU_ALL_ONES      = Self::ALU_2.bits | Self::ALU_1.bits | Self::ALU_0.bits;

        // '194 shift register select
        const SHIFT_HOLD       = Self::ALU_SELECT.bits;
        const SHIFT_LEFT       = Self::ALU_SELECT.bits | Self::ALU_0.bits;
        const SHIFT_RIGHT      = Self::ALU_SELECT.bits | Self::ALU_1.bits;
        const ALU_MIRROR_BUS   = Self::ALU_SELECT.bits | Self::ALU_1.bits | Self::ALU_0.bits;
        const FLAGS_CLEAR_CARRY = Self::ALU_SELECT.bits | Self::ALU_2.bits;
        const FLAGS_SET_CARRY   = Self::ALU_SELECT.bits | Self::ALU_2.bits | Self::ALU_0.bits;

        // fetch cycle: PC onto the address bus, the addressed byte into the
        // instruction register, bump PC
        const FETCH = Self::PC_ENABLE.bits
            | Self::MEM_ENABLE.bits
            | Self::IR_LOAD.bits
            | Self::PC_COUNT.bits;

        // Lines that idle high on the physical board. SEG_DISPLAY_ENABLE is
        // deliberately absent: the board does not invert it.
        const ACTIVE_LOW = Self::OLED_CLEAR.bits
            | Self::OLED_ENABLE.bits
            | Self::OLED_SELECT.bits
            | Self::FLAGS_WRITE.bits
            | Self::SHIFT_CLEAR.bits
            | Self::REG_B_WRITE.bits
            | Self::REG_D_WRITE.bits
            | Self::CLOCK_SELECT.bits
            | Self::SP_COUNT.bits
            | Self::PORT_WRITE.bits
            | Self::PORT_ENABLE.bits
            | Self::REG_E_ENABLE.bits
            | Self::PC_LOW_ENABLE.bits
            | Self::PC_HIGH_ENABLE.bits
            | Self::STEP_RESET.bits
            | Self::PORT_SELECT.bits
            | Self::PC_WRITE.bits
            | Self::PC_ENABLE.bits
            | Self::XFER_ENABLE.bits
            | Self::MEM_WRITE.bits
            | Self::SP_ENABLE.bits;
    }
}

impl ControlWord {
    /// Every discrete control line, in bit order 0..48.
    pub const LINES: [ControlWord; WORD_BITS as usize] = [
        ControlWord::OLED_CLEAR,
        ControlWord::OLED_ENABLE,
        ControlWord::OLED_READ,
        ControlWord::OLED_SELECT,
        ControlWord::TOGGLE_INHIBIT,
        ControlWord::IR_LOAD,
        ControlWord::FLAGS_WRITE,
        ControlWord::ALU_1,
        ControlWord::ALU_2,
        ControlWord::ALU_SELECT,
        ControlWord::SHIFT_CLEAR,
        ControlWord::SEG_DISPLAY_ENABLE,
        ControlWord::SHIFT_CARRY_IN,
        ControlWord::REG_B_WRITE,
        ControlWord::REG_D_WRITE,
        ControlWord::CLOCK_SELECT,
        ControlWord::SP_COUNT,
        ControlWord::SP_DOWN,
        ControlWord::SP_LOAD,
        ControlWord::HALT,
        ControlWord::PORT_WRITE,
        ControlWord::PORT_ENABLE,
        ControlWord::AUX_2,
        ControlWord::REG_E_WRITE,
        ControlWord::REG_E_ENABLE,
        ControlWord::PC_LOW_ENABLE,
        ControlWord::PC_HIGH_ENABLE,
        ControlWord::XFER_LOW_WRITE,
        ControlWord::STEP_RESET,
        ControlWord::ALU_0,
        ControlWord::SEG_DISPLAY_SIGNED,
        ControlWord::AUX,
        ControlWord::READ_0,
        ControlWord::READ_1,
        ControlWord::READ_2,
        ControlWord::READ_3,
        ControlWord::WRITE_0,
        ControlWord::WRITE_1,
        ControlWord::WRITE_2,
        ControlWord::PORT_SELECT,
        ControlWord::PC_WRITE,
        ControlWord::PC_COUNT,
        ControlWord::PC_ENABLE,
        ControlWord::XFER_ENABLE,
        ControlWord::ACC_WRITE,
        ControlWord::MEM_WRITE,
        ControlWord::XFER_HIGH_WRITE,
        ControlWord::SP_ENABLE,
    ];

    pub fn is_active_low(line: ControlWord) -> bool {
        ControlWord::ACTIVE_LOW.contains(line)
    }

    /// Flips the active-low lines so that an internally asserted bit comes
    /// out at its physical level. Applied exactly once, at emission.
    pub fn normalized(self) -> ControlWord {
        ControlWord::from_bits_truncate(self.bits() ^ ControlWord::ACTIVE_LOW.bits())
    }

    /// The 16-bit slice of this word burned into the given ROM chip.
    pub fn rom_word(self, rom: usize) -> u16 {
        assert!(rom < ROM_COUNT);
        ((self.bits() >> (ROM_WORD_BITS as usize * rom)) & 0xFFFF) as u16
    }
}

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
pub enum GpRegister {
    A,
    B,
    C,
    D,
    E,
}

impl GpRegister {
    /// B, D, and E have discrete write lines; A and C go through the write decoder.
    pub fn write_lines(self) -> ControlWord {
        match self {
            GpRegister::A => ControlWord::REG_A_WRITE,
            GpRegister::B => ControlWord::REG_B_WRITE,
            GpRegister::C => ControlWord::REG_C_WRITE,
            GpRegister::D => ControlWord::REG_D_WRITE,
            GpRegister::E => ControlWord::REG_E_WRITE,
        }
    }

    pub fn read_lines(self) -> ControlWord {
        match self {
            GpRegister::A => ControlWord::REG_A_ENABLE,
            GpRegister::B => ControlWord::REG_B_ENABLE,
            GpRegister::C => ControlWord::REG_C_ENABLE,
            GpRegister::D => ControlWord::REG_D_ENABLE,
            GpRegister::E => ControlWord::REG_E_ENABLE,
        }
    }
}

/// The four registers reachable by the two-operand ALU instructions.
pub const GP4: [GpRegister; 4] = [GpRegister::A, GpRegister::B, GpRegister::C, GpRegister::D];

#[derive(Debug, PartialEq, PackedStruct)]
#[packed_struct(size_bytes = "3", endian = "lsb", bit_numbering = "lsb0")]
pub struct RomAddress {
    #[packed_field(bits = "0..=5")]
    pub flags: Integer<u8, packed_bits::Bits::<6>>,
    #[packed_field(bits = "6..=9")]
    pub step: Integer<u8, packed_bits::Bits::<4>>,
    #[packed_field(bits = "10..=17")]
    pub opcode: u8,
}

impl RomAddress {
    pub fn new(opcode: u8, step: u8, flags: Flags) -> RomAddress {
        RomAddress {
            flags: flags.bits().into(),
            step: step.into(),
            opcode,
        }
    }

    pub fn pack_lsb(&self) -> [u8; 3] {
        let bytes = self.pack().unwrap();
        [bytes[2], bytes[1], bytes[0]]
    }

    pub fn to_index(&self) -> u32 {
        let bytes = self.pack_lsb();
        let bytes = [bytes[0], bytes[1], bytes[2], 0];
        u32::from_le_bytes(bytes)
    }

    pub fn from_index(index: u32) -> RomAddress {
        let bytes = index.to_le_bytes();
        assert_eq!(0, bytes[3]);
        let bytes = [bytes[2], bytes[1], bytes[0]];
        RomAddress::unpack(&bytes).unwrap()
    }
}
