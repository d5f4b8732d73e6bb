//! The 256-entry opcode decode table: opcode byte -> (mnemonic, addressing
//! mode, cycle timing). Built once as a const array and indexed directly by
//! the fetched opcode byte.

use super::addressing::Addressing as A;
use super::mnemonic::Mnemonic as M;
use super::timing::Timing;
use super::timing::Timing::{Branch, Fixed, PageCross};

pub struct Opcode {
    pub mnemonic: M,
    pub addressing: A,
    pub timing: Timing,
}

const fn op(mnemonic: M, addressing: A, timing: Timing) -> Opcode {
    Opcode {
        mnemonic,
        addressing,
        timing,
    }
}

pub static OPCODE_TABLE: [Opcode; 256] = [
    /* 0x00 */ op(M::BRK, A::Implied, Fixed(7)),
    /* 0x01 */ op(M::ORA, A::IndexedIndirect, Fixed(6)),
    /* 0x02 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x03 */ op(M::SLO, A::IndexedIndirect, Fixed(8)),
    /* 0x04 */ op(M::NOP, A::ZeroPage, Fixed(3)),
    /* 0x05 */ op(M::ORA, A::ZeroPage, Fixed(3)),
    /* 0x06 */ op(M::ASL, A::ZeroPage, Fixed(5)),
    /* 0x07 */ op(M::SLO, A::ZeroPage, Fixed(5)),
    /* 0x08 */ op(M::PHP, A::Implied, Fixed(3)),
    /* 0x09 */ op(M::ORA, A::Immediate, Fixed(2)),
    /* 0x0A */ op(M::ASL, A::Accumulator, Fixed(2)),
    /* 0x0B */ op(M::ANC, A::Immediate, Fixed(2)),
    /* 0x0C */ op(M::NOP, A::Absolute, Fixed(4)),
    /* 0x0D */ op(M::ORA, A::Absolute, Fixed(4)),
    /* 0x0E */ op(M::ASL, A::Absolute, Fixed(6)),
    /* 0x0F */ op(M::SLO, A::Absolute, Fixed(6)),
    /* 0x10 */ op(M::BPL, A::Relative, Branch(2)),
    /* 0x11 */ op(M::ORA, A::IndirectIndexed, PageCross(5)),
    /* 0x12 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x13 */ op(M::SLO, A::IndirectIndexed, Fixed(8)),
    /* 0x14 */ op(M::NOP, A::ZeroPageX, Fixed(4)),
    /* 0x15 */ op(M::ORA, A::ZeroPageX, Fixed(4)),
    /* 0x16 */ op(M::ASL, A::ZeroPageX, Fixed(6)),
    /* 0x17 */ op(M::SLO, A::ZeroPageX, Fixed(6)),
    /* 0x18 */ op(M::CLC, A::Implied, Fixed(2)),
    /* 0x19 */ op(M::ORA, A::AbsoluteY, PageCross(4)),
    /* 0x1A */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0x1B */ op(M::SLO, A::AbsoluteY, Fixed(7)),
    /* 0x1C */ op(M::NOP, A::AbsoluteX, PageCross(4)),
    /* 0x1D */ op(M::ORA, A::AbsoluteX, PageCross(4)),
    /* 0x1E */ op(M::ASL, A::AbsoluteX, Fixed(7)),
    /* 0x1F */ op(M::SLO, A::AbsoluteX, Fixed(7)),
    /* 0x20 */ op(M::JSR, A::Absolute, Fixed(6)),
    /* 0x21 */ op(M::AND, A::IndexedIndirect, Fixed(6)),
    /* 0x22 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x23 */ op(M::RLA, A::IndexedIndirect, Fixed(8)),
    /* 0x24 */ op(M::BIT, A::ZeroPage, Fixed(3)),
    /* 0x25 */ op(M::AND, A::ZeroPage, Fixed(3)),
    /* 0x26 */ op(M::ROL, A::ZeroPage, Fixed(5)),
    /* 0x27 */ op(M::RLA, A::ZeroPage, Fixed(5)),
    /* 0x28 */ op(M::PLP, A::Implied, Fixed(4)),
    /* 0x29 */ op(M::AND, A::Immediate, Fixed(2)),
    /* 0x2A */ op(M::ROL, A::Accumulator, Fixed(2)),
    /* 0x2B */ op(M::ANC, A::Immediate, Fixed(2)),
    /* 0x2C */ op(M::BIT, A::Absolute, Fixed(4)),
    /* 0x2D */ op(M::AND, A::Absolute, Fixed(4)),
    /* 0x2E */ op(M::ROL, A::Absolute, Fixed(6)),
    /* 0x2F */ op(M::RLA, A::Absolute, Fixed(6)),
    /* 0x30 */ op(M::BMI, A::Relative, Branch(2)),
    /* 0x31 */ op(M::AND, A::IndirectIndexed, PageCross(5)),
    /* 0x32 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x33 */ op(M::RLA, A::IndirectIndexed, Fixed(8)),
    /* 0x34 */ op(M::NOP, A::ZeroPageX, Fixed(4)),
    /* 0x35 */ op(M::AND, A::ZeroPageX, Fixed(4)),
    /* 0x36 */ op(M::ROL, A::ZeroPageX, Fixed(6)),
    /* 0x37 */ op(M::RLA, A::ZeroPageX, Fixed(6)),
    /* 0x38 */ op(M::SEC, A::Implied, Fixed(2)),
    /* 0x39 */ op(M::AND, A::AbsoluteY, PageCross(4)),
    /* 0x3A */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0x3B */ op(M::RLA, A::AbsoluteY, Fixed(7)),
    /* 0x3C */ op(M::NOP, A::AbsoluteX, PageCross(4)),
    /* 0x3D */ op(M::AND, A::AbsoluteX, PageCross(4)),
    /* 0x3E */ op(M::ROL, A::AbsoluteX, Fixed(7)),
    /* 0x3F */ op(M::RLA, A::AbsoluteX, Fixed(7)),
    /* 0x40 */ op(M::RTI, A::Implied, Fixed(6)),
    /* 0x41 */ op(M::EOR, A::IndexedIndirect, Fixed(6)),
    /* 0x42 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x43 */ op(M::SRE, A::IndexedIndirect, Fixed(8)),
    /* 0x44 */ op(M::NOP, A::ZeroPage, Fixed(3)),
    /* 0x45 */ op(M::EOR, A::ZeroPage, Fixed(3)),
    /* 0x46 */ op(M::LSR, A::ZeroPage, Fixed(5)),
    /* 0x47 */ op(M::SRE, A::ZeroPage, Fixed(5)),
    /* 0x48 */ op(M::PHA, A::Implied, Fixed(3)),
    /* 0x49 */ op(M::EOR, A::Immediate, Fixed(2)),
    /* 0x4A */ op(M::LSR, A::Accumulator, Fixed(2)),
    /* 0x4B */ op(M::ALR, A::Immediate, Fixed(2)),
    /* 0x4C */ op(M::JMP, A::Absolute, Fixed(3)),
    /* 0x4D */ op(M::EOR, A::Absolute, Fixed(4)),
    /* 0x4E */ op(M::LSR, A::Absolute, Fixed(6)),
    /* 0x4F */ op(M::SRE, A::Absolute, Fixed(6)),
    /* 0x50 */ op(M::BVC, A::Relative, Branch(2)),
    /* 0x51 */ op(M::EOR, A::IndirectIndexed, PageCross(5)),
    /* 0x52 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x53 */ op(M::SRE, A::IndirectIndexed, Fixed(8)),
    /* 0x54 */ op(M::NOP, A::ZeroPageX, Fixed(4)),
    /* 0x55 */ op(M::EOR, A::ZeroPageX, Fixed(4)),
    /* 0x56 */ op(M::LSR, A::ZeroPageX, Fixed(6)),
    /* 0x57 */ op(M::SRE, A::ZeroPageX, Fixed(6)),
    /* 0x58 */ op(M::CLI, A::Implied, Fixed(2)),
    /* 0x59 */ op(M::EOR, A::AbsoluteY, PageCross(4)),
    /* 0x5A */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0x5B */ op(M::SRE, A::AbsoluteY, Fixed(7)),
    /* 0x5C */ op(M::NOP, A::AbsoluteX, PageCross(4)),
    /* 0x5D */ op(M::EOR, A::AbsoluteX, PageCross(4)),
    /* 0x5E */ op(M::LSR, A::AbsoluteX, Fixed(7)),
    /* 0x5F */ op(M::SRE, A::AbsoluteX, Fixed(7)),
    /* 0x60 */ op(M::RTS, A::Implied, Fixed(6)),
    /* 0x61 */ op(M::ADC, A::IndexedIndirect, Fixed(6)),
    /* 0x62 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x63 */ op(M::RRA, A::IndexedIndirect, Fixed(8)),
    /* 0x64 */ op(M::NOP, A::ZeroPage, Fixed(3)),
    /* 0x65 */ op(M::ADC, A::ZeroPage, Fixed(3)),
    /* 0x66 */ op(M::ROR, A::ZeroPage, Fixed(5)),
    /* 0x67 */ op(M::RRA, A::ZeroPage, Fixed(5)),
    /* 0x68 */ op(M::PLA, A::Implied, Fixed(4)),
    /* 0x69 */ op(M::ADC, A::Immediate, Fixed(2)),
    /* 0x6A */ op(M::ROR, A::Accumulator, Fixed(2)),
    /* 0x6B */ op(M::ARR, A::Immediate, Fixed(2)),
    /* 0x6C */ op(M::JMP, A::Indirect, Fixed(5)),
    /* 0x6D */ op(M::ADC, A::Absolute, Fixed(4)),
    /* 0x6E */ op(M::ROR, A::Absolute, Fixed(6)),
    /* 0x6F */ op(M::RRA, A::Absolute, Fixed(6)),
    /* 0x70 */ op(M::BVS, A::Relative, Branch(2)),
    /* 0x71 */ op(M::ADC, A::IndirectIndexed, PageCross(5)),
    /* 0x72 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x73 */ op(M::RRA, A::IndirectIndexed, Fixed(8)),
    /* 0x74 */ op(M::NOP, A::ZeroPageX, Fixed(4)),
    /* 0x75 */ op(M::ADC, A::ZeroPageX, Fixed(4)),
    /* 0x76 */ op(M::ROR, A::ZeroPageX, Fixed(6)),
    /* 0x77 */ op(M::RRA, A::ZeroPageX, Fixed(6)),
    /* 0x78 */ op(M::SEI, A::Implied, Fixed(2)),
    /* 0x79 */ op(M::ADC, A::AbsoluteY, PageCross(4)),
    /* 0x7A */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0x7B */ op(M::RRA, A::AbsoluteY, Fixed(7)),
    /* 0x7C */ op(M::NOP, A::AbsoluteX, PageCross(4)),
    /* 0x7D */ op(M::ADC, A::AbsoluteX, PageCross(4)),
    /* 0x7E */ op(M::ROR, A::AbsoluteX, Fixed(7)),
    /* 0x7F */ op(M::RRA, A::AbsoluteX, Fixed(7)),
    /* 0x80 */ op(M::NOP, A::Immediate, Fixed(2)),
    /* 0x81 */ op(M::STA, A::IndexedIndirect, Fixed(6)),
    /* 0x82 */ op(M::NOP, A::Immediate, Fixed(2)),
    /* 0x83 */ op(M::SAX, A::IndexedIndirect, Fixed(6)),
    /* 0x84 */ op(M::STY, A::ZeroPage, Fixed(3)),
    /* 0x85 */ op(M::STA, A::ZeroPage, Fixed(3)),
    /* 0x86 */ op(M::STX, A::ZeroPage, Fixed(3)),
    /* 0x87 */ op(M::SAX, A::ZeroPage, Fixed(3)),
    /* 0x88 */ op(M::DEY, A::Implied, Fixed(2)),
    /* 0x89 */ op(M::NOP, A::Immediate, Fixed(2)),
    /* 0x8A */ op(M::TXA, A::Implied, Fixed(2)),
    /* 0x8B */ op(M::XAA, A::Immediate, Fixed(2)),
    /* 0x8C */ op(M::STY, A::Absolute, Fixed(4)),
    /* 0x8D */ op(M::STA, A::Absolute, Fixed(4)),
    /* 0x8E */ op(M::STX, A::Absolute, Fixed(4)),
    /* 0x8F */ op(M::SAX, A::Absolute, Fixed(4)),
    /* 0x90 */ op(M::BCC, A::Relative, Branch(2)),
    /* 0x91 */ op(M::STA, A::IndirectIndexed, Fixed(6)),
    /* 0x92 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0x93 */ op(M::AHX, A::IndirectIndexed, Fixed(6)),
    /* 0x94 */ op(M::STY, A::ZeroPageX, Fixed(4)),
    /* 0x95 */ op(M::STA, A::ZeroPageX, Fixed(4)),
    /* 0x96 */ op(M::STX, A::ZeroPageY, Fixed(4)),
    /* 0x97 */ op(M::SAX, A::ZeroPageY, Fixed(4)),
    /* 0x98 */ op(M::TYA, A::Implied, Fixed(2)),
    /* 0x99 */ op(M::STA, A::AbsoluteY, Fixed(5)),
    /* 0x9A */ op(M::TXS, A::Implied, Fixed(2)),
    /* 0x9B */ op(M::TAS, A::AbsoluteY, Fixed(5)),
    /* 0x9C */ op(M::SHY, A::AbsoluteX, Fixed(5)),
    /* 0x9D */ op(M::STA, A::AbsoluteX, Fixed(5)),
    /* 0x9E */ op(M::SHX, A::AbsoluteY, Fixed(5)),
    /* 0x9F */ op(M::AHX, A::AbsoluteY, Fixed(5)),
    /* 0xA0 */ op(M::LDY, A::Immediate, Fixed(2)),
    /* 0xA1 */ op(M::LDA, A::IndexedIndirect, Fixed(6)),
    /* 0xA2 */ op(M::LDX, A::Immediate, Fixed(2)),
    /* 0xA3 */ op(M::LAX, A::IndexedIndirect, Fixed(6)),
    /* 0xA4 */ op(M::LDY, A::ZeroPage, Fixed(3)),
    /* 0xA5 */ op(M::LDA, A::ZeroPage, Fixed(3)),
    /* 0xA6 */ op(M::LDX, A::ZeroPage, Fixed(3)),
    /* 0xA7 */ op(M::LAX, A::ZeroPage, Fixed(3)),
    /* 0xA8 */ op(M::TAY, A::Implied, Fixed(2)),
    /* 0xA9 */ op(M::LDA, A::Immediate, Fixed(2)),
    /* 0xAA */ op(M::TAX, A::Implied, Fixed(2)),
    /* 0xAB */ op(M::LAX, A::Immediate, Fixed(2)),
    /* 0xAC */ op(M::LDY, A::Absolute, Fixed(4)),
    /* 0xAD */ op(M::LDA, A::Absolute, Fixed(4)),
    /* 0xAE */ op(M::LDX, A::Absolute, Fixed(4)),
    /* 0xAF */ op(M::LAX, A::Absolute, Fixed(4)),
    /* 0xB0 */ op(M::BCS, A::Relative, Branch(2)),
    /* 0xB1 */ op(M::LDA, A::IndirectIndexed, PageCross(5)),
    /* 0xB2 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0xB3 */ op(M::LAX, A::IndirectIndexed, PageCross(5)),
    /* 0xB4 */ op(M::LDY, A::ZeroPageX, Fixed(4)),
    /* 0xB5 */ op(M::LDA, A::ZeroPageX, Fixed(4)),
    /* 0xB6 */ op(M::LDX, A::ZeroPageY, Fixed(4)),
    /* 0xB7 */ op(M::LAX, A::ZeroPageY, Fixed(4)),
    /* 0xB8 */ op(M::CLV, A::Implied, Fixed(2)),
    /* 0xB9 */ op(M::LDA, A::AbsoluteY, PageCross(4)),
    /* 0xBA */ op(M::TSX, A::Implied, Fixed(2)),
    /* 0xBB */ op(M::LAS, A::AbsoluteY, PageCross(4)),
    /* 0xBC */ op(M::LDY, A::AbsoluteX, PageCross(4)),
    /* 0xBD */ op(M::LDA, A::AbsoluteX, PageCross(4)),
    /* 0xBE */ op(M::LDX, A::AbsoluteY, PageCross(4)),
    /* 0xBF */ op(M::LAX, A::AbsoluteY, PageCross(4)),
    /* 0xC0 */ op(M::CPY, A::Immediate, Fixed(2)),
    /* 0xC1 */ op(M::CMP, A::IndexedIndirect, Fixed(6)),
    /* 0xC2 */ op(M::NOP, A::Immediate, Fixed(2)),
    /* 0xC3 */ op(M::DCP, A::IndexedIndirect, Fixed(8)),
    /* 0xC4 */ op(M::CPY, A::ZeroPage, Fixed(3)),
    /* 0xC5 */ op(M::CMP, A::ZeroPage, Fixed(3)),
    /* 0xC6 */ op(M::DEC, A::ZeroPage, Fixed(5)),
    /* 0xC7 */ op(M::DCP, A::ZeroPage, Fixed(5)),
    /* 0xC8 */ op(M::INY, A::Implied, Fixed(2)),
    /* 0xC9 */ op(M::CMP, A::Immediate, Fixed(2)),
    /* 0xCA */ op(M::DEX, A::Implied, Fixed(2)),
    /* 0xCB */ op(M::AXS, A::Immediate, Fixed(2)),
    /* 0xCC */ op(M::CPY, A::Absolute, Fixed(4)),
    /* 0xCD */ op(M::CMP, A::Absolute, Fixed(4)),
    /* 0xCE */ op(M::DEC, A::Absolute, Fixed(6)),
    /* 0xCF */ op(M::DCP, A::Absolute, Fixed(6)),
    /* 0xD0 */ op(M::BNE, A::Relative, Branch(2)),
    /* 0xD1 */ op(M::CMP, A::IndirectIndexed, PageCross(5)),
    /* 0xD2 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0xD3 */ op(M::DCP, A::IndirectIndexed, Fixed(8)),
    /* 0xD4 */ op(M::NOP, A::ZeroPageX, Fixed(4)),
    /* 0xD5 */ op(M::CMP, A::ZeroPageX, Fixed(4)),
    /* 0xD6 */ op(M::DEC, A::ZeroPageX, Fixed(6)),
    /* 0xD7 */ op(M::DCP, A::ZeroPageX, Fixed(6)),
    /* 0xD8 */ op(M::CLD, A::Implied, Fixed(2)),
    /* 0xD9 */ op(M::CMP, A::AbsoluteY, PageCross(4)),
    /* 0xDA */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0xDB */ op(M::DCP, A::AbsoluteY, Fixed(7)),
    /* 0xDC */ op(M::NOP, A::AbsoluteX, PageCross(4)),
    /* 0xDD */ op(M::CMP, A::AbsoluteX, PageCross(4)),
    /* 0xDE */ op(M::DEC, A::AbsoluteX, Fixed(7)),
    /* 0xDF */ op(M::DCP, A::AbsoluteX, Fixed(7)),
    /* 0xE0 */ op(M::CPX, A::Immediate, Fixed(2)),
    /* 0xE1 */ op(M::SBC, A::IndexedIndirect, Fixed(6)),
    /* 0xE2 */ op(M::NOP, A::Immediate, Fixed(2)),
    /* 0xE3 */ op(M::ISC, A::IndexedIndirect, Fixed(8)),
    /* 0xE4 */ op(M::CPX, A::ZeroPage, Fixed(3)),
    /* 0xE5 */ op(M::SBC, A::ZeroPage, Fixed(3)),
    /* 0xE6 */ op(M::INC, A::ZeroPage, Fixed(5)),
    /* 0xE7 */ op(M::ISC, A::ZeroPage, Fixed(5)),
    /* 0xE8 */ op(M::INX, A::Implied, Fixed(2)),
    /* 0xE9 */ op(M::SBC, A::Immediate, Fixed(2)),
    /* 0xEA */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0xEB */ op(M::SBC, A::Immediate, Fixed(2)),
    /* 0xEC */ op(M::CPX, A::Absolute, Fixed(4)),
    /* 0xED */ op(M::SBC, A::Absolute, Fixed(4)),
    /* 0xEE */ op(M::INC, A::Absolute, Fixed(6)),
    /* 0xEF */ op(M::ISC, A::Absolute, Fixed(6)),
    /* 0xF0 */ op(M::BEQ, A::Relative, Branch(2)),
    /* 0xF1 */ op(M::SBC, A::IndirectIndexed, PageCross(5)),
    /* 0xF2 */ op(M::KIL, A::Implied, Fixed(2)),
    /* 0xF3 */ op(M::ISC, A::IndirectIndexed, Fixed(8)),
    /* 0xF4 */ op(M::NOP, A::ZeroPageX, Fixed(4)),
    /* 0xF5 */ op(M::SBC, A::ZeroPageX, Fixed(4)),
    /* 0xF6 */ op(M::INC, A::ZeroPageX, Fixed(6)),
    /* 0xF7 */ op(M::ISC, A::ZeroPageX, Fixed(6)),
    /* 0xF8 */ op(M::SED, A::Implied, Fixed(2)),
    /* 0xF9 */ op(M::SBC, A::AbsoluteY, PageCross(4)),
    /* 0xFA */ op(M::NOP, A::Implied, Fixed(2)),
    /* 0xFB */ op(M::ISC, A::AbsoluteY, Fixed(7)),
    /* 0xFC */ op(M::NOP, A::AbsoluteX, PageCross(4)),
    /* 0xFD */ op(M::SBC, A::AbsoluteX, PageCross(4)),
    /* 0xFE */ op(M::INC, A::AbsoluteX, Fixed(7)),
    /* 0xFF */ op(M::ISC, A::AbsoluteX, Fixed(7)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_256_entries_and_decodes_lda_immediate() {
        assert_eq!(OPCODE_TABLE.len(), 256);
        let entry = &OPCODE_TABLE[0xA9];
        assert_eq!(entry.mnemonic, M::LDA);
        assert_eq!(entry.addressing, A::Immediate);
        assert_eq!(entry.timing, Fixed(2));
    }

    #[test]
    fn brk_takes_seven_cycles() {
        assert_eq!(OPCODE_TABLE[0x00].timing, Fixed(7));
    }

    #[test]
    fn kil_opcodes_present_at_known_offsets() {
        for &opcode in &[0x02u8, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
            assert_eq!(OPCODE_TABLE[opcode as usize].mnemonic, M::KIL);
        }
    }
}
