//! Instruction word decoding.
//!
//! Field extraction is total: any of the 65536 possible words yields a
//! [`Fields`] tuple. Mapping fields onto an instruction is not, and
//! [`OpCode::decode`] returns `None` for the combinations no instruction
//! claims, leaving a single fallthrough for the executor to report.

/// Raw fields of one big-endian 16-bit instruction word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fields {
    /// High nibble, the instruction group.
    pub group: u8,
    /// Register index in bits 8-11.
    pub x: u8,
    /// Register index in bits 4-7.
    pub y: u8,
    /// Low nibble, the sub-opcode of some groups.
    pub n: u8,
    /// Low byte immediate.
    pub nn: u8,
    /// Low 12 bits, an address.
    pub nnn: u16,
}

impl Fields {
    pub fn extract(raw: u16) -> Self {
        Self {
            group: (raw >> 12) as u8,
            x: (raw >> 8 & 0x000F) as u8,
            y: (raw >> 4 & 0x000F) as u8,
            n: (raw & 0x000F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}

/// The 35 recognized instructions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    /// 0NNN, machine language routine on the original hardware; a no-op here
    Sys { nnn: u16 },
    /// 00E0, zero the framebuffer
    ClearScreen,
    /// 00EE, pop the call stack into PC
    Return,
    /// 1NNN
    Jump { nnn: u16 },
    /// 2NNN, push PC and jump
    Call { nnn: u16 },
    /// 3XNN, skip next instruction if VX == NN
    SkipEqImm { x: u8, nn: u8 },
    /// 4XNN, skip next instruction if VX != NN
    SkipNeImm { x: u8, nn: u8 },
    /// 5XY0, skip next instruction if VX == VY
    SkipEqReg { x: u8, y: u8 },
    /// 6XNN, VX := NN
    LoadImm { x: u8, nn: u8 },
    /// 7XNN, VX += NN wrapping, flags untouched
    AddImm { x: u8, nn: u8 },
    /// 8XY0, VX := VY
    Assign { x: u8, y: u8 },
    /// 8XY1, VX |= VY
    Or { x: u8, y: u8 },
    /// 8XY2, VX &= VY
    And { x: u8, y: u8 },
    /// 8XY3, VX ^= VY
    Xor { x: u8, y: u8 },
    /// 8XY4, VX += VY, VF := carry
    Add { x: u8, y: u8 },
    /// 8XY5, VX -= VY, VF := 0 on borrow else 1
    Sub { x: u8, y: u8 },
    /// 8XY6, shift right by one, VF := bit shifted out
    ShiftRight { x: u8, y: u8 },
    /// 8XY7, VX := VY - VX, VF := 0 on borrow else 1
    SubRev { x: u8, y: u8 },
    /// 8XYE, shift left by one, VF := bit shifted out
    ShiftLeft { x: u8, y: u8 },
    /// 9XY0, skip next instruction if VX != VY
    SkipNeReg { x: u8, y: u8 },
    /// ANNN, I := NNN
    LoadIndex { nnn: u16 },
    /// BNNN, PC := NNN + V0
    JumpOffset { nnn: u16 },
    /// CXNN, VX := random byte AND NN
    Random { x: u8, nn: u8 },
    /// DXYN, XOR-blit an 8xN sprite from memory[I..] at (VX, VY)
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E, skip next instruction if key VX is pressed
    SkipKeyPressed { x: u8 },
    /// EXA1, skip next instruction if key VX is not pressed
    SkipKeyNotPressed { x: u8 },
    /// FX07, VX := delay timer
    LoadDelay { x: u8 },
    /// FX0A, suspend until a key press, store the key in VX
    WaitKey { x: u8 },
    /// FX15, delay timer := VX
    SetDelay { x: u8 },
    /// FX18, sound timer := VX
    SetSound { x: u8 },
    /// FX1E, I += VX, flags untouched
    AddIndex { x: u8 },
    /// FX29, I := address of the glyph for digit VX
    LoadSprite { x: u8 },
    /// FX33, memory[I..I+3] := BCD of VX
    StoreBcd { x: u8 },
    /// FX55, memory[I..=I+X] := V0..=VX, I untouched
    RegDump { x: u8 },
    /// FX65, V0..=VX := memory[I..=I+X], I untouched
    RegLoad { x: u8 },
}

impl OpCode {
    /// Decode one instruction word, `None` when no instruction claims it.
    pub fn decode(raw: u16) -> Option<Self> {
        let f = Fields::extract(raw);
        let op = match f.group {
            0x0 => match f.nnn {
                0x0E0 => OpCode::ClearScreen,
                0x0EE => OpCode::Return,
                nnn => OpCode::Sys { nnn },
            },
            0x1 => OpCode::Jump { nnn: f.nnn },
            0x2 => OpCode::Call { nnn: f.nnn },
            0x3 => OpCode::SkipEqImm { x: f.x, nn: f.nn },
            0x4 => OpCode::SkipNeImm { x: f.x, nn: f.nn },
            0x5 if f.n == 0x0 => OpCode::SkipEqReg { x: f.x, y: f.y },
            0x6 => OpCode::LoadImm { x: f.x, nn: f.nn },
            0x7 => OpCode::AddImm { x: f.x, nn: f.nn },
            0x8 => {
                let (x, y) = (f.x, f.y);
                match f.n {
                    0x0 => OpCode::Assign { x, y },
                    0x1 => OpCode::Or { x, y },
                    0x2 => OpCode::And { x, y },
                    0x3 => OpCode::Xor { x, y },
                    0x4 => OpCode::Add { x, y },
                    0x5 => OpCode::Sub { x, y },
                    0x6 => OpCode::ShiftRight { x, y },
                    0x7 => OpCode::SubRev { x, y },
                    0xE => OpCode::ShiftLeft { x, y },
                    _ => return None,
                }
            }
            0x9 if f.n == 0x0 => OpCode::SkipNeReg { x: f.x, y: f.y },
            0xA => OpCode::LoadIndex { nnn: f.nnn },
            0xB => OpCode::JumpOffset { nnn: f.nnn },
            0xC => OpCode::Random { x: f.x, nn: f.nn },
            0xD => OpCode::Draw { x: f.x, y: f.y, n: f.n },
            0xE => match f.nn {
                0x9E => OpCode::SkipKeyPressed { x: f.x },
                0xA1 => OpCode::SkipKeyNotPressed { x: f.x },
                _ => return None,
            },
            0xF => match f.nn {
                0x07 => OpCode::LoadDelay { x: f.x },
                0x0A => OpCode::WaitKey { x: f.x },
                0x15 => OpCode::SetDelay { x: f.x },
                0x18 => OpCode::SetSound { x: f.x },
                0x1E => OpCode::AddIndex { x: f.x },
                0x29 => OpCode::LoadSprite { x: f.x },
                0x33 => OpCode::StoreBcd { x: f.x },
                0x55 => OpCode::RegDump { x: f.x },
                0x65 => OpCode::RegLoad { x: f.x },
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }
}
