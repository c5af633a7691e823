use heapless::{consts::U16, Vec};
use log::warn;

use crate::context::Context;
use crate::error::Error;
use crate::font::{self, FONT_BASE, FONT_SPRITES};
use crate::frame::{Frame, FrameView};
use crate::opcode::OpCode;
use crate::timer::{Timer, TimerState};

const MEM_SIZE: usize = 4096;
const PROG_START: u16 = 0x200;

/// Bytes available to a loaded program.
pub const PROG_CAPACITY: usize = MEM_SIZE - PROG_START as usize;

/// Source-register convention for the shift instructions (8XY6 / 8XYE).
///
/// The encoding is ambiguous in the wild: the original COSMAC interpreter
/// shifted VY into VX, later interpreters shift VX in place and ignore VY.
/// Most surviving ROMs assume the latter, so [`Vx`](ShiftSource::Vx) is the
/// default; it is a per-machine switch rather than a guess.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShiftSource {
    Vx,
    Vy,
}

impl Default for ShiftSource {
    fn default() -> Self {
        ShiftSource::Vx
    }
}

/// The CHIP-8 virtual machine.
///
/// Owns the whole machine state and a host [`Context`]; the host paces it by
/// calling [`tick_chip`](Plum8::tick_chip) per instruction and
/// [`tick_timers`](Plum8::tick_timers) at its fixed timer cadence.
pub struct Plum8<C: Context> {
    pub ctx: C,
    v: [u8; 16],
    i: u16,
    pc: u16,
    memory: [u8; MEM_SIZE],
    stack: Vec<u16, U16>,
    delay_timer: Timer,
    sound_timer: Timer,
    frame: Frame,
    frame_updated: bool,
    waiting_key: Option<u8>,
    fault: Option<Error>,
    shift_source: ShiftSource,
}

impl<C: Context> Plum8<C> {
    pub fn new(ctx: C) -> Self {
        let mut chip = Self {
            ctx,
            v: [0; 16],
            i: 0,
            pc: PROG_START,
            memory: [0; MEM_SIZE],
            stack: Vec::new(),
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
            frame: Frame::new(),
            frame_updated: false,
            waiting_key: None,
            fault: None,
            shift_source: ShiftSource::default(),
        };
        chip.load_font();
        chip
    }

    /// Build a machine with `rom` already in place.
    pub fn load(ctx: C, rom: &[u8]) -> Result<Self, Error> {
        let mut chip = Self::new(ctx);
        chip.load_rom(rom)?;
        Ok(chip)
    }

    pub(crate) fn set_shift_source(&mut self, source: ShiftSource) {
        self.shift_source = source;
    }

    /// Copy a program image into memory at 0x200.
    ///
    /// An oversized image is rejected before any byte is written.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Error> {
        if rom.len() > PROG_CAPACITY {
            return Err(Error::RomTooLarge { len: rom.len() });
        }
        let start = PROG_START as usize;
        self.memory[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    /// Restore power-on state: PC at 0x200, registers, stack, timers, memory
    /// and framebuffer cleared, font reloaded, any latched fault discarded.
    ///
    /// The program area is cleared too; load a ROM again before stepping.
    pub fn reset(&mut self) {
        self.v = [0; 16];
        self.i = 0;
        self.pc = PROG_START;
        self.memory = [0; MEM_SIZE];
        self.load_font();
        // heapless 0.5's Vec::truncate indexes out of bounds while dropping,
        // so drain by hand
        while self.stack.pop().is_some() {}
        self.delay_timer.store(0);
        self.sound_timer.store(0);
        self.frame.clear();
        self.frame_updated = true;
        self.waiting_key = None;
        self.fault = None;
    }

    fn load_font(&mut self) {
        let base = FONT_BASE as usize;
        self.memory[base..base + FONT_SPRITES.len()].copy_from_slice(&FONT_SPRITES);
    }

    /// Read-only view of the framebuffer.
    pub fn frame(&self) -> FrameView<'_> {
        self.frame.view()
    }

    /// Whether the framebuffer changed since the host last cleared the flag.
    pub fn frame_updated(&self) -> bool {
        self.frame_updated
    }

    /// Acknowledge a repaint; only the host clears the changed-flag.
    pub fn clear_frame_update(&mut self) {
        self.frame_updated = false;
    }

    /// The latched fatal error, if any.
    pub fn fault(&self) -> Option<Error> {
        self.fault
    }

    /// Decrement both timers once.
    ///
    /// Called by the host at its fixed timer cadence (conventionally 60 Hz),
    /// independent of how many instructions run in between. The sound timer
    /// keeps the context tone on through its final 1-to-0 tick.
    pub fn tick_timers(&mut self) {
        let _ = self.delay_timer.decrement();
        match self.sound_timer.decrement() {
            TimerState::On | TimerState::Finished => self.ctx.sound_on(),
            TimerState::Off => self.ctx.sound_off(),
        }
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// Returns [`nb::Error::WouldBlock`] while FX0A waits on a key press; no
    /// state advances until the host's context reports one. Fatal errors
    /// latch: every later call returns the same error until [`reset`].
    ///
    /// [`reset`]: Plum8::reset
    pub fn tick_chip(&mut self) -> nb::Result<(), Error> {
        if let Some(err) = self.fault {
            return Err(nb::Error::Other(err));
        }
        match self.advance() {
            Ok(true) => Ok(()),
            Ok(false) => Err(nb::Error::WouldBlock),
            Err(err) => {
                self.fault = Some(err);
                Err(nb::Error::Other(err))
            }
        }
    }

    /// One step of the machine; `Ok(false)` means "still waiting on a key".
    fn advance(&mut self) -> Result<bool, Error> {
        if let Some(x) = self.waiting_key {
            let keys = *self.ctx.get_keys();
            return match keys.iter().position(|&pressed| pressed) {
                Some(key) => {
                    self.v[x as usize] = key as u8;
                    self.waiting_key = None;
                    self.step_pc()?;
                    Ok(true)
                }
                None => Ok(false),
            };
        }
        let raw = self.fetch()?;
        match OpCode::decode(raw) {
            Some(op) => self.execute(op)?,
            None => {
                warn!("unrecognized opcode {:#06x} at {:#05x}", raw, self.pc);
                self.step_pc()?;
            }
        }
        Ok(true)
    }

    fn fetch(&self) -> Result<u16, Error> {
        let pc = self.pc as usize;
        if pc + 1 >= MEM_SIZE {
            return Err(Error::PcOutOfRange { addr: self.pc });
        }
        Ok((self.memory[pc] as u16) << 8 | self.memory[pc + 1] as u16)
    }

    fn step_pc(&mut self) -> Result<(), Error> {
        if self.pc < 0x0FFE {
            self.pc += 2;
            Ok(())
        } else {
            Err(Error::PcOutOfRange { addr: self.pc })
        }
    }
}

// Instruction semantics. Branching instructions return early and own the PC;
// everything else falls through to the auto-increment.
impl<C: Context> Plum8<C> {
    #[rustfmt::skip]
    fn execute(&mut self, op: OpCode) -> Result<(), Error> {
        match op {
            OpCode::Sys { .. }                 => Ok(()),
            OpCode::ClearScreen                => self.op_clear_screen(),
            OpCode::Return                     => self.op_return(),
            OpCode::Jump { nnn }               => return self.op_jump(nnn),
            OpCode::Call { nnn }               => return self.op_call(nnn),
            OpCode::SkipEqImm { x, nn }        => self.op_skip_eq_imm(x, nn),
            OpCode::SkipNeImm { x, nn }        => self.op_skip_ne_imm(x, nn),
            OpCode::SkipEqReg { x, y }         => self.op_skip_eq_reg(x, y),
            OpCode::LoadImm { x, nn }          => self.op_load_imm(x, nn),
            OpCode::AddImm { x, nn }           => self.op_add_imm(x, nn),
            OpCode::Assign { x, y }            => self.op_assign(x, y),
            OpCode::Or { x, y }                => self.op_or(x, y),
            OpCode::And { x, y }               => self.op_and(x, y),
            OpCode::Xor { x, y }               => self.op_xor(x, y),
            OpCode::Add { x, y }               => self.op_add(x, y),
            OpCode::Sub { x, y }               => self.op_sub(x, y),
            OpCode::ShiftRight { x, y }        => self.op_shift_right(x, y),
            OpCode::SubRev { x, y }            => self.op_sub_rev(x, y),
            OpCode::ShiftLeft { x, y }         => self.op_shift_left(x, y),
            OpCode::SkipNeReg { x, y }         => self.op_skip_ne_reg(x, y),
            OpCode::LoadIndex { nnn }          => self.op_load_index(nnn),
            OpCode::JumpOffset { nnn }         => return self.op_jump_offset(nnn),
            OpCode::Random { x, nn }           => self.op_random(x, nn),
            OpCode::Draw { x, y, n }           => self.op_draw(x, y, n),
            OpCode::SkipKeyPressed { x }       => self.op_skip_key_pressed(x),
            OpCode::SkipKeyNotPressed { x }    => self.op_skip_key_not_pressed(x),
            OpCode::LoadDelay { x }            => self.op_load_delay(x),
            OpCode::WaitKey { x }              => return self.op_wait_key(x),
            OpCode::SetDelay { x }             => self.op_set_delay(x),
            OpCode::SetSound { x }             => self.op_set_sound(x),
            OpCode::AddIndex { x }             => self.op_add_index(x),
            OpCode::LoadSprite { x }           => self.op_load_sprite(x),
            OpCode::StoreBcd { x }             => self.op_store_bcd(x),
            OpCode::RegDump { x }              => self.op_reg_dump(x),
            OpCode::RegLoad { x }              => self.op_reg_load(x),
        }
        .and_then(|_| self.step_pc())
    }

    /// 00E0: the changed-flag is raised even if the screen was already blank.
    fn op_clear_screen(&mut self) -> Result<(), Error> {
        self.frame.clear();
        self.frame_updated = true;
        Ok(())
    }

    /// 00EE: the popped address is the call site, so the fall-through
    /// increment lands on the instruction after the call.
    fn op_return(&mut self) -> Result<(), Error> {
        match self.stack.pop() {
            Some(addr) => {
                self.pc = addr;
                Ok(())
            }
            None => Err(Error::StackUnderflow),
        }
    }

    fn op_jump(&mut self, nnn: u16) -> Result<(), Error> {
        self.pc = nnn;
        Ok(())
    }

    fn op_call(&mut self, nnn: u16) -> Result<(), Error> {
        self.stack.push(self.pc).or(Err(Error::StackOverflow))?;
        self.pc = nnn;
        Ok(())
    }

    fn op_skip_eq_imm(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        if self.v[x as usize] == nn {
            self.step_pc()
        } else {
            Ok(())
        }
    }

    fn op_skip_ne_imm(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        if self.v[x as usize] != nn {
            self.step_pc()
        } else {
            Ok(())
        }
    }

    fn op_skip_eq_reg(&mut self, x: u8, y: u8) -> Result<(), Error> {
        if self.v[x as usize] == self.v[y as usize] {
            self.step_pc()
        } else {
            Ok(())
        }
    }

    fn op_skip_ne_reg(&mut self, x: u8, y: u8) -> Result<(), Error> {
        if self.v[x as usize] != self.v[y as usize] {
            self.step_pc()
        } else {
            Ok(())
        }
    }

    fn op_load_imm(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = nn;
        Ok(())
    }

    /// 7XNN wraps and leaves VF alone.
    fn op_add_imm(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = self.v[x as usize].wrapping_add(nn);
        Ok(())
    }

    fn op_assign(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] = self.v[y as usize];
        Ok(())
    }

    fn op_or(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] |= self.v[y as usize];
        Ok(())
    }

    fn op_and(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] &= self.v[y as usize];
        Ok(())
    }

    fn op_xor(&mut self, x: u8, y: u8) -> Result<(), Error> {
        self.v[x as usize] ^= self.v[y as usize];
        Ok(())
    }

    // The flag is written after the result throughout the 8XY_ group, so VF
    // as destination still ends up holding the flag.

    fn op_add(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, carry) = self.v[x as usize].overflowing_add(self.v[y as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = carry as u8;
        Ok(())
    }

    fn op_sub(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, borrow) = self.v[x as usize].overflowing_sub(self.v[y as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = !borrow as u8;
        Ok(())
    }

    fn op_sub_rev(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let (value, borrow) = self.v[y as usize].overflowing_sub(self.v[x as usize]);
        self.v[x as usize] = value;
        self.v[0xF] = !borrow as u8;
        Ok(())
    }

    fn op_shift_right(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let src = match self.shift_source {
            ShiftSource::Vx => self.v[x as usize],
            ShiftSource::Vy => self.v[y as usize],
        };
        self.v[x as usize] = src >> 1;
        self.v[0xF] = src & 0x01;
        Ok(())
    }

    fn op_shift_left(&mut self, x: u8, y: u8) -> Result<(), Error> {
        let src = match self.shift_source {
            ShiftSource::Vx => self.v[x as usize],
            ShiftSource::Vy => self.v[y as usize],
        };
        self.v[x as usize] = src << 1;
        self.v[0xF] = src >> 7;
        Ok(())
    }

    fn op_load_index(&mut self, nnn: u16) -> Result<(), Error> {
        self.i = nnn;
        Ok(())
    }

    fn op_jump_offset(&mut self, nnn: u16) -> Result<(), Error> {
        let addr = nnn + self.v[0] as u16;
        if addr <= 0x0FFF {
            self.pc = addr;
            Ok(())
        } else {
            Err(Error::PcOutOfRange { addr })
        }
    }

    fn op_random(&mut self, x: u8, nn: u8) -> Result<(), Error> {
        self.v[x as usize] = self.ctx.gen_random() & nn;
        Ok(())
    }

    /// DXYN: XOR-blit an 8xN sprite read from memory[I..I+N] at (VX, VY),
    /// wrapping at the display edges. VF reports any on-to-off transition.
    /// I is left unmodified. The sprite range is checked up front, so a
    /// faulted draw leaves the frame and the changed-flag untouched.
    fn op_draw(&mut self, x: u8, y: u8, n: u8) -> Result<(), Error> {
        if self.i as usize + n as usize > MEM_SIZE {
            return Err(Error::AddressOutOfRange {
                addr: MEM_SIZE as u16,
            });
        }
        let origin_x = self.v[x as usize] as usize;
        let origin_y = self.v[y as usize] as usize;
        self.v[0xF] = 0;
        for row in 0..n as usize {
            let bits = self.memory[self.i as usize + row];
            for col in 0..8 {
                if bits & (0x80 >> col) != 0 {
                    let was_on = self.frame.flip(origin_x + col, origin_y + row);
                    if was_on {
                        self.v[0xF] = 1;
                    }
                }
            }
        }
        self.frame_updated = true;
        Ok(())
    }

    /// EX9E: only the low nibble of VX selects a key.
    fn op_skip_key_pressed(&mut self, x: u8) -> Result<(), Error> {
        let key = (self.v[x as usize] & 0x0F) as usize;
        if self.ctx.get_keys()[key] {
            self.step_pc()
        } else {
            Ok(())
        }
    }

    fn op_skip_key_not_pressed(&mut self, x: u8) -> Result<(), Error> {
        let key = (self.v[x as usize] & 0x0F) as usize;
        if !self.ctx.get_keys()[key] {
            self.step_pc()
        } else {
            Ok(())
        }
    }

    fn op_load_delay(&mut self, x: u8) -> Result<(), Error> {
        self.v[x as usize] = self.delay_timer.load();
        Ok(())
    }

    /// FX0A: record the suspension; PC stays on this instruction until
    /// `advance` observes a pressed key (lowest index wins).
    fn op_wait_key(&mut self, x: u8) -> Result<(), Error> {
        self.waiting_key = Some(x);
        Ok(())
    }

    fn op_set_delay(&mut self, x: u8) -> Result<(), Error> {
        self.delay_timer.store(self.v[x as usize]);
        Ok(())
    }

    fn op_set_sound(&mut self, x: u8) -> Result<(), Error> {
        self.sound_timer.store(self.v[x as usize]);
        Ok(())
    }

    /// FX1E: no flag change; keeps I inside the address space.
    fn op_add_index(&mut self, x: u8) -> Result<(), Error> {
        let addr = self.i + self.v[x as usize] as u16;
        if addr <= 0x0FFF {
            self.i = addr;
            Ok(())
        } else {
            Err(Error::AddressOutOfRange { addr })
        }
    }

    fn op_load_sprite(&mut self, x: u8) -> Result<(), Error> {
        self.i = font::sprite_addr(self.v[x as usize]);
        Ok(())
    }

    fn op_store_bcd(&mut self, x: u8) -> Result<(), Error> {
        let i = self.i as usize;
        if i + 2 >= MEM_SIZE {
            return Err(Error::AddressOutOfRange {
                addr: MEM_SIZE as u16,
            });
        }
        let value = self.v[x as usize];
        self.memory[i] = value / 100;
        self.memory[i + 1] = value / 10 % 10;
        self.memory[i + 2] = value % 10;
        Ok(())
    }

    fn op_reg_dump(&mut self, x: u8) -> Result<(), Error> {
        let i = self.i as usize;
        let end = i + x as usize;
        if end >= MEM_SIZE {
            return Err(Error::AddressOutOfRange {
                addr: MEM_SIZE as u16,
            });
        }
        self.memory[i..=end].copy_from_slice(&self.v[..=x as usize]);
        Ok(())
    }

    fn op_reg_load(&mut self, x: u8) -> Result<(), Error> {
        let i = self.i as usize;
        let end = i + x as usize;
        if end >= MEM_SIZE {
            return Err(Error::AddressOutOfRange {
                addr: MEM_SIZE as u16,
            });
        }
        self.v[..=x as usize].copy_from_slice(&self.memory[i..=end]);
        Ok(())
    }
}


#[cfg(test)]
mod exec_tests {
    use super::*;
    use crate::context::testing::TestingContext;
    use crate::utils::testing::ToMask;
    use crate::assert_eq_2d;

    fn chip() -> Plum8<TestingContext> {
        Plum8::new(TestingContext::new(0))
    }

    #[test]
    fn execute_00e0_clears_and_raises_the_changed_flag() {
        let mut chip = chip();
        chip.frame.flip(5, 5);
        chip.clear_frame_update();

        chip.execute(OpCode::ClearScreen).unwrap();
        assert!(chip.frame().as_raw().iter().all(|&b| b == 0));
        assert!(chip.frame_updated());

        // raised again even though nothing was lit
        chip.clear_frame_update();
        chip.execute(OpCode::ClearScreen).unwrap();
        assert!(chip.frame_updated());
    }

    #[test]
    fn execute_2nnn_00ee_round_trip() {
        let mut chip = chip();
        let depth_before = chip.stack.len();

        chip.execute(OpCode::Call { nnn: 0x400 }).unwrap();
        assert_eq!(chip.pc, 0x400);
        assert_eq!(chip.stack.len(), depth_before + 1);

        chip.execute(OpCode::Return).unwrap();
        assert_eq!(chip.pc, 0x202); // call site plus one instruction
        assert_eq!(chip.stack.len(), depth_before);
    }

    #[test]
    fn execute_00ee_on_empty_stack_underflows() {
        let mut chip = chip();
        assert_eq!(chip.execute(OpCode::Return), Err(Error::StackUnderflow));
    }

    #[test]
    fn execute_2nnn_at_full_depth_overflows() {
        let mut chip = chip();
        for _ in 0..16 {
            chip.execute(OpCode::Call { nnn: 0x300 }).unwrap();
        }
        assert_eq!(
            chip.execute(OpCode::Call { nnn: 0x300 }),
            Err(Error::StackOverflow),
        );
    }

    #[test]
    fn execute_1nnn_jumps() {
        let mut chip = chip();
        chip.execute(OpCode::Jump { nnn: 0xABC }).unwrap();
        assert_eq!(chip.pc, 0xABC);
    }

    #[test]
    fn execute_bnnn_jumps_with_offset() {
        let mut chip = chip();
        chip.v[0] = 0x02;
        chip.execute(OpCode::JumpOffset { nnn: 0xABC }).unwrap();
        assert_eq!(chip.pc, 0xABE);

        chip.v[0] = 0xFF;
        assert_eq!(
            chip.execute(OpCode::JumpOffset { nnn: 0xFFB }),
            Err(Error::PcOutOfRange { addr: 0x10FA }),
        );
    }

    #[test]
    fn execute_3xnn_skips_on_equal_immediate() {
        let mut chip = chip();
        chip.execute(OpCode::SkipEqImm { x: 0, nn: 0x22 }).unwrap();
        assert_eq!(chip.pc, 0x202);

        chip.v[0] = 0x22;
        chip.execute(OpCode::SkipEqImm { x: 0, nn: 0x22 }).unwrap();
        assert_eq!(chip.pc, 0x206);
    }

    #[test]
    fn execute_4xnn_skips_on_unequal_immediate() {
        let mut chip = chip();
        chip.execute(OpCode::SkipNeImm { x: 0, nn: 0x22 }).unwrap();
        assert_eq!(chip.pc, 0x204);

        chip.v[0] = 0x22;
        chip.execute(OpCode::SkipNeImm { x: 0, nn: 0x22 }).unwrap();
        assert_eq!(chip.pc, 0x206);
    }

    #[test]
    fn execute_5xy0_and_9xy0_compare_registers() {
        let mut chip = chip();
        chip.execute(OpCode::SkipEqReg { x: 0, y: 1 }).unwrap();
        assert_eq!(chip.pc, 0x204);

        chip.v[0] = 0x22;
        chip.execute(OpCode::SkipEqReg { x: 0, y: 1 }).unwrap();
        assert_eq!(chip.pc, 0x206);

        chip.execute(OpCode::SkipNeReg { x: 0, y: 1 }).unwrap();
        assert_eq!(chip.pc, 0x20A);

        chip.v[1] = 0x22;
        chip.execute(OpCode::SkipNeReg { x: 0, y: 1 }).unwrap();
        assert_eq!(chip.pc, 0x20C);
    }

    #[test]
    fn execute_6xnn_7xnn_loads_and_adds_mod_256() {
        let mut chip = chip();
        chip.execute(OpCode::LoadImm { x: 3, nn: 0xF0 }).unwrap();
        assert_eq!(chip.v[3], 0xF0);

        chip.v[0xF] = 0x77;
        chip.execute(OpCode::AddImm { x: 3, nn: 0x20 }).unwrap();
        assert_eq!(chip.v[3], 0x10); // (0xF0 + 0x20) mod 256
        assert_eq!(chip.v[0xF], 0x77); // carry flag untouched
    }

    #[test]
    fn execute_8xy0_to_8xy3_bitwise() {
        let mut chip = chip();
        chip.v[1] = 0xF1;
        chip.v[2] = 0x1F;

        chip.execute(OpCode::Assign { x: 0, y: 1 }).unwrap();
        assert_eq!(chip.v[0], 0xF1);

        chip.execute(OpCode::Or { x: 0, y: 2 }).unwrap();
        assert_eq!(chip.v[0], 0xFF);

        chip.execute(OpCode::And { x: 0, y: 2 }).unwrap();
        assert_eq!(chip.v[0], 0x1F);

        chip.execute(OpCode::Xor { x: 0, y: 1 }).unwrap();
        assert_eq!(chip.v[0], 0xEE);
    }

    #[test]
    fn execute_8xy4_sets_carry_iff_sum_overflows() {
        let mut chip = chip();
        chip.v[0] = 0xEE;
        chip.v[1] = 0x11;
        chip.execute(OpCode::Add { x: 0, y: 1 }).unwrap();
        assert_eq!((chip.v[0], chip.v[0xF]), (0xFF, 0));

        chip.execute(OpCode::Add { x: 0, y: 1 }).unwrap();
        assert_eq!((chip.v[0], chip.v[0xF]), (0x10, 1));
    }

    #[test]
    fn execute_8xy5_borrow_by_comparison() {
        let mut chip = chip();
        chip.v[0] = 0x05;
        chip.v[1] = 0x0A;
        chip.execute(OpCode::Sub { x: 0, y: 1 }).unwrap();
        assert_eq!((chip.v[0], chip.v[0xF]), (0xFB, 0));

        chip.v[0] = 0x0A;
        chip.v[1] = 0x05;
        chip.execute(OpCode::Sub { x: 0, y: 1 }).unwrap();
        assert_eq!((chip.v[0], chip.v[0xF]), (0x05, 1));
    }

    #[test]
    fn execute_8xy7_reversed_operands() {
        let mut chip = chip();
        chip.v[0] = 0x04;
        chip.v[1] = 0x05;
        chip.execute(OpCode::SubRev { x: 0, y: 1 }).unwrap();
        assert_eq!((chip.v[0], chip.v[0xF]), (0x01, 1));

        chip.v[0] = 0x07;
        chip.execute(OpCode::SubRev { x: 0, y: 1 }).unwrap();
        assert_eq!((chip.v[0], chip.v[0xF]), (0xFE, 0));
    }

    #[test]
    fn execute_8xy6_shifts_vx_right_by_default() {
        let mut chip = chip();
        chip.v[2] = 0x03;
        chip.v[3] = 0xF0;
        chip.execute(OpCode::ShiftRight { x: 2, y: 3 }).unwrap();
        assert_eq!((chip.v[2], chip.v[0xF]), (0x01, 1));
        assert_eq!(chip.v[3], 0xF0); // vy ignored under the default quirk
    }

    #[test]
    fn execute_8xye_shifts_vx_left_by_default() {
        let mut chip = chip();
        chip.v[2] = 0x81;
        chip.execute(OpCode::ShiftLeft { x: 2, y: 3 }).unwrap();
        assert_eq!((chip.v[2], chip.v[0xF]), (0x02, 1));
    }

    #[test]
    fn shift_source_vy_reads_the_encoded_register() {
        let mut chip = chip();
        chip.set_shift_source(ShiftSource::Vy);

        chip.v[2] = 0xFF;
        chip.v[3] = 0x06;
        chip.execute(OpCode::ShiftRight { x: 2, y: 3 }).unwrap();
        assert_eq!((chip.v[2], chip.v[0xF]), (0x03, 0));
        assert_eq!(chip.v[3], 0x06);

        chip.v[3] = 0x81;
        chip.execute(OpCode::ShiftLeft { x: 2, y: 3 }).unwrap();
        assert_eq!((chip.v[2], chip.v[0xF]), (0x02, 1));
    }

    #[test]
    fn execute_annn_and_fx1e_address_the_index() {
        let mut chip = chip();
        chip.execute(OpCode::LoadIndex { nnn: 0xFFF }).unwrap();
        assert_eq!(chip.i, 0xFFF);

        chip.i = 0x100;
        chip.v[4] = 0xFF;
        chip.execute(OpCode::AddIndex { x: 4 }).unwrap();
        assert_eq!(chip.i, 0x1FF);

        chip.i = 0xFFB;
        assert_eq!(
            chip.execute(OpCode::AddIndex { x: 4 }),
            Err(Error::AddressOutOfRange { addr: 0x10FA }),
        );
    }

    #[test]
    fn execute_cxnn_masks_the_random_byte() {
        let mut chip = chip();
        for _ in 0..8 {
            chip.execute(OpCode::Random { x: 0, nn: 0x0F }).unwrap();
            assert_eq!(chip.v[0] & 0xF0, 0);
        }
        chip.execute(OpCode::Random { x: 0, nn: 0x00 }).unwrap();
        assert_eq!(chip.v[0], 0);
    }

    #[test]
    fn execute_dxyn_draws_a_glyph() {
        let mut chip = chip();
        chip.i = font::sprite_addr(0x0);
        chip.v[0] = 1; // x
        chip.v[1] = 2; // y
        chip.execute(OpCode::Draw { x: 0, y: 1, n: 5 }).unwrap();

        assert_eq_2d!(
            x_range: 0..12, y_range: 0..9;
            chip.frame().to_mask(),
            "............\n\
             ............\n\
             .####.......\n\
             .#..#.......\n\
             .#..#.......\n\
             .#..#.......\n\
             .####.......\n\
             ............\n\
             ............"
                .to_mask(),
        );
        assert_eq!(chip.v[0xF], 0);
        assert!(chip.frame_updated());
        assert_eq!(chip.i, font::sprite_addr(0x0));
    }

    #[test]
    fn execute_dxyn_reports_collisions() {
        let mut chip = chip();
        chip.memory[0x300] = 0xFF;
        chip.i = 0x300;

        chip.execute(OpCode::Draw { x: 0, y: 0, n: 1 }).unwrap();
        assert_eq!(chip.v[0xF], 0);
        assert!((0..8).all(|x| chip.frame().get(x, 0) == Some(true)));

        // same sprite again: every pixel toggles off, collision reported
        chip.execute(OpCode::Draw { x: 0, y: 0, n: 1 }).unwrap();
        assert_eq!(chip.v[0xF], 1);
        assert!((0..8).all(|x| chip.frame().get(x, 0) == Some(false)));
    }

    #[test]
    fn execute_dxyn_wraps_at_both_edges() {
        let mut chip = chip();
        chip.memory[0x300] = 0b1100_0000;
        chip.memory[0x301] = 0b1100_0000;
        chip.i = 0x300;
        chip.v[0] = 63;
        chip.v[1] = 31;
        chip.execute(OpCode::Draw { x: 0, y: 1, n: 2 }).unwrap();

        assert_eq!(chip.frame().get(63, 31), Some(true));
        assert_eq!(chip.frame().get(0, 31), Some(true));
        assert_eq!(chip.frame().get(63, 0), Some(true));
        assert_eq!(chip.frame().get(0, 0), Some(true));
    }

    #[test]
    fn execute_dxyn_rejects_sprite_reads_past_memory() {
        let mut chip = chip();
        chip.i = 0xFFF;
        assert_eq!(
            chip.execute(OpCode::Draw { x: 0, y: 0, n: 2 }),
            Err(Error::AddressOutOfRange { addr: 0x1000 }),
        );
    }

    #[test]
    fn execute_dxyn_faults_without_touching_the_frame() {
        let mut chip = chip();
        chip.memory[0xFFF] = 0xFF;
        chip.i = 0xFFF;
        chip.v[0xF] = 0x77;

        assert_eq!(
            chip.execute(OpCode::Draw { x: 0, y: 0, n: 2 }),
            Err(Error::AddressOutOfRange { addr: 0x1000 }),
        );
        assert!(chip.frame().as_raw().iter().all(|&b| b == 0));
        assert!(!chip.frame_updated());
        assert_eq!(chip.v[0xF], 0x77);
    }

    #[test]
    fn execute_ex9e_exa1_test_the_keypad() {
        let mut chip = chip();
        chip.v[0] = 0xE;

        chip.execute(OpCode::SkipKeyPressed { x: 0 }).unwrap();
        assert_eq!(chip.pc, 0x202);
        chip.execute(OpCode::SkipKeyNotPressed { x: 0 }).unwrap();
        assert_eq!(chip.pc, 0x206);

        chip.ctx.press_key(0xE);
        chip.execute(OpCode::SkipKeyPressed { x: 0 }).unwrap();
        assert_eq!(chip.pc, 0x20A);
        chip.execute(OpCode::SkipKeyNotPressed { x: 0 }).unwrap();
        assert_eq!(chip.pc, 0x20C);
    }

    #[test]
    fn execute_fx07_fx15_move_the_delay_timer() {
        let mut chip = chip();
        chip.v[4] = 0x30;
        chip.execute(OpCode::SetDelay { x: 4 }).unwrap();
        chip.execute(OpCode::LoadDelay { x: 5 }).unwrap();
        assert_eq!(chip.v[5], 0x30);
    }

    #[test]
    fn execute_fx0a_suspends_until_a_key() {
        let mut chip = chip();
        chip.load_rom(&[0xF3, 0x0A]).unwrap();

        assert!(chip.tick_chip().is_ok());
        assert_eq!(chip.pc, 0x200); // suspended on the instruction

        assert_eq!(chip.tick_chip(), Err(nb::Error::WouldBlock));
        assert_eq!(chip.tick_chip(), Err(nb::Error::WouldBlock));
        assert_eq!(chip.pc, 0x200);

        chip.ctx.press_key(0xB);
        chip.ctx.press_key(0x7); // lowest pressed key wins
        assert!(chip.tick_chip().is_ok());
        assert_eq!(chip.v[3], 0x7);
        assert_eq!(chip.pc, 0x202);
    }

    #[test]
    fn execute_fx29_points_i_at_the_glyph() {
        let mut chip = chip();
        chip.v[6] = 0xA;
        chip.execute(OpCode::LoadSprite { x: 6 }).unwrap();
        assert_eq!(chip.i, 0x050 + 5 * 0xA);
    }

    #[test]
    fn execute_fx33_stores_decimal_digits() {
        let mut chip = chip();
        chip.v[0] = 234;
        chip.i = 0x300;
        chip.execute(OpCode::StoreBcd { x: 0 }).unwrap();
        assert_eq!(&chip.memory[0x300..0x303], &[2, 3, 4]);
        assert_eq!(chip.i, 0x300);

        chip.i = 0xFFE;
        assert_eq!(
            chip.execute(OpCode::StoreBcd { x: 0 }),
            Err(Error::AddressOutOfRange { addr: 0x1000 }),
        );
    }

    #[test]
    fn execute_fx55_fx65_round_trip_leaves_i_alone() {
        let mut chip = chip();
        let values = [0xDE, 0xAD, 0xBE, 0xEF, 0x12, 0x34];
        chip.v[..6].copy_from_slice(&values);
        chip.i = 0x300;

        chip.execute(OpCode::RegDump { x: 5 }).unwrap();
        assert_eq!(&chip.memory[0x300..0x306], &values);
        assert_eq!(chip.i, 0x300);

        chip.v = [0; 16];
        chip.execute(OpCode::RegLoad { x: 5 }).unwrap();
        assert_eq!(&chip.v[..6], &values);
        assert_eq!(chip.i, 0x300);

        chip.i = 0xFFC;
        // 0x1000 is the first byte past the address space
        assert_eq!(
            chip.execute(OpCode::RegDump { x: 5 }),
            Err(Error::AddressOutOfRange { addr: 0x1000 }),
        );
        assert_eq!(
            chip.execute(OpCode::RegLoad { x: 5 }),
            Err(Error::AddressOutOfRange { addr: 0x1000 }),
        );
    }

    #[test]
    fn execute_0nnn_is_a_plain_no_op() {
        let mut chip = chip();
        chip.execute(OpCode::Sys { nnn: 0x123 }).unwrap();
        assert_eq!(chip.pc, 0x202);
    }
}
