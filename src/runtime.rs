use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use miette::Result;

use crate::error;
use crate::host::Host;
use crate::image::Image;
use crate::opcodes::{decode, AddrMode, Mnemonic};

// Processor status bits. Bit 5 has no name; it reads as 1.
pub const FLAG_C: u8 = 1 << 0;
pub const FLAG_Z: u8 = 1 << 1;
pub const FLAG_I: u8 = 1 << 2;
pub const FLAG_D: u8 = 1 << 3;
pub const FLAG_B: u8 = 1 << 4;
pub const FLAG_U: u8 = 1 << 5;
pub const FLAG_V: u8 = 1 << 6;
pub const FLAG_N: u8 = 1 << 7;

const STACK_PAGE: u16 = 0x0100;
const RANDOM_REG: u16 = 0x00FE;

const FRAMEBUF_START: u16 = 0x0200;
const FRAMEBUF_END: u16 = 0x06AF;
const FRAMEBUF_COLS: u16 = 40;
const CLEAR_STROBE: u16 = 0x06B0;
const BEEP_STROBE: u16 = 0x06B1;

// Host key codes land in 0x06E0..=0x06E4 (left, up, right, down, enter)
const KEY_BASE: u16 = 0x06E0;
const KEY_ENTER: u16 = 0x06E4;
const MOUSE_BASE: u16 = 0x06F0;

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Program counter fallback when the reset vector is empty.
const PC_DEFAULT: u16 = 0x0800;

/// What a single interpreter step decided about the program.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Continue,
    /// HLT executed, or execution ran off the end of the program.
    Halt,
    /// WAI executed; the program sleeps until an interrupt or a host resume.
    Wait,
}

/// Batch size and tick interval for the cooperative run loop.
#[derive(Clone, Copy, Debug)]
pub struct Pacing {
    pub steps_per_tick: u32,
    pub interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            steps_per_tick: 512,
            interval: Duration::ZERO,
        }
    }
}

/// Complete programmer-visible 6502 state plus the assembled memory image.
/// The host's input callbacks only ever interpose between steps, so there is
/// exactly one mutator at any time.
pub struct RunState<H: Host> {
    mem: Image,
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    p: u8,
    executing: bool,
    waiting: bool,
    /// Bytes buffered for the IN instruction, NUL-terminated per line.
    input: VecDeque<u8>,
    kbd_interrupt: bool,
    mouse_interrupt: bool,
    host: H,
}

impl<H: Host> RunState<H> {
    pub fn new(mem: Image, host: H) -> Self {
        let mut state = RunState {
            mem,
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            pc: PC_DEFAULT,
            p: FLAG_I | FLAG_U,
            executing: false,
            waiting: false,
            input: VecDeque::new(),
            kbd_interrupt: false,
            mouse_interrupt: false,
            host,
        };
        state.reset();
        state
    }

    /// Power-on state: registers cleared, I set, PC from the reset vector
    /// when one was assembled in, input cells zeroed.
    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFF;
        self.p = FLAG_I | FLAG_U;
        let vector = self.read_word(RESET_VECTOR);
        self.pc = if vector != 0 { vector } else { PC_DEFAULT };
        for addr in KEY_BASE..=KEY_ENTER {
            self.mem.write(addr, 0);
        }
        for addr in MOUSE_BASE..=MOUSE_BASE + 2 {
            self.mem.write(addr, 0);
        }
        self.input.clear();
        self.executing = false;
        self.waiting = false;
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn p(&self) -> u8 {
        self.p
    }

    pub fn flag(&self, mask: u8) -> bool {
        self.p & mask != 0
    }

    pub fn executing(&self) -> bool {
        self.executing
    }

    pub fn waiting(&self) -> bool {
        self.waiting
    }

    pub fn mem(&self) -> &Image {
        &self.mem
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn set_keyboard_interrupt(&mut self, enabled: bool) {
        self.kbd_interrupt = enabled;
    }

    pub fn set_mouse_interrupt(&mut self, enabled: bool) {
        self.mouse_interrupt = enabled;
    }

    /// Ask a waiting (WAI) program to continue with the next instruction.
    pub fn resume(&mut self) {
        self.waiting = false;
    }

    pub fn stop(&mut self) {
        self.executing = false;
    }

    /// Drive the program for whole ticks of `steps_per_tick` instructions,
    /// sleeping `interval` between ticks. `cancelled` is polled between
    /// batches; cancellation is cooperative and marks the program as no
    /// longer executing.
    pub fn run<F: FnMut() -> bool>(&mut self, pacing: Pacing, mut cancelled: F) -> Result<Step> {
        self.executing = true;
        loop {
            if cancelled() {
                self.executing = false;
                return Ok(Step::Halt);
            }
            for _ in 0..pacing.steps_per_tick.max(1) {
                if self.waiting {
                    return Ok(Step::Wait);
                }
                match self.step() {
                    Ok(Step::Continue) => {}
                    Ok(done) => return Ok(done),
                    Err(e) => {
                        self.executing = false;
                        return Err(e);
                    }
                }
            }
            if !pacing.interval.is_zero() {
                thread::sleep(pacing.interval);
            }
        }
    }

    /// Fetch, decode, and execute one instruction.
    pub fn step(&mut self) -> Result<Step> {
        // The random-number register gets a fresh byte every step
        self.mem.write(RANDOM_REG, rand::random::<u8>());

        let Some(op) = self.mem.read(self.pc) else {
            // Ran past the last assembled byte: normal end of program
            self.executing = false;
            return Ok(Step::Halt);
        };
        let Some((mn, mode)) = decode(op) else {
            self.executing = false;
            return Err(error::unknown_opcode(self.pc, op));
        };

        let mut next = self.pc.wrapping_add(1 + mode.operand_len());
        let mut outcome = Step::Continue;

        use Mnemonic::*;
        match mn {
            Adc => {
                let m = self.load(mode);
                self.adc(m);
            }
            And => {
                let m = self.load(mode);
                self.a &= m;
                self.set_nz(self.a);
            }
            Asl => self.rmw(mode, Self::asl_val),
            Bcc => next = self.branch_if(!self.flag(FLAG_C), next),
            Bcs => next = self.branch_if(self.flag(FLAG_C), next),
            Beq => next = self.branch_if(self.flag(FLAG_Z), next),
            Bit => {
                let m = self.load(mode);
                self.set_flag(FLAG_Z, self.a & m == 0);
                self.set_flag(FLAG_N, m & 0x80 != 0);
                self.set_flag(FLAG_V, m & 0x40 != 0);
            }
            Bmi => next = self.branch_if(self.flag(FLAG_N), next),
            Bne => next = self.branch_if(!self.flag(FLAG_Z), next),
            Bpl => next = self.branch_if(!self.flag(FLAG_N), next),
            Brk => {
                // Software interrupt: return address skips the padding byte
                self.push_word(self.pc.wrapping_add(2));
                self.push(self.p | FLAG_B | FLAG_U);
                self.set_flag(FLAG_I, true);
                next = self.read_word(IRQ_VECTOR);
            }
            Bvc => next = self.branch_if(!self.flag(FLAG_V), next),
            Bvs => next = self.branch_if(self.flag(FLAG_V), next),
            Clc => self.set_flag(FLAG_C, false),
            Cld => self.set_flag(FLAG_D, false),
            Cli => self.set_flag(FLAG_I, false),
            Clv => self.set_flag(FLAG_V, false),
            Cmp => {
                let m = self.load(mode);
                self.compare(self.a, m);
            }
            Cpx => {
                let m = self.load(mode);
                self.compare(self.x, m);
            }
            Cpy => {
                let m = self.load(mode);
                self.compare(self.y, m);
            }
            Dec => self.rmw(mode, Self::dec_val),
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_nz(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_nz(self.y);
            }
            Eor => {
                let m = self.load(mode);
                self.a ^= m;
                self.set_nz(self.a);
            }
            Inc => self.rmw(mode, Self::inc_val),
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_nz(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_nz(self.y);
            }
            Jmp => next = self.effective_addr(mode),
            Jsr => {
                let target = self.effective_addr(mode);
                self.push_word(next.wrapping_sub(1));
                next = target;
            }
            Lda => {
                self.a = self.load(mode);
                self.set_nz(self.a);
            }
            Ldx => {
                self.x = self.load(mode);
                self.set_nz(self.x);
            }
            Ldy => {
                self.y = self.load(mode);
                self.set_nz(self.y);
            }
            Lsr => self.rmw(mode, Self::lsr_val),
            Nop => {}
            Ora => {
                let m = self.load(mode);
                self.a |= m;
                self.set_nz(self.a);
            }
            Pha => self.push(self.a),
            Php => self.push(self.p | FLAG_B | FLAG_U),
            Pla => {
                self.a = self.pull();
                self.set_nz(self.a);
            }
            Plp => {
                let v = self.pull();
                self.p = (v | FLAG_U) & !FLAG_B;
            }
            Rol => self.rmw(mode, Self::rol_val),
            Ror => self.rmw(mode, Self::ror_val),
            Rti => {
                let v = self.pull();
                self.p = (v | FLAG_U) & !FLAG_B;
                next = self.pull_word();
            }
            Rts => next = self.pull_word().wrapping_add(1),
            Sbc => {
                let m = self.load(mode);
                self.sbc(m);
            }
            Sec => self.set_flag(FLAG_C, true),
            Sed => self.set_flag(FLAG_D, true),
            Sei => self.set_flag(FLAG_I, true),
            Sta => {
                let addr = self.effective_addr(mode);
                self.write(addr, self.a);
            }
            Stx => {
                let addr = self.effective_addr(mode);
                self.write(addr, self.x);
            }
            Sty => {
                let addr = self.effective_addr(mode);
                self.write(addr, self.y);
            }
            Tax => {
                self.x = self.a;
                self.set_nz(self.x);
            }
            Tay => {
                self.y = self.a;
                self.set_nz(self.y);
            }
            Tsx => {
                self.x = self.sp;
                self.set_nz(self.x);
            }
            Txa => {
                self.a = self.x;
                self.set_nz(self.a);
            }
            Txs => self.sp = self.x,
            Tya => {
                self.a = self.y;
                self.set_nz(self.a);
            }
            Hlt => {
                self.executing = false;
                outcome = Step::Halt;
            }
            Out => self.host.write_output_char(self.a as u16),
            Ouy => self
                .host
                .write_output_char(((self.a as u16) << 8) | self.y as u16),
            In => {
                if self.input.is_empty() {
                    let line = self.host.read_input_line();
                    self.input.extend(line.bytes());
                    self.input.push_back(0);
                }
                self.a = self.input.pop_front().unwrap_or(0);
            }
            Wai => {
                self.waiting = true;
                outcome = Step::Wait;
            }
        }

        self.pc = next;
        Ok(outcome)
    }

    /// Host keyboard callback. With the maskable-interrupt toggle on and I
    /// clear, the raw code lands in the key register and execution vectors
    /// through the IRQ handler; otherwise arrow/enter codes set their mapped
    /// cells.
    pub fn key_event(&mut self, code: u8) {
        if self.kbd_interrupt && !self.flag(FLAG_I) {
            self.mem.write(KEY_BASE, code);
            self.irq();
            return;
        }
        match code {
            37 => self.mem.write(KEY_BASE, 1),     // left
            38 => self.mem.write(KEY_BASE + 1, 1), // up
            39 => self.mem.write(KEY_BASE + 2, 1), // right
            40 => self.mem.write(KEY_BASE + 3, 1), // down
            13 => self.mem.write(KEY_ENTER, 1),    // enter
            _ => {}
        }
    }

    /// Host mouse callback with a `buttons` bit mask (bit 0 left, 1 right,
    /// 2 middle).
    pub fn mouse_event(&mut self, buttons: u8) {
        if self.mouse_interrupt && !self.flag(FLAG_I) {
            self.mem.write(MOUSE_BASE, buttons);
            self.irq();
            return;
        }
        self.mem.write(MOUSE_BASE, buttons & 1);
        self.mem.write(MOUSE_BASE + 1, (buttons >> 1) & 1);
        self.mem.write(MOUSE_BASE + 2, (buttons >> 2) & 1);
    }

    /// Maskable interrupt: a hardware BRK with the B flag pushed clear.
    pub fn irq(&mut self) {
        if self.flag(FLAG_I) {
            return;
        }
        self.push_word(self.pc);
        self.push((self.p | FLAG_U) & !FLAG_B);
        self.set_flag(FLAG_I, true);
        self.pc = self.read_word(IRQ_VECTOR);
        self.waiting = false;
    }

    /// Non-maskable interrupt through 0xFFFA.
    pub fn nmi(&mut self) {
        self.push_word(self.pc);
        self.push((self.p | FLAG_U) & !FLAG_B);
        self.set_flag(FLAG_I, true);
        self.pc = self.read_word(NMI_VECTOR);
        self.waiting = false;
    }

    fn read(&self, addr: u16) -> u8 {
        self.mem.read(addr).unwrap_or(0)
    }

    fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Memory write with the mapped side effects of the I/O region.
    fn write(&mut self, addr: u16, val: u8) {
        self.mem.write(addr, val);
        match addr {
            FRAMEBUF_START..=FRAMEBUF_END => {
                let cell = addr - FRAMEBUF_START;
                self.host
                    .draw_pixel((cell % FRAMEBUF_COLS) as u8, (cell / FRAMEBUF_COLS) as u8, val);
            }
            CLEAR_STROBE if val != 0 => {
                self.host.clear_screen();
                self.mem.write(addr, 0);
            }
            BEEP_STROBE if val != 0 => {
                self.host.beep();
                self.mem.write(addr, 0);
            }
            _ => {}
        }
    }

    fn effective_addr(&self, mode: AddrMode) -> u16 {
        match mode {
            AddrMode::Immediate => self.pc.wrapping_add(1),
            AddrMode::ZeroPage => self.read(self.pc.wrapping_add(1)) as u16,
            AddrMode::ZeroPageX => self.read(self.pc.wrapping_add(1)).wrapping_add(self.x) as u16,
            AddrMode::ZeroPageY => self.read(self.pc.wrapping_add(1)).wrapping_add(self.y) as u16,
            AddrMode::Absolute => self.read_word(self.pc.wrapping_add(1)),
            AddrMode::AbsoluteX => self
                .read_word(self.pc.wrapping_add(1))
                .wrapping_add(self.x as u16),
            AddrMode::AbsoluteY => self
                .read_word(self.pc.wrapping_add(1))
                .wrapping_add(self.y as u16),
            AddrMode::Indirect => {
                let ptr = self.read_word(self.pc.wrapping_add(1));
                self.read_word(ptr)
            }
            AddrMode::IndirectX => {
                let zp = self.read(self.pc.wrapping_add(1)).wrapping_add(self.x);
                self.read_word_zp(zp)
            }
            AddrMode::IndirectY => {
                let zp = self.read(self.pc.wrapping_add(1));
                self.read_word_zp(zp).wrapping_add(self.y as u16)
            }
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Relative => {
                unreachable!("no effective address for {mode:?}")
            }
        }
    }

    /// Pointer reads through the zero page wrap within it.
    fn read_word_zp(&self, zp: u8) -> u16 {
        let lo = self.read(zp as u16) as u16;
        let hi = self.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn load(&mut self, mode: AddrMode) -> u8 {
        let addr = self.effective_addr(mode);
        self.read(addr)
    }

    /// Read-modify-write dispatch shared by the shift and inc/dec family.
    fn rmw(&mut self, mode: AddrMode, f: fn(&mut Self, u8) -> u8) {
        if matches!(mode, AddrMode::Accumulator | AddrMode::Implied) {
            let a = self.a;
            self.a = f(self, a);
        } else {
            let addr = self.effective_addr(mode);
            let v = self.read(addr);
            let r = f(self, v);
            self.write(addr, r);
        }
    }

    fn branch_if(&mut self, cond: bool, next: u16) -> u16 {
        if cond {
            let disp = self.read(self.pc.wrapping_add(1)) as i8;
            next.wrapping_add_signed(disp as i16)
        } else {
            next
        }
    }

    fn push(&mut self, val: u8) {
        self.mem.write(STACK_PAGE + self.sp as u16, val);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_PAGE + self.sp as u16)
    }

    fn push_word(&mut self, val: u16) {
        self.push((val >> 8) as u8);
        self.push(val as u8);
    }

    fn pull_word(&mut self) -> u16 {
        let lo = self.pull() as u16;
        let hi = self.pull() as u16;
        (hi << 8) | lo
    }

    fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.p |= mask;
        } else {
            self.p &= !mask;
        }
        // Bit 5 reads as 1 after any flag mutation
        self.p |= FLAG_U;
    }

    fn set_nz(&mut self, val: u8) {
        self.set_flag(FLAG_Z, val == 0);
        self.set_flag(FLAG_N, val & 0x80 != 0);
    }

    fn compare(&mut self, reg: u8, m: u8) {
        self.set_flag(FLAG_C, reg >= m);
        self.set_nz(reg.wrapping_sub(m));
    }

    /// Add with carry; packed BCD when the D flag is set, with C reporting
    /// the decimal carry and Z/N following the decimal result.
    fn adc(&mut self, m: u8) {
        let c = (self.p & FLAG_C) as u16;
        let bin = self.a as u16 + m as u16 + c;
        let overflow = !(self.a ^ m) & (self.a ^ bin as u8) & 0x80 != 0;
        if self.flag(FLAG_D) {
            let mut lo = (self.a & 0x0F) as u16 + (m & 0x0F) as u16 + c;
            let mut hi = (self.a >> 4) as u16 + (m >> 4) as u16;
            if lo > 9 {
                lo -= 10;
                hi += 1;
            }
            let carry = hi > 9;
            if carry {
                hi -= 10;
            }
            self.a = ((hi as u8) << 4) | lo as u8;
            self.set_flag(FLAG_C, carry);
        } else {
            self.a = bin as u8;
            self.set_flag(FLAG_C, bin > 0xFF);
        }
        self.set_flag(FLAG_V, overflow);
        self.set_nz(self.a);
    }

    /// Subtract with borrow (inverted carry); packed BCD when D is set.
    fn sbc(&mut self, m: u8) {
        let borrow = (1 - (self.p & FLAG_C)) as i16;
        let bin = self.a as i16 - m as i16 - borrow;
        let overflow = (self.a ^ m) & (self.a ^ bin as u8) & 0x80 != 0;
        if self.flag(FLAG_D) {
            let mut lo = (self.a & 0x0F) as i16 - (m & 0x0F) as i16 - borrow;
            let mut hi = (self.a >> 4) as i16 - (m >> 4) as i16;
            if lo < 0 {
                lo += 10;
                hi -= 1;
            }
            let carry = hi >= 0;
            if !carry {
                hi += 10;
            }
            self.a = ((hi as u8) << 4) | lo as u8;
            self.set_flag(FLAG_C, carry);
        } else {
            self.a = bin as u8;
            self.set_flag(FLAG_C, bin >= 0);
        }
        self.set_flag(FLAG_V, overflow);
        self.set_nz(self.a);
    }

    fn asl_val(&mut self, v: u8) -> u8 {
        self.set_flag(FLAG_C, v & 0x80 != 0);
        let r = v << 1;
        self.set_nz(r);
        r
    }

    fn lsr_val(&mut self, v: u8) -> u8 {
        self.set_flag(FLAG_C, v & 0x01 != 0);
        let r = v >> 1;
        self.set_nz(r);
        r
    }

    fn rol_val(&mut self, v: u8) -> u8 {
        let carry_in = self.flag(FLAG_C) as u8;
        self.set_flag(FLAG_C, v & 0x80 != 0);
        let r = (v << 1) | carry_in;
        self.set_nz(r);
        r
    }

    fn ror_val(&mut self, v: u8) -> u8 {
        let carry_in = (self.flag(FLAG_C) as u8) << 7;
        self.set_flag(FLAG_C, v & 0x01 != 0);
        let r = (v >> 1) | carry_in;
        self.set_nz(r);
        r
    }

    fn inc_val(&mut self, v: u8) -> u8 {
        let r = v.wrapping_add(1);
        self.set_nz(r);
        r
    }

    fn dec_val(&mut self, v: u8) -> u8 {
        let r = v.wrapping_sub(1);
        self.set_nz(r);
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Assembler;

    #[derive(Default)]
    struct TraceHost {
        out: Vec<u16>,
        pixels: Vec<(u8, u8, u8)>,
        beeps: usize,
        clears: usize,
        input: VecDeque<String>,
    }

    impl Host for TraceHost {
        fn draw_pixel(&mut self, x: u8, y: u8, color: u8) {
            self.pixels.push((x, y, color));
        }

        fn clear_screen(&mut self) {
            self.clears += 1;
        }

        fn beep(&mut self) {
            self.beeps += 1;
        }

        fn write_output_char(&mut self, code: u16) {
            self.out.push(code);
        }

        fn read_input_line(&mut self) -> String {
            self.input.pop_front().unwrap_or_default()
        }

        fn log(&mut self, _text: &str) {}

        fn log_error(&mut self, _text: &str) {}
    }

    fn boot(src: &str) -> RunState<TraceHost> {
        let asm = Assembler::new(src).unwrap();
        let mut image = asm.assemble().unwrap();
        image.backpatch().unwrap();
        RunState::new(image, TraceHost::default())
    }

    fn run_to_halt(state: &mut RunState<TraceHost>) {
        let outcome = state.run(Pacing::default(), || false).unwrap();
        assert_eq!(outcome, Step::Halt);
    }

    #[test]
    fn adds_and_stores() {
        let mut state = boot(
            ".ORG $FFFC .DW START .ORG $8000 START: LDA #$05 ADC #$03 STA $10 BRK",
        );
        assert_eq!(state.pc(), 0x8000);
        run_to_halt(&mut state);
        assert_eq!(state.mem().read(0x10), Some(8));
        assert_eq!(state.a(), 8);
        assert!(!state.flag(FLAG_Z));
        assert!(!state.flag(FLAG_N));
        assert!(!state.flag(FLAG_C));
    }

    #[test]
    fn counts_in_a_loop() {
        let mut state = boot("LDX #$00 LOOP: INX CPX #$05 BNE LOOP BRK");
        run_to_halt(&mut state);
        assert_eq!(state.x(), 5);
        assert!(state.flag(FLAG_Z));
        assert!(state.flag(FLAG_C));
    }

    #[test]
    fn bcd_addition_wraps_at_one_hundred() {
        let mut state = boot("LDA #$99 SED CLC ADC #$01 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x00);
        assert!(state.flag(FLAG_C));
        assert!(state.flag(FLAG_Z));
    }

    #[test]
    fn bcd_addition_pairs() {
        let mut state = boot("SED LDA #$35 CLC ADC #$48 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x83);
        assert!(!state.flag(FLAG_C));

        let mut state = boot("SED LDA #$58 CLC ADC #$46 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x04);
        assert!(state.flag(FLAG_C));
    }

    #[test]
    fn bcd_subtraction() {
        let mut state = boot("SED SEC LDA #$42 SBC #$13 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x29);
        assert!(state.flag(FLAG_C));

        let mut state = boot("SED SEC LDA #$21 SBC #$34 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x87);
        assert!(!state.flag(FLAG_C));
    }

    #[test]
    fn framebuffer_store_reaches_the_host() {
        let mut state = boot("DEFINE PTR $0200 LDA #$FF STA PTR BRK");
        run_to_halt(&mut state);
        assert_eq!(state.mem().read(0x0200), Some(0xFF));
        assert_eq!(state.host().pixels, vec![(0, 0, 0xFF)]);
    }

    #[test]
    fn reset_vector_out_and_halt() {
        let mut state = boot(".ORG $FFFC .DW START .ORG $8000 START: LDA #$41 OUT HLT");
        run_to_halt(&mut state);
        assert_eq!(state.host().out, vec![0x41]);
        assert!(!state.executing());
    }

    #[test]
    fn adc_from_zero_mirrors_operand() {
        for v in [0x00u8, 0x45, 0x80, 0xFF] {
            let mut state = boot(&format!("ADC #{v}"));
            state.step().unwrap();
            assert_eq!(state.a(), v);
            assert!(!state.flag(FLAG_C));
            assert!(!state.flag(FLAG_V));
            assert_eq!(state.flag(FLAG_Z), v == 0);
            assert_eq!(state.flag(FLAG_N), v >= 0x80);
        }
    }

    #[test]
    fn adc_signed_overflow() {
        let mut state = boot("LDA #$50 ADC #$50 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0xA0);
        assert!(state.flag(FLAG_V));
        assert!(state.flag(FLAG_N));
        assert!(!state.flag(FLAG_C));
    }

    #[test]
    fn sbc_borrow_semantics() {
        let mut state = boot("SEC LDA #$10 SBC #$01 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x0F);
        assert!(state.flag(FLAG_C));

        let mut state = boot("SEC LDA #$00 SBC #$01 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0xFF);
        assert!(!state.flag(FLAG_C));
        assert!(state.flag(FLAG_N));
    }

    #[test]
    fn stack_round_trip_restores_last_pushed() {
        let mut state = boot("LDA #$11 PHA LDA #$22 PHA LDA #$00 PLA PLA BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x11);
        assert_eq!(state.sp(), 0xFF);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut state = boot("JSR SUB BRK SUB: RTS");
        state.step().unwrap(); // JSR
        assert_eq!(state.pc(), 0x0804);
        assert_eq!(state.sp(), 0xFD);
        state.step().unwrap(); // RTS
        assert_eq!(state.pc(), 0x0803);
        assert_eq!(state.sp(), 0xFF);
    }

    #[test]
    fn branch_not_taken_advances_two() {
        let mut state = boot("BEQ SKIP NOP SKIP: BRK");
        state.step().unwrap();
        assert_eq!(state.pc(), 0x0802);
    }

    #[test]
    fn branch_taken_lands_on_target() {
        let mut state = boot("SEC BCS SKIP NOP SKIP: BRK");
        state.step().unwrap();
        state.step().unwrap();
        assert_eq!(state.pc(), 0x0804);
    }

    #[test]
    fn php_pushes_break_set_and_plp_restores() {
        let mut state = boot("PHP PLP BRK");
        state.step().unwrap();
        assert_eq!(state.mem().read(0x01FF), Some(0x34));
        state.step().unwrap();
        assert_eq!(state.p(), 0x24);
    }

    #[test]
    fn brk_vectors_and_rti_returns() {
        let mut state = boot(
            "NOP BRK NOP NOP ISR: LDA #$07 STA $20 RTI .ORG $FFFE .DW ISR",
        );
        state.step().unwrap(); // NOP
        state.step().unwrap(); // BRK
        assert_eq!(state.pc(), 0x0804);
        assert!(state.flag(FLAG_I));
        assert_eq!(state.sp(), 0xFC);
        state.step().unwrap(); // LDA
        state.step().unwrap(); // STA
        state.step().unwrap(); // RTI
        assert_eq!(state.mem().read(0x20), Some(0x07));
        assert_eq!(state.pc(), 0x0803);
        assert_eq!(state.p(), 0x24);
        assert_eq!(state.sp(), 0xFF);
    }

    #[test]
    fn keyboard_interrupt_vectors_when_enabled() {
        let mut state = boot("CLI NOP NOP ISR: RTI .ORG $FFFE .DW ISR");
        state.set_keyboard_interrupt(true);
        state.step().unwrap(); // CLI
        state.key_event(65);
        assert_eq!(state.pc(), 0x0803);
        assert_eq!(state.mem().read(0x06E0), Some(65));
        assert!(state.flag(FLAG_I));
        state.step().unwrap(); // RTI
        assert_eq!(state.pc(), 0x0801);
        assert!(!state.flag(FLAG_I));
    }

    #[test]
    fn key_events_set_mapped_cells() {
        let mut state = boot("NOP");
        state.key_event(37);
        state.key_event(40);
        state.key_event(13);
        assert_eq!(state.mem().read(0x06E0), Some(1));
        assert_eq!(state.mem().read(0x06E3), Some(1));
        assert_eq!(state.mem().read(0x06E4), Some(1));
    }

    #[test]
    fn mouse_events_set_button_cells() {
        let mut state = boot("NOP");
        state.mouse_event(0b101);
        assert_eq!(state.mem().read(0x06F0), Some(1));
        assert_eq!(state.mem().read(0x06F1), Some(0));
        assert_eq!(state.mem().read(0x06F2), Some(1));
    }

    #[test]
    fn wai_suspends_until_resumed() {
        let mut state = boot("WAI NOP BRK");
        assert_eq!(state.step().unwrap(), Step::Wait);
        assert!(state.waiting());
        state.resume();
        assert_eq!(state.step().unwrap(), Step::Continue);
        assert_eq!(state.pc(), 0x0802);
    }

    #[test]
    fn in_buffers_a_line_with_nul_sentinel() {
        let mut state = boot("IN IN IN BRK");
        state.host_mut().input.push_back("AB".to_string());
        state.step().unwrap();
        assert_eq!(state.a(), b'A');
        state.step().unwrap();
        assert_eq!(state.a(), b'B');
        state.step().unwrap();
        assert_eq!(state.a(), 0);
    }

    #[test]
    fn ouy_emits_a_wide_character() {
        let mut state = boot("LDA #$01 LDY #$02 OUY BRK");
        run_to_halt(&mut state);
        assert_eq!(state.host().out, vec![0x0102]);
    }

    #[test]
    fn random_register_refreshes_each_step() {
        let mut state = boot("NOP BRK");
        assert_eq!(state.mem().read(0x00FE), None);
        state.step().unwrap();
        assert!(state.mem().read(0x00FE).is_some());
    }

    #[test]
    fn clear_and_beep_strobes_reset_their_cells() {
        let mut state = boot("LDA #$01 STA $06B0 STA $06B1 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.host().clears, 1);
        assert_eq!(state.host().beeps, 1);
        assert_eq!(state.mem().read(0x06B0), Some(0));
        assert_eq!(state.mem().read(0x06B1), Some(0));
    }

    #[test]
    fn unknown_opcode_aborts_with_diagnostic() {
        let mut state = boot(".DB $FF");
        let err = state.step().unwrap_err();
        assert!(err.to_string().contains("$FF"));
        assert!(!state.executing());
    }

    #[test]
    fn undefined_fetch_is_a_graceful_stop() {
        let mut state = boot("NOP");
        assert_eq!(state.step().unwrap(), Step::Continue);
        assert_eq!(state.step().unwrap(), Step::Halt);
        assert!(!state.executing());
    }

    #[test]
    fn compare_orders_unsigned() {
        let mut state = boot("LDA #$05 CMP #$05 BRK");
        run_to_halt(&mut state);
        assert!(state.flag(FLAG_Z));
        assert!(state.flag(FLAG_C));

        let mut state = boot("LDA #$05 CMP #$06 BRK");
        run_to_halt(&mut state);
        assert!(!state.flag(FLAG_C));
        assert!(state.flag(FLAG_N));
    }

    #[test]
    fn bit_copies_memory_high_bits() {
        let mut state = boot("LDA #$C0 STA $10 LDA #$0F BIT $10 BRK");
        run_to_halt(&mut state);
        assert!(state.flag(FLAG_Z));
        assert!(state.flag(FLAG_N));
        assert!(state.flag(FLAG_V));
    }

    #[test]
    fn shifts_capture_the_outgoing_bit() {
        let mut state = boot("LDA #$81 ASL A BRK");
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x02);
        assert!(state.flag(FLAG_C));

        let mut state = boot("LDA #$01 STA $10 ASL $10 BRK");
        run_to_halt(&mut state);
        assert_eq!(state.mem().read(0x10), Some(0x02));
    }

    #[test]
    fn indirect_y_addressing_loads_through_pointer() {
        let mut state = boot(
            "LDA #$77 STA $1235 LDA #$34 STA $10 LDA #$12 STA $11 LDY #$01 LDA ($10),Y BRK",
        );
        run_to_halt(&mut state);
        assert_eq!(state.a(), 0x77);
    }

    #[test]
    fn cancellation_marks_not_executing() {
        let mut state = boot("LOOP: JMP LOOP");
        let outcome = state.run(Pacing::default(), || true).unwrap();
        assert_eq!(outcome, Step::Halt);
        assert!(!state.executing());
    }
}
