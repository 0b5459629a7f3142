use std::io::{self, BufRead as _, Write as _};

use colored::Colorize;

use crate::term;

/// The collaborators the interpreter talks to: framebuffer, beeper, character
/// I/O, and the status sink. The runtime stays renderer-agnostic behind this
/// trait; embedders plug in their own.
pub trait Host {
    /// One framebuffer cell changed. `x`/`y` are cell coordinates on the
    /// 40x30 grid; the renderer scales each cell to 4x4 screen pixels.
    fn draw_pixel(&mut self, x: u8, y: u8, color: u8);

    fn clear_screen(&mut self);

    fn beep(&mut self);

    /// Program character output; code 13 is a newline. OUY sends 16-bit
    /// codes, everything else fits in a byte.
    fn write_output_char(&mut self, code: u16);

    /// Blocking line prompt backing the IN instruction.
    fn read_input_line(&mut self) -> String;

    fn log(&mut self, text: &str);

    fn log_error(&mut self, text: &str);
}

/// Terminal-backed host used by the CLI. Pixels have nowhere to go on a
/// terminal, so the framebuffer calls are swallowed; everything else maps to
/// stdout/stderr.
#[derive(Default)]
pub struct TermHost;

impl TermHost {
    pub fn new() -> Self {
        TermHost
    }
}

impl Host for TermHost {
    fn draw_pixel(&mut self, _x: u8, _y: u8, _color: u8) {}

    fn clear_screen(&mut self) {}

    fn beep(&mut self) {
        print!("\x07");
        let _ = io::stdout().flush();
    }

    fn write_output_char(&mut self, code: u16) {
        if code == 13 {
            // Raw mode may be active during a run; \r\n is safe either way
            print!("\r\n");
        } else if let Some(c) = char::from_u32(code as u32) {
            print!("{c}");
        }
        let _ = io::stdout().flush();
    }

    fn read_input_line(&mut self) -> String {
        term::with_cooked(|| {
            print!("? ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
            line.trim_end_matches(['\r', '\n']).to_string()
        })
    }

    fn log(&mut self, text: &str) {
        eprintln!("{text}");
    }

    fn log_error(&mut self, text: &str) {
        eprintln!("{}", text.red());
    }
}
