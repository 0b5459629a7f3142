use std::fs;
use std::io::{self, BufRead as _, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use moss::host::{Host, TermHost};
use moss::runtime::{Pacing, RunState, Step};
use moss::{disasm, term, Assembler, Image};

/// Moss is an educational 6502 toolchain: a two-pass assembler and an
/// instruction-level simulator with memory-mapped I/O.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file and run it
    Run {
        /// .asm file to run
        name: PathBuf,
        /// Instructions per tick
        #[arg(long, default_value_t = 512)]
        ips: u32,
        /// Milliseconds to sleep between ticks
        #[arg(long, default_value_t = 0)]
        interval: u64,
        /// Execute one instruction per Enter press, showing registers
        #[arg(long)]
        debug: bool,
    },
    /// Assemble a `.asm` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Assemble a `.asm` file and print the listing back out
    Disasm {
        /// `.asm` file to disassemble
        name: PathBuf,
    },
    /// Assemble a `.asm` file and hexdump the image
    Dump {
        /// `.asm` file to dump
        name: PathBuf,
        /// First address of the dump window
        #[arg(long, value_parser = parse_addr)]
        start: Option<u16>,
        /// Last address of the dump window
        #[arg(long, value_parser = parse_addr)]
        end: Option<u16>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Command::Run {
            name,
            ips,
            interval,
            debug,
        }) => {
            let image = assemble_or_exit(&name);
            let pacing = Pacing {
                steps_per_tick: ips,
                interval: Duration::from_millis(interval),
            };
            run_program(image, pacing, debug);
            Ok(())
        }
        Some(Command::Check { name }) => {
            let _ = assemble_or_exit(&name);
            println!("{:>12} with 0 errors", "Finished".green().bold());
            Ok(())
        }
        Some(Command::Disasm { name }) => {
            let image = assemble_or_exit(&name);
            print!("{}", disasm::disassemble(&image, 0x0000, 0xFFFF));
            Ok(())
        }
        Some(Command::Dump { name, start, end }) => {
            let image = assemble_or_exit(&name);
            print!(
                "{}",
                disasm::dump(
                    &image,
                    start.unwrap_or(0x0000),
                    end.unwrap_or(0xFFFF)
                )
            );
            Ok(())
        }
        None => {
            if let Some(path) = args.path {
                let image = assemble_or_exit(&path);
                run_program(image, Pacing::default(), false);
                Ok(())
            } else {
                println!("\n~ moss v{VERSION} ~");
                println!("{SHORT_INFO}");
                Ok(())
            }
        }
    }
}

/// Assemble a source file, or log the report plus the standard failure
/// message (and beep) and exit.
fn assemble_or_exit(name: &Path) -> Image {
    match assemble_file(name) {
        Ok(image) => image,
        Err(report) => {
            eprintln!("{report:?}");
            let mut host = TermHost::new();
            host.log_error("Could not assemble code.");
            host.beep();
            std::process::exit(1);
        }
    }
}

fn assemble_file(name: &Path) -> Result<Image> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    println!(
        "{:>12} target {}",
        "Assembling".green().bold(),
        name.display()
    );
    let asm = Assembler::new(&contents)?;
    let mut image = asm.assemble()?;
    image.backpatch()?;
    Ok(image)
}

fn run_program(image: Image, pacing: Pacing, debug: bool) {
    let mut program = RunState::new(image, TermHost::new());
    println!("{:>12} binary", "Running".green().bold());

    if debug {
        debug_loop(&mut program);
        return;
    }

    // Raw mode so Escape reaches the cancel check between batches; with no
    // terminal attached there is nothing to poll
    let raw = term::RawGuard::new();
    let outcome = match raw {
        Some(_) => program.run(pacing, term::cancel_requested),
        None => program.run(pacing, || false),
    };
    drop(raw);

    match outcome {
        Ok(Step::Halt) => println!("\n{:>12}", "Halted".cyan()),
        Ok(Step::Wait) => println!(
            "\n{:>12} in WAI with no interrupt source; stopping",
            "Waiting".yellow()
        ),
        Ok(Step::Continue) => unreachable!("run only returns on halt or wait"),
        Err(report) => {
            eprintln!("{report:?}");
            std::process::exit(1);
        }
    }
}

/// One instruction per Enter press; `q` leaves the debugger.
fn debug_loop(program: &mut RunState<TermHost>) {
    print_registers(program);
    let stdin = io::stdin();
    loop {
        eprint!("(step) ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            // Quit on read errors and end of input
            Err(_) | Ok(0) => return,
            Ok(_) if line.trim() == "q" => return,
            Ok(_) => {}
        }
        match program.step() {
            Ok(Step::Continue) => print_registers(program),
            Ok(Step::Wait) => {
                eprintln!("Reached WAI. Press Enter to resume.");
                program.resume();
            }
            Ok(Step::Halt) => {
                println!("\n{:>12}", "Halted".cyan());
                return;
            }
            Err(report) => {
                eprintln!("{report:?}");
                return;
            }
        }
    }
}

fn print_registers<H: Host>(state: &RunState<H>) {
    let p = state.p();
    let flags: String = "NV-BDIZC"
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if c == '-' {
                '-'
            } else if p & (1 << (7 - i)) != 0 {
                c
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect();
    eprintln!(
        "A  0x{:02x}  X  0x{:02x}  Y  0x{:02x}",
        state.a(),
        state.x(),
        state.y()
    );
    eprintln!(
        "SP 0x{:02x}  PC 0x{:04x}  P  {flags}",
        state.sp(),
        state.pc()
    );
}

/// Accepts `$FFFC`, `0xFFFC`, or plain decimal.
fn parse_addr(text: &str) -> Result<u16, String> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix('$') {
        (hex, 16)
    } else if let Some(hex) = text.strip_prefix("0x") {
        (hex, 16)
    } else {
        (text, 10)
    };
    u16::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

const SHORT_INFO: &str = r"
Welcome to moss (MOS Simulator & aSsembler), a toolchain for
learning 6502 assembly. Please use `-h` or `--help` to access the
usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
