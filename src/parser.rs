use std::iter::Peekable;
use std::str::FromStr;
use std::vec::IntoIter;

use lazy_static::lazy_static;
use miette::Result;
use regex::Regex;

use crate::error;
use crate::image::{Fixup, Image};
use crate::lexer::{self, Token};
use crate::opcodes::{AddrMode, Mnemonic};
use crate::symbol;

/// Where code lands when no ORG has been seen. Matches the interpreter's
/// fallback program counter.
const EMIT_START: u16 = 0x0800;

lazy_static! {
    // Order is important since later patterns are supersets of earlier ones.
    // Do NOT rearrange without a good hard think.
    static ref RE_IMMEDIATE: Regex = Regex::new(r"^#([<>]?)(.+)$").unwrap();
    static ref RE_INDIRECT_X: Regex = Regex::new(r"(?i)^\((.+),X\)$").unwrap();
    static ref RE_INDIRECT_Y: Regex = Regex::new(r"(?i)^\((.+)\),Y$").unwrap();
    static ref RE_INDIRECT: Regex = Regex::new(r"^\((.+)\)$").unwrap();
    static ref RE_INDEXED_X: Regex = Regex::new(r"(?i)^([<>]?)(.+),X$").unwrap();
    static ref RE_INDEXED_Y: Regex = Regex::new(r"(?i)^([<>]?)(.+),Y$").unwrap();
    static ref RE_PLAIN: Regex = Regex::new(r"^([<>]?)(.+)$").unwrap();
}

/// Syntactic shape of an operand before the zero-page/absolute decision.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Shape {
    Immediate,
    Indirect,
    IndirectX,
    IndirectY,
    IndexedX,
    IndexedY,
    Plain,
}

/// An operand after constant substitution: either a settled number or a
/// symbol expression that pass 2 must resolve.
#[derive(Clone, PartialEq, Eq, Debug)]
enum Payload {
    /// `wide` records 16-bit literal syntax like `$0200`, which forces the
    /// absolute form even when the value happens to fit a byte.
    Value { val: u32, wide: bool },
    Symbol(String),
}

/// Two-pass assembler. Pass 1 runs in [`assemble`](Self::assemble) and emits
/// bytes into the image, leaving placeholders behind forward references;
/// pass 2 is [`Image::backpatch`].
pub struct Assembler {
    toks: Peekable<IntoIter<Token>>,
    image: Image,
    /// Emit pointer; doubles as the program counter of the assembled code.
    pc: u16,
}

impl Assembler {
    /// Cleans up the source and strips constant definitions out of the token
    /// stream. Resets the constant and label tables.
    pub fn new(src: &str) -> Result<Self> {
        symbol::reset_tables();
        let toks = scan_constants(lexer::scrub(src))?;
        Ok(Assembler {
            toks: toks.into_iter().peekable(),
            image: Image::new(),
            pc: EMIT_START,
        })
    }

    /// Pass 1: encode every statement, collecting fixups for anything that
    /// mentions a label that is not yet known. Call [`Image::backpatch`] on
    /// the result to finish the assemble.
    pub fn assemble(mut self) -> Result<Image> {
        while let Some(tok) = self.toks.next() {
            let line = tok.line;
            if let Some(name) = tok.text.strip_suffix(':') {
                symbol::define_label(name, self.pc, line)?;
                continue;
            }
            if tok.text.eq_ignore_ascii_case("ORG") || tok.text.eq_ignore_ascii_case(".ORG") {
                self.org(line)?;
            } else if tok.text.eq_ignore_ascii_case(".DB") {
                self.data_bytes(line)?;
            } else if tok.text.eq_ignore_ascii_case(".DW") {
                self.data_words(line)?;
            } else if let Ok(mn) = Mnemonic::from_str(&tok.text) {
                self.instruction(mn, line)?;
            } else {
                return Err(error::unknown_instruction(&tok.text, line));
            }
        }
        Ok(self.image)
    }

    /// Consume the next token if it can be an operand, i.e. does not open the
    /// next statement.
    fn next_operand(&mut self) -> Option<Token> {
        match self.toks.peek() {
            Some(tok) if !symbol::is_reserved(&tok.text) && !tok.text.ends_with(':') => {
                self.toks.next()
            }
            _ => None,
        }
    }

    fn org(&mut self, line: u32) -> Result<()> {
        let Some(tok) = self.next_operand() else {
            return Err(error::org_missing(line));
        };
        let (base, offset) = symbol::split_expr(&tok.text);
        if symbol::lookup_constant(base).is_none() && !symbol::is_number(base) {
            return Err(error::org_arg_invalid(&tok.text, line));
        }
        let resolved = symbol::add_value(base, offset)?;
        let val =
            symbol::convert_value(&resolved).map_err(|_| error::org_arg_invalid(&tok.text, line))?;
        self.pc = (val & 0xFFFF) as u16;
        Ok(())
    }

    fn data_bytes(&mut self, line: u32) -> Result<()> {
        let Some(tok) = self.next_operand() else {
            return Err(error::data_malformed(".DB", line));
        };
        for item in split_items(&tok.text, line)? {
            if item.is_empty() {
                return Err(error::data_malformed(&tok.text, line));
            }
            if item.starts_with('"') || item.starts_with('\'') {
                self.emit_string(&item, line)?;
                continue;
            }
            let (sel, rest) = symbol::split_selector(&item);
            let (base, _) = symbol::split_expr(rest);
            if symbol::lookup_constant(base).is_none()
                && !symbol::is_number(base)
                && !symbol::is_ident(base)
            {
                return Err(error::data_malformed(&item, line));
            }
            match resolve_payload(rest, line)? {
                Payload::Value { val, .. } => {
                    let byte = symbol::high_low_byte(val, sel)?;
                    self.emit((byte & 0xFF) as u8);
                }
                Payload::Symbol(expr) => {
                    // Labels in byte data default to their low byte
                    let sel = sel.unwrap_or('<');
                    self.image.push_fixup(Fixup::Byte {
                        at: self.pc,
                        expr: format!("{sel}{expr}"),
                    });
                    self.hole();
                }
            }
        }
        Ok(())
    }

    fn data_words(&mut self, line: u32) -> Result<()> {
        let Some(tok) = self.next_operand() else {
            return Err(error::data_malformed(".DW", line));
        };
        for item in split_items(&tok.text, line)? {
            if item.is_empty() || item.starts_with('"') || item.starts_with('\'') {
                return Err(error::data_malformed(&tok.text, line));
            }
            let (sel, rest) = symbol::split_selector(&item);
            if sel.is_some() {
                return Err(error::data_high_low_on_word(&item, line));
            }
            let (base, _) = symbol::split_expr(rest);
            if symbol::lookup_constant(base).is_none()
                && !symbol::is_number(base)
                && !symbol::is_ident(base)
            {
                return Err(error::data_malformed(&item, line));
            }
            match resolve_payload(rest, line)? {
                Payload::Value { val, .. } => {
                    self.emit((val & 0xFF) as u8);
                    self.emit(((val >> 8) & 0xFF) as u8);
                }
                Payload::Symbol(expr) => {
                    self.image.push_fixup(Fixup::Word {
                        at: self.pc,
                        expr,
                    });
                    self.hole();
                    self.hole();
                }
            }
        }
        Ok(())
    }

    fn emit_string(&mut self, item: &str, line: u32) -> Result<()> {
        let mut chars = item.chars();
        let Some(quote) = chars.next() else {
            return Err(error::data_malformed(item, line));
        };
        let body: String = chars.collect();
        let Some(close) = body.find(quote) else {
            return Err(error::data_unclosed_string(item, line));
        };
        if close != body.len() - quote.len_utf8() {
            return Err(error::data_malformed_after_string(item, line));
        }
        for c in body[..close].chars() {
            self.emit((c as u32 & 0xFF) as u8);
        }
        Ok(())
    }

    fn instruction(&mut self, mn: Mnemonic, line: u32) -> Result<()> {
        if mn.is_branch() {
            return self.branch(mn, line);
        }
        match self.next_operand() {
            None => {
                let op = mn
                    .opcode(AddrMode::Implied)
                    .or_else(|| mn.opcode(AddrMode::Accumulator))
                    .ok_or_else(|| error::operand_type(mn.name(), line))?;
                self.emit(op);
                Ok(())
            }
            Some(tok) => {
                if tok.text.eq_ignore_ascii_case("A") {
                    if let Some(op) = mn.opcode(AddrMode::Accumulator) {
                        self.emit(op);
                        return Ok(());
                    }
                }
                self.encode(mn, &tok.text, line)
            }
        }
    }

    fn branch(&mut self, mn: Mnemonic, line: u32) -> Result<()> {
        let Some(tok) = self.next_operand() else {
            return Err(error::operand_type(mn.name(), line));
        };
        let (sel, rest) = symbol::split_selector(&tok.text);
        if sel.is_some() {
            return Err(error::operand_parse(&tok.text, line));
        }
        let op = mn
            .opcode(AddrMode::Relative)
            .ok_or_else(|| error::invalid_addressing_mode(mn.name(), &tok.text, line))?;
        match resolve_payload(rest, line)? {
            // A pre-resolved displacement byte
            Payload::Value { val, .. } => {
                self.emit(op);
                self.emit((val & 0xFF) as u8);
            }
            Payload::Symbol(target) => {
                self.emit(op);
                self.image.push_fixup(Fixup::Branch {
                    at: self.pc,
                    target,
                });
                self.hole();
            }
        }
        Ok(())
    }

    fn encode(&mut self, mn: Mnemonic, text: &str, line: u32) -> Result<()> {
        let Some((shape, sel, inner)) = classify(text) else {
            return Err(error::operand_parse(text, line));
        };
        let payload = resolve_payload(inner, line)?;
        match shape {
            Shape::Immediate => {
                self.emit_byte_mode(mn, AddrMode::Immediate, sel, payload, text, line)
            }
            Shape::IndirectX => {
                self.emit_byte_mode(mn, AddrMode::IndirectX, None, payload, text, line)
            }
            Shape::IndirectY => {
                self.emit_byte_mode(mn, AddrMode::IndirectY, None, payload, text, line)
            }
            Shape::Indirect => self.emit_word_mode(mn, AddrMode::Indirect, payload, text, line),
            Shape::IndexedX => self.emit_direct(
                mn,
                AddrMode::ZeroPageX,
                AddrMode::AbsoluteX,
                sel,
                payload,
                text,
                line,
            ),
            Shape::IndexedY => self.emit_direct(
                mn,
                AddrMode::ZeroPageY,
                AddrMode::AbsoluteY,
                sel,
                payload,
                text,
                line,
            ),
            Shape::Plain => self.emit_direct(
                mn,
                AddrMode::ZeroPage,
                AddrMode::Absolute,
                sel,
                payload,
                text,
                line,
            ),
        }
    }

    /// Emit an instruction whose operand is a single byte (immediate,
    /// zero-page family, pre-indexed and post-indexed indirect).
    fn emit_byte_mode(
        &mut self,
        mn: Mnemonic,
        mode: AddrMode,
        sel: Option<char>,
        payload: Payload,
        text: &str,
        line: u32,
    ) -> Result<()> {
        let Some(op) = mn.opcode(mode) else {
            return Err(error::invalid_addressing_mode(mn.name(), text, line));
        };
        self.emit(op);
        match payload {
            Payload::Value { val, .. } => {
                let byte = symbol::high_low_byte(val, sel)?;
                self.emit((byte & 0xFF) as u8);
            }
            Payload::Symbol(expr) => {
                // A 16-bit label cannot fill a one-byte slot on its own
                let Some(sel) = sel else {
                    return Err(error::label_single_byte(text, line));
                };
                self.image.push_fixup(Fixup::Byte {
                    at: self.pc,
                    expr: format!("{sel}{expr}"),
                });
                self.hole();
            }
        }
        Ok(())
    }

    /// Emit an instruction with a two-byte little-endian operand (absolute
    /// family and indirect jumps).
    fn emit_word_mode(
        &mut self,
        mn: Mnemonic,
        mode: AddrMode,
        payload: Payload,
        text: &str,
        line: u32,
    ) -> Result<()> {
        let Some(op) = mn.opcode(mode) else {
            return Err(error::invalid_addressing_mode(mn.name(), text, line));
        };
        self.emit(op);
        match payload {
            Payload::Value { val, .. } => {
                self.emit((val & 0xFF) as u8);
                self.emit(((val >> 8) & 0xFF) as u8);
            }
            Payload::Symbol(expr) => {
                self.image.push_fixup(Fixup::Word {
                    at: self.pc,
                    expr,
                });
                self.hole();
                self.hole();
            }
        }
        Ok(())
    }

    /// Pick between the zero-page and absolute variants of a direct operand,
    /// preferring zero page when the value fits and the instruction has that
    /// form.
    #[allow(clippy::too_many_arguments)]
    fn emit_direct(
        &mut self,
        mn: Mnemonic,
        zp_mode: AddrMode,
        abs_mode: AddrMode,
        sel: Option<char>,
        payload: Payload,
        text: &str,
        line: u32,
    ) -> Result<()> {
        // A byte selector collapses the operand to its 8-bit form
        if sel.is_some() {
            return self.emit_byte_mode(mn, zp_mode, sel, payload, text, line);
        }
        match payload {
            Payload::Value { val, wide } => {
                if !wide && val < 0x100 && mn.opcode(zp_mode).is_some() {
                    self.emit_byte_mode(mn, zp_mode, None, Payload::Value { val, wide }, text, line)
                } else {
                    self.emit_word_mode(mn, abs_mode, Payload::Value { val, wide }, text, line)
                }
            }
            sym @ Payload::Symbol(_) => {
                if mn.opcode(abs_mode).is_some() {
                    self.emit_word_mode(mn, abs_mode, sym, text, line)
                } else {
                    self.emit_byte_mode(mn, zp_mode, None, sym, text, line)
                }
            }
        }
    }

    fn emit(&mut self, byte: u8) {
        self.image.write(self.pc, byte);
        self.pc = self.pc.wrapping_add(1);
    }

    /// Emit a placeholder cell for pass 2 to fill.
    fn hole(&mut self) {
        self.image.reserve(self.pc);
        self.pc = self.pc.wrapping_add(1);
    }
}

/// Pass 1a: pull `DEFINE name value`, `name = value`, and `name EQU value`
/// out of the token stream, evaluating any `±` continuation immediately.
fn scan_constants(toks: Vec<Token>) -> Result<Vec<Token>> {
    let mut out: Vec<Token> = Vec::new();
    let mut it = toks.into_iter();
    while let Some(tok) = it.next() {
        if tok.text.eq_ignore_ascii_case("DEFINE") {
            let name = it
                .next()
                .ok_or_else(|| error::operand_type("DEFINE", tok.line))?;
            let value = it
                .next()
                .ok_or_else(|| error::operand_type("DEFINE", tok.line))?;
            define_constant_expr(&name.text, &value.text, name.line)?;
        } else if tok.text == "=" || tok.text.eq_ignore_ascii_case("EQU") {
            // The name sits to the left; label inference may have given it a
            // colon already.
            let name = out
                .pop()
                .ok_or_else(|| error::operand_type(&tok.text, tok.line))?;
            let value = it
                .next()
                .ok_or_else(|| error::operand_type(&tok.text, tok.line))?;
            let bare = name.text.trim_end_matches(':');
            define_constant_expr(bare, &value.text, name.line)?;
        } else {
            out.push(tok);
        }
    }
    Ok(out)
}

fn define_constant_expr(name: &str, value: &str, line: u32) -> Result<()> {
    let (base, offset) = symbol::split_expr(value);
    let resolved = symbol::add_value(base, offset)?;
    symbol::define_constant(name, resolved, line)
}

/// Substitute constants into an operand expression and settle it into a
/// number, or keep it symbolic for pass 2 when it names a label.
fn resolve_payload(text: &str, line: u32) -> Result<Payload> {
    let (base, offset) = symbol::split_expr(text);
    if symbol::lookup_constant(base).is_some() || symbol::is_number(base) {
        let resolved = symbol::add_value(base, offset)?;
        let val = symbol::convert_value(&resolved)?;
        Ok(Payload::Value {
            val,
            wide: wide_literal(&resolved),
        })
    } else if symbol::is_ident(base) {
        Ok(Payload::Symbol(text.to_string()))
    } else {
        Err(error::operand_parse(text, line))
    }
}

/// 16-bit literal syntax: more hex digits than a byte, more than eight binary
/// digits, or a decimal value above 255.
fn wide_literal(text: &str) -> bool {
    match text.as_bytes().first() {
        Some(b'$') => text.len() - 1 > 2,
        Some(b'%') => text.len() - 1 > 8,
        _ => text.parse::<u32>().map(|v| v > 0xFF).unwrap_or(false),
    }
}

fn classify(text: &str) -> Option<(Shape, Option<char>, &str)> {
    if let Some(caps) = RE_IMMEDIATE.captures(text) {
        return Some((Shape::Immediate, sel_char(&caps), caps.get(2)?.as_str()));
    }
    if let Some(caps) = RE_INDIRECT_X.captures(text) {
        return Some((Shape::IndirectX, None, caps.get(1)?.as_str()));
    }
    if let Some(caps) = RE_INDIRECT_Y.captures(text) {
        return Some((Shape::IndirectY, None, caps.get(1)?.as_str()));
    }
    if let Some(caps) = RE_INDIRECT.captures(text) {
        return Some((Shape::Indirect, None, caps.get(1)?.as_str()));
    }
    if let Some(caps) = RE_INDEXED_X.captures(text) {
        return Some((Shape::IndexedX, sel_char(&caps), caps.get(2)?.as_str()));
    }
    if let Some(caps) = RE_INDEXED_Y.captures(text) {
        return Some((Shape::IndexedY, sel_char(&caps), caps.get(2)?.as_str()));
    }
    if let Some(caps) = RE_PLAIN.captures(text) {
        return Some((Shape::Plain, sel_char(&caps), caps.get(2)?.as_str()));
    }
    None
}

fn sel_char(caps: &regex::Captures) -> Option<char> {
    caps.get(1).and_then(|m| m.as_str().chars().next())
}

/// Quote-aware split of a compacted data operand list on commas.
fn split_items(list: &str, line: u32) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    for c in list.chars() {
        match c {
            '"' | '\'' => {
                match quote {
                    Some(q) if q == c => quote = None,
                    None => quote = Some(c),
                    Some(_) => {}
                }
                cur.push(c);
            }
            ',' if quote.is_none() => items.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    if quote.is_some() {
        return Err(error::data_unclosed_string(list, line));
    }
    items.push(cur);
    Ok(items)
}

#[cfg(test)]
mod test {
    use super::*;

    fn assemble(src: &str) -> Image {
        let asm = Assembler::new(src).unwrap();
        let mut image = asm.assemble().unwrap();
        image.backpatch().unwrap();
        image
    }

    fn assemble_err(src: &str) -> String {
        let report = match Assembler::new(src) {
            Err(e) => e,
            Ok(asm) => match asm.assemble() {
                Err(e) => e,
                Ok(mut image) => image
                    .backpatch()
                    .expect_err("source was expected to fail assembly"),
            },
        };
        report.to_string()
    }

    fn bytes(image: &Image, start: u16, len: u16) -> Vec<u8> {
        (0..len)
            .map(|i| image.read(start.wrapping_add(i)).unwrap())
            .collect()
    }

    #[test]
    fn encodes_immediate_and_zero_page() {
        let image = assemble("LDA #$05 STA $10 BRK");
        assert_eq!(bytes(&image, 0x0800, 5), vec![0xA9, 0x05, 0x85, 0x10, 0x00]);
    }

    #[test]
    fn encodes_absolute_and_indexed_forms() {
        let image = assemble("STA $0200 LDA $0300,X LDX $10,Y");
        assert_eq!(
            bytes(&image, 0x0800, 8),
            vec![0x8D, 0x00, 0x02, 0xBD, 0x00, 0x03, 0xB6, 0x10]
        );
    }

    #[test]
    fn encodes_indirect_forms() {
        let image = assemble("LDA ($10,X) LDA ($20),Y JMP ($FFFC)");
        assert_eq!(
            bytes(&image, 0x0800, 7),
            vec![0xA1, 0x10, 0xB1, 0x20, 0x6C, 0xFC, 0xFF]
        );
    }

    #[test]
    fn wide_literal_syntax_forces_absolute() {
        // $0010 fits a byte but is written in 16-bit syntax
        let image = assemble("LDA $0010");
        assert_eq!(bytes(&image, 0x0800, 3), vec![0xAD, 0x10, 0x00]);
    }

    #[test]
    fn promotes_to_absolute_without_zero_page_form() {
        let image = assemble("JMP $10");
        assert_eq!(bytes(&image, 0x0800, 3), vec![0x4C, 0x10, 0x00]);
    }

    #[test]
    fn accumulator_and_implied_forms() {
        let image = assemble("ASL LSR A INX");
        assert_eq!(bytes(&image, 0x0800, 3), vec![0x0A, 0x4A, 0xE8]);
    }

    #[test]
    fn forward_reference_backpatches() {
        let image = assemble("JMP LATER NOP LATER: BRK");
        assert_eq!(bytes(&image, 0x0800, 5), vec![0x4C, 0x04, 0x08, 0xEA, 0x00]);
    }

    #[test]
    fn label_arithmetic_in_operands() {
        let image = assemble("JMP TABLE+2 TABLE: .DB 1,2,3");
        assert_eq!(bytes(&image, 0x0800, 3), vec![0x4C, 0x05, 0x08]);
    }

    #[test]
    fn backward_branch_encodes_twos_complement() {
        let image = assemble("LDX #$00 LOOP: INX CPX #$05 BNE LOOP BRK");
        assert_eq!(
            bytes(&image, 0x0800, 8),
            vec![0xA2, 0x00, 0xE8, 0xE0, 0x05, 0xD0, 0xFB, 0x00]
        );
    }

    #[test]
    fn byte_selectors_on_labels() {
        let image = assemble("LDA #<TARGET LDX #>TARGET TARGET: BRK");
        assert_eq!(bytes(&image, 0x0800, 4), vec![0xA9, 0x04, 0xA2, 0x08]);
    }

    #[test]
    fn constant_definitions_in_all_three_forms() {
        let image = assemble(
            r#"
            DEFINE PTR $0200
            FIVE = 5
            NEXT EQU PTR+1
            LDA #FIVE
            STA PTR
            STA NEXT
            "#,
        );
        assert_eq!(
            bytes(&image, 0x0800, 8),
            vec![0xA9, 0x05, 0x8D, 0x00, 0x02, 0x8D, 0x01, 0x02]
        );
    }

    #[test]
    fn zero_page_constant_keeps_zero_page_form() {
        let image = assemble("DEFINE FLAG $10 LDA FLAG");
        assert_eq!(bytes(&image, 0x0800, 2), vec![0xA5, 0x10]);
    }

    #[test]
    fn org_moves_the_emit_pointer() {
        let image = assemble(".ORG $FFFC .DW START .ORG $8000 START: LDA #$41");
        assert_eq!(bytes(&image, 0xFFFC, 2), vec![0x00, 0x80]);
        assert_eq!(bytes(&image, 0x8000, 2), vec![0xA9, 0x41]);
    }

    #[test]
    fn data_bytes_strings_and_selectors() {
        let image = assemble(".ORG $0900 .DB \"AB\", $41, 2 .DW $1234");
        assert_eq!(
            bytes(&image, 0x0900, 6),
            vec![0x41, 0x42, 0x41, 0x02, 0x34, 0x12]
        );
    }

    #[test]
    fn data_string_spaces_become_explicit_bytes() {
        let image = assemble(".DB \"A B\"");
        assert_eq!(bytes(&image, 0x0800, 3), vec![0x41, 0x20, 0x42]);
    }

    #[test]
    fn data_label_defaults_to_low_byte() {
        let image = assemble("START: .DB START, >START");
        assert_eq!(bytes(&image, 0x0800, 2), vec![0x00, 0x08]);
    }

    #[test]
    fn data_words_take_labels() {
        let image = assemble(".ORG $FFFA .DW HANDLER .ORG $0900 HANDLER: RTI");
        assert_eq!(bytes(&image, 0xFFFA, 2), vec![0x00, 0x09]);
    }

    // Error taxonomy

    #[test]
    fn missing_label_is_error_1() {
        assert!(assemble_err("JMP LATER").contains("Error #1"));
    }

    #[test]
    fn missing_branch_target_is_error_2() {
        assert!(assemble_err("BNE NOWHERE").contains("Error #2"));
    }

    #[test]
    fn long_branch_is_error_3() {
        let err = assemble_err(".ORG $0800 BNE FAR .ORG $0900 FAR: BRK");
        assert!(err.contains("Error #3"));
    }

    #[test]
    fn reserved_label_is_error_5() {
        assert!(assemble_err("LDA: BRK").contains("Error #5"));
    }

    #[test]
    fn duplicate_constant_is_error_6() {
        assert!(assemble_err("A1 = 1 A1 = 2").contains("Error #6"));
    }

    #[test]
    fn unclosed_string_is_error_10() {
        assert!(assemble_err(".DB \"AB").contains("Error #10"));
    }

    #[test]
    fn text_after_string_is_error_11() {
        assert!(assemble_err(".DB \"AB\"X").contains("Error #11"));
    }

    #[test]
    fn selector_on_word_data_is_error_13() {
        assert!(assemble_err("TAB: .DW <TAB").contains("Error #13"));
    }

    #[test]
    fn duplicate_label_is_error_14() {
        assert!(assemble_err("TWICE: NOP TWICE: BRK").contains("Error #14"));
    }

    #[test]
    fn label_constant_clash_is_error_15() {
        assert!(assemble_err("NAME = 1 NAME: BRK").contains("Error #15"));
    }

    #[test]
    fn unknown_instruction_is_error_16() {
        assert!(assemble_err("LDZ #$01").contains("Error #16"));
    }

    #[test]
    fn bare_label_in_byte_slot_is_error_19() {
        assert!(assemble_err("LDA #TARGET TARGET: BRK").contains("Error #19"));
    }

    #[test]
    fn org_with_label_is_error_20() {
        assert!(assemble_err("SPOT: ORG SPOT").contains("Error #20"));
    }

    #[test]
    fn unsupported_mode_is_error_21() {
        // LDX has no ,X form
        assert!(assemble_err("LDX $10,X").contains("Error #21"));
    }

    #[test]
    fn garbage_operand_is_error_22() {
        assert!(assemble_err("LDA $10)").contains("Error #22"));
    }

    #[test]
    fn successful_assemble_leaves_no_fixups() {
        let image = assemble("JMP END NOP END: BRK");
        assert_eq!(image.pending_fixups(), 0);
    }
}
