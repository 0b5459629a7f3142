use miette::{miette, Report, Severity};

// Every assembler error carries a stable numeric code (1-22) verbatim in its
// message text so the status sink output stays greppable across releases. The
// `code` field carries the symbolic name for miette's diagnostic header.

// Pass 2 / fixup errors

pub fn label_not_found(sym: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "fixup::label",
        help = "define the label with `name:` or by placing the name on its own line.",
        "Error #1: label '{sym}' was not found",
    )
}

pub fn branch_label_not_found(sym: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "fixup::branch_label",
        help = "branches can only target labels defined somewhere in the source.",
        "Error #2: branch target '{sym}' was not found",
    )
}

pub fn branch_out_of_range(sym: &str, disp: i32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "fixup::branch_range",
        help = "relative branches reach -128..+127 bytes; use JMP for longer hops.",
        "Error #3: branch to '{sym}' is out of range (displacement {disp})",
    )
}

// Pass 1 errors

pub fn operand_type(mnemonic: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operand_type",
        help = "check the operands this instruction or directive accepts.",
        "Error #4: line {line}: missing or invalid operand for '{mnemonic}'",
    )
}

pub fn reserved_word(name: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::reserved",
        help = "mnemonics and directive names cannot be used as labels or constants.",
        "Error #5: line {line}: '{name}' is a reserved word",
    )
}

pub fn constant_already_defined(name: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::constant_dup",
        help = "constants are single-assignment; pick a different name.",
        "Error #6: line {line}: constant '{name}' is already defined",
    )
}

pub fn constant_not_defined(name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::constant_missing",
        help = "constants must be defined before the line that uses them.",
        "Error #7: constant '{name}' is not defined",
    )
}

pub fn high_low_byte_arg(sel: char) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::byte_selector",
        help = "only `<` (low byte) and `>` (high byte) are valid selectors.",
        "Error #8: invalid byte selector '{sel}'",
    )
}

pub fn org_missing(line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::org_missing",
        help = "ORG expects an address, e.g. `.ORG $8000`.",
        "Error #9: line {line}: ORG directive without an address",
    )
}

pub fn data_unclosed_string(item: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::data_string",
        help = "string items must be closed with a matching quote character.",
        "Error #10: line {line}: unterminated string in data directive: {item}",
    )
}

pub fn data_malformed_after_string(item: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::data_trailing",
        help = "separate items with commas; nothing may follow a closing quote.",
        "Error #11: line {line}: unexpected text after string in data directive: {item}",
    )
}

pub fn data_malformed(item: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::data_item",
        help = "data items are strings, numeric literals, constants, or labels.",
        "Error #12: line {line}: malformed data item: {item}",
    )
}

pub fn data_high_low_on_word(item: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::data_word_selector",
        help = ".DW emits both bytes; `<`/`>` selectors only apply to .DB items.",
        "Error #13: line {line}: byte selector on word data item: {item}",
    )
}

pub fn label_already_defined(name: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::label_dup",
        help = "labels are only allowed once per file.",
        "Error #14: line {line}: label '{name}' is already defined",
    )
}

pub fn label_and_constant(name: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::label_constant",
        help = "a name can be a label or a constant, never both.",
        "Error #15: line {line}: '{name}' is used as both label and constant",
    )
}

pub fn unknown_instruction(tok: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unknown_instruction",
        help = "statements start with a mnemonic, a directive, or a `label:`.",
        "Error #16: line {line}: unknown instruction '{tok}'",
    )
}

pub fn convert_value(tok: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::convert",
        help = "numeric literals are decimal, `$` hex, or `%` binary.",
        "Error #17: could not convert value '{tok}'",
    )
}

pub fn add_value(lhs: &str, rhs: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::arith",
        help = "expressions allow a single `+` or `-` continuation, e.g. `BASE+2`.",
        "Error #18: could not evaluate '{lhs}' with '{rhs}'",
    )
}

pub fn label_single_byte(operand: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::label_byte",
        help = "a label is 16 bits wide; prefix it with `<` or `>` to pick a byte.",
        "Error #19: line {line}: label '{operand}' used where a single byte is required",
    )
}

pub fn org_arg_invalid(tok: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::org_arg",
        help = "ORG takes a numeric literal or constant; labels are not allowed.",
        "Error #20: line {line}: invalid ORG address '{tok}'",
    )
}

pub fn invalid_addressing_mode(mnemonic: &str, operand: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::addressing",
        help = "this instruction does not support the addressing mode written here.",
        "Error #21: line {line}: invalid addressing mode for {mnemonic}: {operand}",
    )
}

pub fn operand_parse(operand: &str, line: u32) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operand",
        help = "see the addressing-form table: #n, n, n,X, n,Y, (n), (n,X), (n),Y.",
        "Error #22: line {line}: could not parse operand '{operand}'",
    )
}

// Runtime errors

pub fn unknown_opcode(addr: u16, byte: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = "run::opcode",
        help = "execution wandered into data, or the program overwrote itself.",
        "Unknown opcode ${byte:02X} at ${addr:04X}",
    )
}
