use crate::*;

fn assemble_hex(source: &str) -> String {
    let program = assemble_source(source).unwrap_or_else(|errors| {
        panic!("{source:?} failed: {errors:?}");
    });
    let bytes: Vec<u8> = program.images.iter().flat_map(|image| image.bytes.clone()).collect();
    hex::encode(bytes)
}

#[test]
fn test_forward_absolute_reference() {
    let program = assemble_source("jp target\nnop\ntarget: halt").unwrap();
    assert_eq!(hex::encode(&program.images[0].bytes), "c304000076");
    assert_eq!(program.symbols.get("TARGET"), Some(&4));
}

#[test]
fn test_backward_relative_loop() {
    assert_eq!(assemble_hex("ld b,10\nloop: djnz loop"), "060a10fe");
}

#[test]
fn test_forward_relative_jump() {
    assert_eq!(assemble_hex("jr skip\nnop\nskip: ret"), "180100c9");
}

#[test]
fn test_conditional_jump_to_label() {
    assert_eq!(
        assemble_hex("top: dec a\njr nz,top\ncall z,done\ndone: ret"),
        "3d20fdcc0600c9"
    );
}

#[test]
fn test_label_as_immediate_and_address() {
    assert_eq!(
        assemble_hex("ld hl,data\nld a,(data)\nret\ndata: db 5"),
        "210700 3a0700 c9 05".replace(' ', "")
    );
}

#[test]
fn test_label_on_its_own_line() {
    let program = assemble_source("nop\nentry:\n\n  ld a,1").unwrap();
    assert_eq!(program.symbols.get("ENTRY"), Some(&1));
    assert_eq!(program.ranges[1].label.as_deref(), Some("ENTRY"));
    assert_eq!(program.ranges[0].label, None);
}

#[test]
fn test_labels_are_case_insensitive() {
    assert_eq!(assemble_hex("Start: jp START"), "c30000");
}

#[test]
fn test_symbol_table_is_sorted() {
    let program = assemble_source("zeta: nop\nalpha: nop\nmid: nop").unwrap();
    let names: Vec<&str> = program.symbols.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["ALPHA", "MID", "ZETA"]);
    assert_eq!(program.symbols["MID"], 2);
}

#[test]
fn test_undefined_symbol() {
    let errors = assemble_source("nop\njp nowhere").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, 2);
    assert_eq!(
        errors[0].error,
        AssemblerError::UndefinedSymbol("NOWHERE".to_string())
    );
}

#[test]
fn test_duplicate_label() {
    let errors = assemble_source("here: nop\nhere: nop").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, 2);
    assert_eq!(
        errors[0].error,
        AssemblerError::DuplicateSymbol("HERE".to_string())
    );
}

#[test]
fn test_duplicate_keeps_first_definition() {
    let tokens = tokenize("here: nop\nhere: halt\njp here");
    let (items, _) = Parser::new().parse(&tokens);
    let assembly = Assembler::new().assemble(&items);
    assert_eq!(assembly.symbols["HERE"], 0);
    assert_eq!(assembly.ranges[2].bytes, vec![0xC3, 0x00, 0x00]);
}

#[test]
fn test_relative_jump_out_of_range() {
    let errors = assemble_source("jr far\norg $100\nfar: nop").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].error,
        AssemblerError::RelativeOutOfRange { target: 0x100, offset: 254 }
    ));
}

#[test]
fn test_relative_jump_range_edges() {
    // 127 forward from the end of the JR at $1000
    assert_eq!(
        assemble_hex("org $1000\njr $1081\norg $1100\njr $1082"),
        "187f1880"
    );
}

#[test]
fn test_org_from_later_constant_is_a_phase_error() {
    let errors = assemble_source("org start\nhere: jp here\nconst start,$100").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, 2);
    assert_eq!(
        errors[0].error,
        AssemblerError::PhaseError {
            name: "HERE".to_string(),
            sized: 0,
            actual: 0x100,
        }
    );
    assert_eq!(
        errors[0].to_string(),
        "line 2: HERE moved between passes ($0000, then $0100)"
    );
}

#[test]
fn test_org_from_earlier_constant_is_stable() {
    let program = assemble_source("const start,$100\norg start\nhere: jp here").unwrap();
    assert_eq!(hex::encode(&program.images[0].bytes), "c30001");
    assert_eq!(program.symbols["HERE"], 0x100);
}
