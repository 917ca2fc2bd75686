use crate::*;

#[test]
fn test_org_moves_counter() {
    let program = assemble_source("ORG $200\nNOP").unwrap();
    assert_eq!(program.ranges[0].address, 0x200);
    assert_eq!(
        program.images,
        vec![Image {
            base: 0x200,
            bytes: vec![0x00]
        }]
    );
}

#[test]
fn test_org_splits_images() {
    let program = assemble_source("nop\norg $100\nhalt\norg $101\nret").unwrap();
    assert_eq!(program.images.len(), 2);
    assert_eq!(program.images[0].base, 0);
    assert_eq!(program.images[1].base, 0x100);
    assert_eq!(hex::encode(&program.images[1].bytes), "76c9");
}

#[test]
fn test_backward_org_starts_new_image() {
    let program = assemble_source("org $10\nnop\norg $8\nnop").unwrap();
    let bases: Vec<u16> = program.images.iter().map(|image| image.base).collect();
    assert_eq!(bases, vec![0x10, 0x08]);
}

#[test]
fn test_flatten_pads_between_regions() {
    let program = assemble_source("org $8000\nld a,1\norg $8004\nret").unwrap();
    let flat = flatten(&program.images, 0x00).unwrap();
    assert_eq!(flat.base, 0x8000);
    assert_eq!(hex::encode(&flat.bytes), "3e010000c9");
}

#[test]
fn test_initial_origin() {
    let program = Assembler::with_origin(0x8000).assemble_source("nop\nhere: nop").unwrap();
    assert_eq!(program.images[0].base, 0x8000);
    assert_eq!(program.symbols["HERE"], 0x8001);
}

#[test]
fn test_org_from_constant() {
    let program = assemble_source("const base,$4000\norg base\nnop").unwrap();
    assert_eq!(program.images[0].base, 0x4000);
}

#[test]
fn test_org_out_of_range() {
    let errors = assemble_source("org $10000").unwrap_err();
    assert_eq!(
        errors[0].error,
        AssemblerError::ValueOutOfRange { value: 0x10000, bits: 16 }
    );
}

#[test]
fn test_org_requires_value() {
    let errors = assemble_source("org\nnop").unwrap_err();
    assert_eq!(errors[0].error, AssemblerError::MissingOperand("ORG".to_string()));
}

#[test]
fn test_counter_wraps_at_top_of_memory() {
    let program = assemble_source("org $FFFF\nnop\nhalt").unwrap();
    assert_eq!(program.ranges[1].address, 0x0000);
    assert_eq!(program.images.len(), 2);
}

#[test]
fn test_label_before_org_keeps_old_address() {
    let program = assemble_source("nop\nmark: org $300\nnop").unwrap();
    assert_eq!(program.symbols["MARK"], 1);
    assert_eq!(program.ranges[1].label.as_deref(), Some("MARK"));
}
