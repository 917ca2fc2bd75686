use crate::*;

fn assemble_hex(source: &str) -> String {
    let program = assemble_source(source).unwrap_or_else(|errors| {
        panic!("{source:?} failed: {errors:?}");
    });
    hex::encode(&program.images[0].bytes)
}

#[test]
fn test_store_through_index_register() {
    assert_eq!(assemble_hex("LD IX,$1003\nLD (IX+0),A"), "dd210310dd7700");
}

#[test]
fn test_twos_complement_displacement() {
    assert_eq!(assemble_hex("LD (IX+3),H"), "dd7403");
    assert_eq!(assemble_hex("LD (IX-1),D"), "dd72ff");
    assert_eq!(assemble_hex("ld a,(iy-128)"), "fd7e80");
    assert_eq!(assemble_hex("ld a,(iy+127)"), "fd7e7f");
}

#[test]
fn test_bare_index_means_zero_displacement() {
    assert_eq!(assemble_hex("ld a,(ix)"), "dd7e00");
    assert_eq!(assemble_hex("ld (iy),b"), "fd7000");
}

#[test]
fn test_indexed_immediate_store() {
    // displacement comes before the immediate
    assert_eq!(assemble_hex("ld (iy+5),$42"), "fd360542");
}

#[test]
fn test_indexed_arithmetic() {
    assert_eq!(
        assemble_hex("add a,(ix+1)\ncp (iy-1)\ninc (ix+2)\ndec (iy+0)"),
        "dd8601 fdbeff dd3402 fd3500".replace(' ', "")
    );
}

#[test]
fn test_indexed_bit_operations() {
    assert_eq!(assemble_hex("bit 1,(iy+4)"), "fdcb044e");
    assert_eq!(assemble_hex("rl (ix-1)"), "ddcbff16");
    assert_eq!(assemble_hex("set 7,(ix+0)"), "ddcb00fe");
}

#[test]
fn test_index_register_pairs() {
    assert_eq!(
        assemble_hex("push ix\npop iy\njp (ix)\nex (sp),iy\nld sp,ix\ninc ix\ndec iy"),
        "dde5fde1dde9fde3ddf9dd23fd2b"
    );
}

#[test]
fn test_index_sixteen_bit_add() {
    assert_eq!(assemble_hex("add ix,ix\nadd iy,bc\nadd ix,sp"), "dd29fd09dd39");
}

#[test]
fn test_index_memory_transfers() {
    assert_eq!(
        assemble_hex("ld ix,($4000)\nld ($4000),iy"),
        "dd2a0040fd220040"
    );
}

#[test]
fn test_index_with_hl_is_rejected() {
    let errors = assemble_source("add ix,hl").unwrap_err();
    assert!(matches!(errors[0].error, AssemblerError::InvalidOperands { .. }));
}

#[test]
fn test_memory_to_memory_is_rejected() {
    let errors = assemble_source("ld (ix+1),(hl)").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].error, AssemblerError::InvalidOperands { .. }));
}

#[test]
fn test_displacement_out_of_range() {
    let errors = assemble_source("ld a,(ix+128)\nld a,(iy-129)").unwrap_err();
    assert!(matches!(errors[0].error, AssemblerError::DisplacementOutOfRange(128)));
    assert_eq!(errors[0].line, 1);
    assert!(matches!(errors[1].error, AssemblerError::DisplacementOutOfRange(-129)));
    assert_eq!(errors[1].line, 2);
}
