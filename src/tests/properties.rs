//! Property-based tests over generated sources.

use crate::*;
use proptest::prelude::*;

fn arb_source() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::char::range('\0', '\x7f'), 0..256)
        .prop_map(|chars| chars.into_iter().collect())
}

fn valid_instruction() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "nop",
        "ld a,b",
        "ld a,$12",
        "ld hl,$1234",
        "ld (hl),a",
        "ld (ix+5),c",
        "ld (iy-3),$FF",
        "add a,(hl)",
        "add hl,bc",
        "inc de",
        "dec (ix+0)",
        "push af",
        "pop iy",
        "ex de,hl",
        "jp $0000",
        "call nz,$0100",
        "ret",
        "rst $10",
        "in a,($FE)",
        "out (c),b",
        "bit 3,(iy+2)",
        "srl e",
        "ldir",
        "im 2",
        "db 1,2,3",
        "dw $BEEF",
    ])
}

proptest! {
    #[test]
    fn tokenize_is_deterministic(source in arb_source()) {
        prop_assert_eq!(tokenize(&source), tokenize(&source));
    }

    #[test]
    fn number_bytes_recombine(value in 0i64..=0xFFFF) {
        let number = Number::new(value);
        prop_assert!(number.fits16);
        prop_assert_eq!(number.high as i64 * 256 + number.low as i64, value);
        prop_assert_eq!(number.fits8, value <= 0xFF);
    }

    #[test]
    fn negative_number_bytes_wrap(value in -0x8000i64..0) {
        let number = Number::new(value);
        prop_assert!(number.fits16);
        prop_assert_eq!(
            number.high as i64 * 256 + number.low as i64,
            value.rem_euclid(0x10000)
        );
        prop_assert_eq!(number.fits8, value >= -128);
    }

    #[test]
    fn arbitrary_input_never_panics(source in arb_source()) {
        let _ = assemble_source(&source);
    }

    #[test]
    fn load_immediate_encodes_every_byte(
        reg in prop::sample::select(Reg8::ALL.to_vec()),
        value in 0u32..=255,
    ) {
        let program = assemble_source(&format!("ld {},{}", reg, value)).unwrap();
        prop_assert_eq!(
            program.images[0].bytes.clone(),
            vec![0x06 | reg.code() << 3, value as u8]
        );
    }

    #[test]
    fn relative_jump_displacement(offset in -200i64..200) {
        let target = 0x1002 + offset;
        let result = assemble_source(&format!("org $1000\njr {}", target));
        if (-128..=127).contains(&offset) {
            let program = result.unwrap();
            prop_assert_eq!(program.images[0].bytes.clone(), vec![0x18, offset as i8 as u8]);
        } else {
            let errors = result.unwrap_err();
            let is_range_error = matches!(
                errors[0].error,
                AssemblerError::RelativeOutOfRange { .. }
            );
            prop_assert!(is_range_error);
        }
    }

    #[test]
    fn valid_programs_are_contiguous(
        lines in prop::collection::vec(valid_instruction(), 1..40),
        origin in 0u16..0x8000,
    ) {
        let source = lines.join("\n");
        let program = Assembler::with_origin(origin).assemble_source(&source).unwrap();
        prop_assert_eq!(program.ranges.len(), lines.len());
        for pair in program.ranges.windows(2) {
            prop_assert_eq!(pair[0].end(), pair[1].address as u32);
        }
        prop_assert_eq!(program.images.len(), 1);
        prop_assert_eq!(program.images[0].base, origin);
    }

    #[test]
    fn errors_never_emit_bytes(
        lines in prop::collection::vec(valid_instruction(), 0..10),
        bad in prop::sample::select(vec!["ld q,a", "ld b,(bc)", "jr m,0", "ld a,999", "push sp"]),
    ) {
        let mut source = lines.clone();
        source.push(bad);
        source.extend(lines.iter().copied());
        let (items, _) = Parser::new().parse(&tokenize(&source.join("\n")));
        let assembly = Assembler::new().assemble(&items);
        prop_assert_eq!(assembly.diagnostics.len(), 1);
        prop_assert_eq!(assembly.ranges.len(), lines.len() * 2);
        prop_assert!(bundle(&assembly.ranges).len() <= 1);
    }
}
