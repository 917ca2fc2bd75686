use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, LitStr};

/// Assembles a Z80 source string at compile time and expands to a
/// `Vec<u8>` of the resulting image.
///
/// ```ignore
/// let code: Vec<u8> = z80_asm!("
///     ld a,$12
///     ld b,a
/// ");
/// assert_eq!(code, [0x3E, 0x12, 0x47]);
/// ```
///
/// Any assembler diagnostic becomes a compile error at the literal. The
/// source must produce a single contiguous image, since the expansion
/// carries no load address.
#[proc_macro]
pub fn z80_asm(input: TokenStream) -> TokenStream {
    let source = parse_macro_input!(input as LitStr);
    match expand(&source) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(source: &LitStr) -> syn::Result<TokenStream2> {
    let program = zasm_common::assemble_source(&source.value()).map_err(|diagnostics| {
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        syn::Error::new(source.span(), messages.join("\n"))
    })?;

    let bytes: Vec<u8> = match program.images.as_slice() {
        [] => Vec::new(),
        [image] => image.bytes.clone(),
        images => {
            let bases: Vec<String> = images
                .iter()
                .map(|image| format!("${:04X}", image.base))
                .collect();
            return Err(syn::Error::new(
                source.span(),
                format!(
                    "source assembles to {} separate images (at {}); z80_asm! needs one",
                    images.len(),
                    bases.join(", ")
                ),
            ));
        }
    };

    Ok(quote! {
        {
            let bytes: ::std::vec::Vec<u8> = vec![#(#bytes),*];
            bytes
        }
    })
}
