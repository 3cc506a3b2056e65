//! Procedural macros shared by the tessera crates.

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{Block, ItemFn, ReturnType, parse_macro_input};

/// Attaches a context line to every error that leaves the annotated function.
///
/// The attribute arguments are handed verbatim to `format!`, so they can reference the
/// function's parameters:
///
/// ```ignore
/// #[context("reading tile {coord:?} from '{}'", self.name)]
/// async fn read_tile(&self, coord: &TileCoord) -> anyhow::Result<Blob> { ... }
/// ```
///
/// The message is only formatted on the error path, after the body has run. Arguments
/// that the body moves out of can therefore not be used in the message.
#[proc_macro_attribute]
pub fn context(args: TokenStream, input: TokenStream) -> TokenStream {
	let format_args = TokenStream2::from(args);
	let mut function = parse_macro_input!(input as ItemFn);

	let return_type = match &function.sig.output {
		ReturnType::Type(_, return_type) => return_type.clone(),
		ReturnType::Default => {
			return syn::Error::new_spanned(&function.sig, "#[context] needs a function that returns a Result")
				.to_compile_error()
				.into();
		}
	};

	let body = &function.block;
	let result = Ident::new("result", Span::mixed_site());
	let err = Ident::new("err", Span::mixed_site());

	let wrapped = if function.sig.asyncness.is_some() {
		quote! {{
			let #result: #return_type = async { #body }.await;
			#result.map_err(|#err| #err.context(format!(#format_args)))
		}}
	} else {
		quote! {{
			let #result: #return_type = (|| -> #return_type { #body })();
			#result.map_err(|#err| #err.context(format!(#format_args)))
		}}
	};

	match syn::parse2::<Block>(wrapped) {
		Ok(block) => {
			*function.block = block;
			function.into_token_stream().into()
		}
		Err(error) => error.to_compile_error().into(),
	}
}
