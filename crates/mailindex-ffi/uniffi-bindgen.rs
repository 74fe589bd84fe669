//! Binding generator for the mailindex library
//!
//! Kotlin:
//!   cargo run -p mailindex-ffi --features bindgen --bin uniffi-bindgen generate \
//!       --library target/release/libmailindex_ffi.so \
//!       --language kotlin \
//!       --out-dir generated/kotlin

fn main() {
    uniffi::uniffi_bindgen_main()
}
