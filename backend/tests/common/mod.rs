// Not every helper is used in every test, so we allow dead code
#![allow(unused_imports, dead_code)]

mod test_setup;
pub use test_setup::*;
