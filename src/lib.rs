// lib.rs

//! The elements that drive the `tailstats` plugin binaries.

#![warn(
    explicit_outlives_requirements,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_crate_level_docs,
    missing_docs,
    private_doc_tests,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_lifetimes,
    variant_size_differences,
    clippy::cargo,
    clippy::pedantic
)]

pub mod collector;
pub mod netdata;
pub mod tailer;

#[cfg(test)]
pub mod test;
