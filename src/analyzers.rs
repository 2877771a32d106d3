//! Filepath: src/analyzers.rs
//!
//! Reference [`KeyAnalyzer`] implementations.
//!
//! | Analyzer | Key | Bit layout |
//! |---|---|---|
//! | [`BytesKeyAnalyzer`] | `Vec<u8>` | 8 bits per byte, MSB first |
//! | [`BoundedBytesKeyAnalyzer`] | `Vec<u8>` | as above, with a caller-declared maximum bit length |
//! | [`StringKeyAnalyzer`] | `String` | UTF-16 code units, MSB first within each unit |
//! | [`U32KeyAnalyzer`] | `u32` | 32 bits, MSB first |
//! | [`U16KeyAnalyzer`] | `u16` | 16 bits, MSB first |
//! | [`BigUintKeyAnalyzer`] | `BigUint` | LSB first over the magnitude |
//!
//! All analyzers obey the shared contract: bits past a key's end read as
//! zero, an all-zero key range reports [`DiffBit::AllZero`], and `compare`
//! matches the induced bit order.
//!
//! [`KeyAnalyzer`]: crate::analyzer::KeyAnalyzer
//! [`DiffBit::AllZero`]: crate::analyzer::DiffBit::AllZero

mod bigint;
mod bytes;
mod fixed;
mod string;

pub use bigint::BigUintKeyAnalyzer;
pub use bytes::{BoundedBytesKeyAnalyzer, BytesKeyAnalyzer};
pub use fixed::{U16KeyAnalyzer, U32KeyAnalyzer};
pub use string::StringKeyAnalyzer;
