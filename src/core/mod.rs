//! Core data types for the hexpatch engine.
//!
//! This module contains the fundamental types shared by the editing and
//! persistence layers: the immutable byte buffer, patch records, address
//! keys, and annotation values.

pub mod address;
pub mod annotation;
pub mod buffer;
pub mod patch;

pub use address::Address;
pub use annotation::Annotation;
pub use buffer::{sanitize_hex, ByteBuffer};
pub use patch::{parse_hex_byte, Patch};
