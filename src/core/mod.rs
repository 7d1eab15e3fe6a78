//! Core markup parsing primitives
//!
//! This module contains the fundamental building blocks shared by the DOM
//! builder, the HTML tree builder and the streaming reader:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: State machine for XML/HTML token extraction
//! - Entities: entity decoding with Cow (zero-copy when possible) and escaping
//! - Attributes: Attribute parsing and extraction
//! - Encoding: BOM/declaration sniffing and conversion to UTF-8

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
