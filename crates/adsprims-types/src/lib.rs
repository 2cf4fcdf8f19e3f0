//! ADS type model and value codec.
//!
//! A resolved [`TypeNode`] tree describes the memory layout of one PLC
//! variable. [`decode`] turns raw bytes into a [`Value`] following that tree
//! and [`encode`] does the reverse. The [`decl`] module parses the symbol and
//! data type entries the device returns, which the client's resolver stitches
//! into full trees.

pub mod codec;
pub mod data_type;
pub mod decl;
pub mod error;
pub mod node;
pub mod value;

pub use codec::{decode, encode};
pub use data_type::AdsDataType;
pub use decl::{parse_data_type_entry, parse_symbol_entry, Symbol};
pub use error::{CodecError, Result};
pub use node::{ArrayDim, Attribute, EnumValue, TypeNode};
pub use value::Value;
