pub mod converter;
pub mod dict;
pub mod error;
pub mod unicode;

pub use converter::{AnyDict, Converter, TextFormat};
pub use dict::{combine, Conv, ConvPart, Dict, DictFormat, DictMatch, Mode, PlainDict, Table, Trie};
pub use error::{HanconvError, Result};
