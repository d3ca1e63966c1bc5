//! Connection parameter sets, and their encoding for negotiation.
//!
//! The host offers a [`ParameterOptions`] (candidate values per parameter)
//! in a ParamNegotiate request; the target accepts one value per parameter
//! and replies with a [`ParameterConfig`].  Choosing the candidate values
//! is the transport's business, so the engine only carries them.
//!
//! Wire layouts, after the message header:
//!
//! ```text
//! options: n_lists, { type, n_options, option... }...
//! config:  n_params, { type, value }...
//! ```

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec::Vec;

use crate::codec::{Cursor, Field};
use crate::Result;

/// Link speed parameter
pub const BAUD_RATE: u32 = 0xC000;

/// One negotiated parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub kind: u32,
    pub value: u32,
}

/// A complete set of parameter values, one per parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterConfig {
    pub params: Vec<Parameter>,
}

/// Candidate values for one parameter, in order of preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterList {
    pub kind: u32,
    pub options: Vec<u32>,
}

/// Candidate values for a set of parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterOptions {
    pub lists: Vec<ParameterList>,
}

impl ParameterConfig {
    /// Value of the given parameter, if present
    pub fn get(&self, kind: u32) -> Option<u32> {
        self.params.iter().find(|p| p.kind == kind).map(|p| p.value)
    }

    /// Read a config from the body of a negotiation reply
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        let count = cursor.word()?;
        let mut params = Vec::new();
        for _ in 0..count {
            let kind = cursor.word()?;
            let value = cursor.word()?;
            params.push(Parameter { kind, value });
        }
        Ok(Self { params })
    }
}

impl ParameterOptions {
    /// Fields making up the body of a negotiation request
    pub fn fields(&self) -> Vec<Field<'static>> {
        let mut fields = Vec::new();
        fields.push(Field::Word(self.lists.len() as u32));
        for list in &self.lists {
            fields.push(Field::Word(list.kind));
            fields.push(Field::Word(list.options.len() as u32));
            fields.extend(list.options.iter().map(|&option| Field::Word(option)));
        }
        fields
    }
}

/// A config becomes a set of single-option lists, offering exactly the
/// values it holds.
impl From<&ParameterConfig> for ParameterOptions {
    fn from(config: &ParameterConfig) -> Self {
        let lists = config
            .params
            .iter()
            .map(|param| ParameterList {
                kind: param.kind,
                options: alloc::vec![param.value],
            })
            .collect();
        Self { lists }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_to_vec;

    #[test]
    fn config_converts_to_single_value_options() {
        let config = ParameterConfig {
            params: alloc::vec![Parameter {
                kind: BAUD_RATE,
                value: 115_200,
            }],
        };
        let options = ParameterOptions::from(&config);
        assert_eq!(options.lists.len(), 1);
        assert_eq!(options.lists[0].kind, BAUD_RATE);
        assert_eq!(options.lists[0].options, [115_200]);
    }

    #[test]
    fn options_encode_as_counted_lists() {
        let options = ParameterOptions {
            lists: alloc::vec![ParameterList {
                kind: BAUD_RATE,
                options: alloc::vec![9600, 19200],
            }],
        };
        let bytes = encode_to_vec(&options.fields()).unwrap();
        let words: Vec<u32> = bytes
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words, [1, BAUD_RATE, 2, 9600, 19200]);
    }

    #[test]
    fn config_decodes_from_reply_body() {
        let mut body = Vec::new();
        for word in [2u32, BAUD_RATE, 38400, 0xC001, 7] {
            body.extend_from_slice(&word.to_le_bytes());
        }
        let config = ParameterConfig::decode(&mut Cursor::new(&body)).unwrap();
        assert_eq!(config.get(BAUD_RATE), Some(38400));
        assert_eq!(config.get(0xC001), Some(7));
        assert_eq!(config.get(0xC002), None);
    }

    #[test]
    fn short_config_is_truncated() {
        let body = 3u32.to_le_bytes();
        assert_eq!(
            ParameterConfig::decode(&mut Cursor::new(&body)),
            Err(crate::Error::Truncated)
        );
    }
}
