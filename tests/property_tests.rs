//! Property tests for the field codec and transfer chunking.

mod common;

use adp_host::Error;
use adp_host::codec::{Field, FieldKind, decode, encode, encode_to_vec};
use adp_host::protocol::{HEADER_SIZE, hadp};
use proptest::prelude::*;

use common::*;

#[derive(Debug, Clone)]
enum Value {
    Word(u32),
    Half(u16),
    Byte(u8),
    Bytes(Vec<u8>),
}

impl Value {
    fn field(&self) -> Field<'_> {
        match self {
            Value::Word(v) => Field::Word(*v),
            Value::Half(v) => Field::Half(*v),
            Value::Byte(v) => Field::Byte(*v),
            Value::Bytes(v) => Field::Bytes(v),
        }
    }
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u32>().prop_map(Value::Word),
        any::<u16>().prop_map(Value::Half),
        any::<u8>().prop_map(Value::Byte),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

// ── Codec ────────────────────────────────────────────────────

proptest! {
    /// Decoding with the encoded fields' kinds gives back the same fields,
    /// including runs of consecutive bytes.
    #[test]
    fn decode_inverts_encode(values in proptest::collection::vec(arb_value(), 0..24)) {
        let fields: Vec<Field<'_>> = values.iter().map(Value::field).collect();
        let kinds: Vec<FieldKind> = fields.iter().map(Field::kind).collect();

        let bytes = encode_to_vec(&fields).unwrap();
        let decoded = decode(&bytes, &kinds).unwrap();

        prop_assert_eq!(decoded, fields);
    }

    /// A dry run reports exactly the length a real encode writes.
    #[test]
    fn dry_run_matches_encoded_length(values in proptest::collection::vec(arb_value(), 0..24)) {
        let fields: Vec<Field<'_>> = values.iter().map(Value::field).collect();
        let expected: usize = fields.iter().map(Field::width).sum();

        let len = encode(None, &fields).unwrap();
        let mut buf = vec![0u8; len + 8];
        prop_assert_eq!(len, expected);
        prop_assert_eq!(encode(Some(&mut buf), &fields).unwrap(), len);
    }

    /// Encoding into a buffer one byte short fails rather than truncating.
    #[test]
    fn short_buffer_is_rejected(values in proptest::collection::vec(arb_value(), 1..24)) {
        let fields: Vec<Field<'_>> = values.iter().map(Value::field).collect();
        let len = encode(None, &fields).unwrap();
        prop_assume!(len > 0);

        let mut buf = vec![0u8; len - 1];
        prop_assert_eq!(encode(Some(&mut buf), &fields), Err(Error::BufferTooSmall));
    }

    /// Words are always little-endian on the wire.
    #[test]
    fn words_are_little_endian(value in any::<u32>()) {
        let bytes = encode_to_vec(&[Field::Word(value)]).unwrap();
        prop_assert_eq!(bytes, value.to_le_bytes().to_vec());
    }
}

// ── Transfer chunking ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A write of N bytes sends ceil(N / C) requests at base + k * C, each
    /// fitting the long buffer, with the data arriving intact.
    #[test]
    fn writes_split_at_chunk_boundaries(
        base in any::<u32>(),
        data in proptest::collection::vec(any::<u8>(), 0..12_000),
    ) {
        const CHUNK: usize = 4096 - 4 - 24;

        let mut session = opened_session(|packet| match op_of(packet) {
            hadp::WRITE => vec![reply(hadp::WRITE, &[0])],
            _ => Vec::new(),
        });
        let transfer = session.write_memory(base, &data).unwrap();
        prop_assert!(transfer.is_complete());

        let requests = session.transport().requests(hadp::WRITE);
        prop_assert_eq!(requests.len(), data.len().div_ceil(CHUNK));

        let mut written = Vec::new();
        for (k, packet) in requests.iter().enumerate() {
            let len = word(&packet.data, HEADER_SIZE + 4) as usize;
            prop_assert_eq!(
                word(&packet.data, HEADER_SIZE),
                base.wrapping_add((k * CHUNK) as u32)
            );
            prop_assert!(packet.data.len() + 4 <= 4096);
            written.extend_from_slice(&packet.data[HEADER_SIZE + 8..HEADER_SIZE + 8 + len]);
        }
        prop_assert_eq!(written, data);
    }
}
