//! Round-trip laws for the codec over arbitrary values.

use std::collections::BTreeMap;
use std::collections::HashMap;

use proptest::prelude::*;
use slotpack::Decode;
use slotpack::Encode;
use slotpack::WireMessage;
use slotpack::decode_from;
use slotpack::encode_into;

fn through_wire<T: Encode + Decode>(value: &T) -> (T, u32) {
    let mut msg = WireMessage::new("prop.roundtrip");
    let used = encode_into(&mut msg, value).expect("encode");
    // Also cross the byte framing, as a transport would.
    let bytes = msg.to_bytes().expect("frame");
    let msg = WireMessage::from_bytes(&bytes).expect("unframe");
    (decode_from(&msg).expect("decode"), used)
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct Sample {
    id: u16,
    label: String,
    words: Vec<u32>,
    gains: [i8; 4],
    offset: i64,
}

fn sample() -> impl Strategy<Value = Sample> {
    (any::<u16>(), ".{0,16}", proptest::collection::vec(any::<u32>(), 0..8), any::<[i8; 4]>(), any::<i64>())
        .prop_map(|(id, label, words, gains, offset)| Sample { id, label, words, gains, offset })
}

proptest! {
    #[test]
    fn scalars_roundtrip(a in any::<u8>(), b in any::<i16>(), c in any::<i32>(), d in any::<u64>(), e in any::<bool>()) {
        let value = (a, b, c, d, e);
        let (back, used) = through_wire(&value);
        prop_assert_eq!(back, value);
        prop_assert_eq!(used, 6);
    }

    #[test]
    fn f32_roundtrips_bitwise(bits in any::<u32>()) {
        let value = f32::from_bits(bits);
        let (back, _) = through_wire(&value);
        prop_assert_eq!(back.to_bits(), bits);
    }

    #[test]
    fn sequences_roundtrip(
        words in proptest::collection::vec(any::<u32>(), 0..32),
        texts in proptest::collection::vec(".{0,8}", 0..8),
        shorts in proptest::collection::vec(any::<i16>(), 0..32),
    ) {
        let value = (words, texts, shorts);
        let (back, used) = through_wire(&value);
        prop_assert_eq!(used as usize, 1 + 1 + 1 + value.2.len());
        prop_assert_eq!(back, value);
    }

    #[test]
    fn byte_arrays_roundtrip(bytes in any::<[u8; 16]>(), empty in Just([0u32; 0])) {
        let value = (bytes, empty);
        let (back, used) = through_wire(&value);
        prop_assert_eq!(back, value);
        prop_assert_eq!(used, 2);
    }

    #[test]
    fn maps_roundtrip(
        ordered in proptest::collection::btree_map(any::<u32>(), ".{0,8}", 0..16),
        hashed in proptest::collection::hash_map("[a-z]{1,6}", any::<u16>(), 0..16),
    ) {
        let value = (ordered, hashed);
        let (back, used) = through_wire(&value);
        prop_assert_eq!(used as usize, 2 + value.0.len() + value.1.len());
        prop_assert_eq!(back, value);
    }

    #[test]
    fn nested_maps_roundtrip(map in proptest::collection::btree_map("[a-z]{1,4}", proptest::collection::vec(any::<u8>(), 0..4), 0..6)) {
        let (back, _) = through_wire(&map);
        let back: BTreeMap<String, Vec<u8>> = back;
        prop_assert_eq!(back, map);
    }

    #[test]
    fn derived_structs_roundtrip(items in proptest::collection::vec(sample(), 0..6)) {
        let (back, used) = through_wire(&items);
        prop_assert_eq!(used as usize, 1 + items.len() * 6);
        prop_assert_eq!(back, items);
    }

    #[test]
    fn key_count_ignores_contents(a in sample(), b in sample()) {
        let mut ma = WireMessage::new("m");
        let mut mb = WireMessage::new("m");
        let ua = encode_into(&mut ma, &a).expect("encode");
        let ub = encode_into(&mut mb, &b).expect("encode");
        prop_assert_eq!(ua, ub);
        let ka: Vec<String> = ma.iter().map(|(k, _)| k.to_string()).collect();
        let kb: Vec<String> = mb.iter().map(|(k, _)| k.to_string()).collect();
        prop_assert_eq!(ka, kb);
    }
}

#[test]
fn hashmap_with_default_hasher_decodes() {
    let mut map: HashMap<u32, String> = HashMap::new();
    map.insert(3, "c".into());
    map.insert(1, "a".into());
    let (back, used) = through_wire(&map);
    assert_eq!(back, map);
    assert_eq!(used, 3);
}
