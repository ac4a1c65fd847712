use proptest::prelude::*;
use wire::{
    encode_packet, precheck, verify_packet, DecodeError, Identity, Limits, OpCode, PacketHeader,
    SharedKey, HEADER_SIZE,
};

const NOW: i32 = 1_700_000_000;

fn client() -> Identity {
    "2001:db8:100::2".parse().unwrap()
}

fn pop() -> Identity {
    "2001:db8:100::1".parse().unwrap()
}

fn ipv6_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..512).prop_map(|mut bytes| {
        bytes[0] = 0x60 | (bytes[0] & 0x0F);
        bytes
    })
}

proptest! {
    #[test]
    fn prop_forward_roundtrip(payload in ipv6_payload_strategy(), secret in ".{0,32}") {
        let key = SharedKey::derive(&secret);
        let bytes = encode_packet(&PacketHeader::forward(client(), NOW), &key, &payload);
        let verified = verify_packet(&bytes, &key, &[client(), pop()], NOW, &Limits::default())
            .unwrap();
        prop_assert_eq!(verified.header.opcode, OpCode::Forward);
        prop_assert_eq!(verified.payload, payload.as_slice());
    }

    #[test]
    fn prop_single_bit_flip_is_rejected(
        payload in ipv6_payload_strategy(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let key = SharedKey::derive("tamper");
        let mut bytes = encode_packet(&PacketHeader::forward(client(), NOW), &key, &payload);
        let index = position.index(bytes.len());
        // a timestamp change inside the window is the one tolerated flip
        prop_assume!(!(4..8).contains(&index));
        bytes[index] ^= 1 << bit;
        let verified = verify_packet(&bytes, &key, &[client(), pop()], NOW, &Limits::default());
        prop_assert!(verified.is_err());
    }

    #[test]
    fn prop_precheck_never_panics(
        bytes in prop::collection::vec(any::<u8>(), 0..128),
        now in any::<i32>(),
    ) {
        let result = precheck(&bytes, now);
        if bytes.len() < HEADER_SIZE {
            prop_assert!(result.is_none());
        }
    }
}

#[test]
fn timestamp_flip_inside_window_breaks_signature() {
    let key = SharedKey::derive("tamper");
    let payload = [0x60u8; 48];
    let mut bytes = encode_packet(&PacketHeader::forward(client(), NOW), &key, &payload);
    bytes[7] ^= 1;
    assert_eq!(precheck(&bytes, NOW), Some(client()));
    assert_eq!(
        verify_packet(&bytes, &key, &[client()], NOW, &Limits::default()),
        Err(DecodeError::SignatureMismatch)
    );
}

#[test]
fn replay_window_boundaries() {
    let key = SharedKey::derive("replay");
    let at = |epoch| encode_packet(&PacketHeader::heartbeat(client(), epoch), &key, &[]);
    assert!(precheck(&at(NOW - 999), NOW).is_some());
    assert!(precheck(&at(NOW - 1000), NOW).is_some());
    assert!(precheck(&at(NOW - 1001), NOW).is_none());
}
