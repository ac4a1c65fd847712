#![no_main]

use libfuzzer_sys::fuzz_target;
use wire::{decode_header, precheck, verify_packet, Identity, Limits, SharedKey, HEADER_SIZE};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (epoch_bytes, packet) = data.split_at(4);
    let now = i32::from_be_bytes([epoch_bytes[0], epoch_bytes[1], epoch_bytes[2], epoch_bytes[3]]);
    let limits = Limits::default();

    let sender = precheck(packet, now);
    let header = decode_header(packet, now, &limits);
    assert_eq!(sender, header.as_ref().ok().map(|header| header.sender));

    let Some(sender) = sender else {
        return;
    };
    assert!(packet.len() >= HEADER_SIZE);
    let key = SharedKey::derive("fuzz");
    let accepted = [sender, Identity::UNSPECIFIED];
    if let Ok(verified) = verify_packet(packet, &key, &accepted, now, &limits) {
        assert_eq!(verified.header.sender, sender);
        assert_eq!(verified.payload.len(), packet.len() - HEADER_SIZE);
    }
});
