#![no_main]

use libfuzzer_sys::fuzz_target;
use wire::{split_datagrams, IPV6_HEADER_SIZE};

fuzz_target!(|data: &[u8]| {
    if let Ok(datagrams) = split_datagrams(data) {
        let total: usize = datagrams.iter().map(|datagram| datagram.len()).sum();
        assert_eq!(total, data.len());
        for datagram in datagrams {
            assert!(datagram.len() >= IPV6_HEADER_SIZE);
            assert_eq!(datagram[0] >> 4, 6);
        }
    }
});
