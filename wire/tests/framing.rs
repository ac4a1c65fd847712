use wire::{split_datagrams, FramingError, IPV6_HEADER_SIZE};

fn datagram(payload_len: u16, fill: u8) -> Vec<u8> {
    let mut bytes = vec![fill; IPV6_HEADER_SIZE + usize::from(payload_len)];
    bytes[0] = 0x60;
    bytes[4..6].copy_from_slice(&payload_len.to_be_bytes());
    bytes
}

#[test]
fn two_back_to_back_datagrams() {
    let first = datagram(8, 0xAA);
    let second = datagram(24, 0xBB);
    let mut buf = first.clone();
    buf.extend_from_slice(&second);

    let parts = split_datagrams(&buf).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].len(), 48);
    assert_eq!(parts[1].len(), 64);
    assert_eq!(parts[0], first.as_slice());
    assert_eq!(parts[1], second.as_slice());
}

#[test]
fn second_datagram_one_byte_short() {
    let mut buf = datagram(8, 0xAA);
    buf.extend_from_slice(&datagram(24, 0xBB));
    buf.pop();

    assert_eq!(
        split_datagrams(&buf),
        Err(FramingError::Truncated {
            declared: 64,
            available: 63
        })
    );
}

#[test]
fn many_datagrams() {
    let mut buf = Vec::new();
    for len in [0u16, 1, 16, 100, 1240] {
        buf.extend_from_slice(&datagram(len, 0));
    }
    let parts = split_datagrams(&buf).unwrap();
    let lens: Vec<usize> = parts.iter().map(|part| part.len()).collect();
    assert_eq!(lens, vec![40, 41, 56, 140, 1280]);
}
