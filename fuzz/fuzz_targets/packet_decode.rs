#![no_main]

use libfuzzer_sys::fuzz_target;

use driftline_wire::{decode, PACKET_SIZE};

fuzz_target!(|data: &[u8]| {
    match decode(data) {
        Ok(packet) => {
            assert!(data.len() >= PACKET_SIZE);
            // re-encoding reproduces the first 13 bytes exactly
            assert_eq!(&packet.to_bytes()[..], &data[..PACKET_SIZE]);
        }
        Err(_) => assert!(data.len() < PACKET_SIZE),
    }
});
