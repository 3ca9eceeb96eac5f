#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use driftline_journal::{parse_row, parse_series, LogRecord, Row};

#[derive(Arbitrary, Debug)]
enum Input<'a> {
    /// Arbitrary text fed to the row and log parsers
    Raw(&'a [u8]),
    /// A record as the collector would write it
    Record {
        collector_time: f64,
        node: &'a str,
        device_time: f64,
        measurement: f32,
    },
}

fuzz_target!(|input: Input<'_>| match input {
    Input::Raw(bytes) => {
        if let Ok(line) = std::str::from_utf8(bytes) {
            let _ = parse_row(line);
        }
        let _ = parse_series(bytes);
    }
    Input::Record {
        collector_time,
        node,
        device_time,
        measurement,
    } => {
        let record = LogRecord {
            collector_time,
            node: node.to_string(),
            device_time,
            measurement,
        };
        let row = record.to_string();
        let plain = !node.contains(&[',', '\n', '\r'][..]);
        if let (true, Ok(Row::Sample { node: parsed, .. })) = (plain, parse_row(&row)) {
            assert_eq!(parsed, node.trim());
        }
    }
});
