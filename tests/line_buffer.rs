// tests/line_buffer.rs

//! Property test: line splitting is independent of how the byte stream is
//! chunked. Any sequence of pushes covering the same bytes yields the same
//! complete lines and the same buffered remainder.

use proptest::prelude::*;

use parsewatch::LineAccumulator;

proptest! {
    #[test]
    fn chunking_never_changes_the_line_stream(
        content in proptest::collection::vec(any::<u8>(), 0..2048),
        splits in proptest::collection::vec(any::<proptest::sample::Index>(), 0..8),
    ) {
        let mut points: Vec<usize> = splits
            .iter()
            .map(|index| index.index(content.len() + 1))
            .collect();
        points.sort_unstable();

        let mut whole = LineAccumulator::new();
        let single_pass = whole.push(&content);

        let mut chunked = LineAccumulator::new();
        let mut collected = Vec::new();
        let mut start = 0;
        for point in points {
            collected.extend(chunked.push(&content[start..point]));
            start = point;
        }
        collected.extend(chunked.push(&content[start..]));

        prop_assert_eq!(single_pass, collected);
        prop_assert_eq!(whole.pending_len(), chunked.pending_len());
    }
}
