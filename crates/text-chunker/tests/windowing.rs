use fvi_text_chunker::{Chunker, ChunkerConfig, RawDocument};
use proptest::prelude::*;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

fn config_strategy() -> impl Strategy<Value = ChunkerConfig> {
    (20usize..300, 0usize..100, 0usize..20, any::<bool>()).prop_map(
        |(window, overlap, min, ws)| ChunkerConfig {
            window_chars: window,
            overlap_chars: overlap % window,
            min_chunk_chars: min.min(window),
            break_on_whitespace: ws,
        },
    )
}

proptest! {
    #[test]
    fn proptest_chunks_respect_window_and_are_deterministic(
        config in config_strategy(),
        text in "[a-z ]{1,2000}",
    ) {
        let chunker = Chunker::new(config.clone()).unwrap();
        let doc = RawDocument::new("doc", text);
        let first = chunker.chunk_document(&doc);
        let second = chunker.chunk_document(&doc);

        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(&a, &b);
                let mut ids = HashSet::new();
                for chunk in &a {
                    prop_assert!(chunk.text.graphemes(true).count() <= config.window_chars);
                    prop_assert!(chunk.text.chars().count() >= config.min_chunk_chars);
                    prop_assert!(ids.insert(chunk.chunk_id.clone()));
                }
                for pair in a.windows(2) {
                    prop_assert!(pair[0].start_char < pair[1].start_char);
                    prop_assert_eq!(pair[0].ordinal + 1, pair[1].ordinal);
                }
            }
            (Err(_), Err(_)) => prop_assert!(doc.text.trim().is_empty()),
            _ => prop_assert!(false, "non-deterministic outcome"),
        }
    }
}
