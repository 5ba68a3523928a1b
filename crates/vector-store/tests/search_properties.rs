use fvi_vector_store::{ChunkerConfig, HashingEmbedder, KnowledgeIndex, RawDocument};
use proptest::prelude::*;
use std::sync::Arc;

const VOCABULARY: &[&str] = &[
    "coal", "subsidy", "emissions", "mine", "plant", "price", "policy", "carbon", "export",
    "reserves", "transition", "workers", "grid", "demand", "finance",
];

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 12..30).prop_map(|w| w.join(" "))
}

fn build(docs: Vec<String>) -> KnowledgeIndex {
    let corpus = docs
        .into_iter()
        .enumerate()
        .map(|(i, text)| RawDocument::new(format!("doc{i}"), text))
        .collect();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime
        .block_on(KnowledgeIndex::build(
            Arc::new(HashingEmbedder::new(64)),
            ChunkerConfig::default(),
            corpus,
        ))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn proptest_search_is_bounded_and_non_increasing(
        docs in prop::collection::vec(sentence(), 1..12),
        query in sentence(),
        top_k in 0usize..8,
    ) {
        let index = build(docs);
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let vector = runtime.block_on(index.embed_query(&query)).unwrap();
        let results = index.search(&vector, top_k).unwrap();

        prop_assert!(results.len() <= top_k);
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].position < pair[1].position);
            }
        }
    }

    #[test]
    fn proptest_rebuild_from_identical_corpus_is_identical(
        docs in prop::collection::vec(sentence(), 1..8),
    ) {
        let a = build(docs.clone()).snapshot();
        let b = build(docs).snapshot();
        let left: Vec<_> = a.chunks().cloned().collect();
        let right: Vec<_> = b.chunks().cloned().collect();
        prop_assert_eq!(left, right);
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
