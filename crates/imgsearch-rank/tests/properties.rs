use imgsearch_core::{Candidate, Embedding, FilterCriteria, QueryContext, ScoredResult, ScoringWeights};
use imgsearch_rank::{filter, fuse, rank, sort, QueryVectorBuilder};
use proptest::prelude::*;

const DIM: usize = 8;

fn vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, DIM).prop_filter("non-zero norm", |v| v.iter().any(|x| x.abs() > 1e-3))
}

fn weights() -> impl Strategy<Value = ScoringWeights> {
    (0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0)
        .prop_filter("positive sum", |(a, b, c)| a + b + c > 1e-3)
        .prop_map(|(a, b, c)| ScoringWeights::new(a, b, c).expect("positive weights"))
}

fn candidates() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec(vector(), 0..24).prop_map(|vs| {
        vs.into_iter()
            .enumerate()
            .map(|(i, v)| Candidate::new(format!("c{i:02}"), v, Default::default()))
            .collect()
    })
}

/// Scores drawn from a small set so ties are common.
fn scored_results() -> impl Strategy<Value = Vec<ScoredResult>> {
    prop::collection::vec((0u8..5, "[a-z]{1,4}"), 0..32).prop_map(|items| {
        items
            .into_iter()
            .map(|(bucket, id)| {
                let score = f32::from(bucket) / 4.0;
                ScoredResult {
                    candidate: Candidate::new(id, vec![1.0], Default::default()),
                    image_score: score,
                    text_score: 0.0,
                    metadata_score: 0.0,
                    final_score: score,
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn weights_always_sum_to_one(w in weights()) {
        prop_assert!((w.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn final_score_is_bounded_and_fusion_is_idempotent(
        text in vector(),
        image in vector(),
        cands in candidates(),
        w in weights(),
    ) {
        let ctx = QueryContext::hybrid(Embedding::new(text), Embedding::new(image), 0.5, 0.5).expect("ctx");
        // Weights with nothing left for the present signals are a valid error here.
        let Ok(first) = fuse(cands.clone(), &ctx, &w, None) else { return Ok(()) };
        for r in &first {
            prop_assert!((0.0..=1.0).contains(&r.final_score));
        }
        let second = fuse(cands, &ctx, &w, None).expect("same inputs succeed again");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn text_only_default_weights_score_text(text in vector(), cands in candidates()) {
        let ctx = QueryContext::text_only(Embedding::new(text));
        let results = fuse(cands, &ctx, &ScoringWeights::default(), None).expect("fuse");
        for r in results {
            prop_assert_eq!(r.final_score, r.text_score.clamp(0.0, 1.0));
        }
    }

    #[test]
    fn raising_min_score_never_adds_results(results in scored_results(), a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let n_low = filter(results.clone(), &FilterCriteria { min_score: Some(low), ..Default::default() }).len();
        let n_high = filter(results, &FilterCriteria { min_score: Some(high), ..Default::default() }).len();
        prop_assert!(n_high <= n_low);
    }

    #[test]
    fn ties_are_ordered_by_id(results in scored_results()) {
        let sorted = sort(results);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].final_score >= pair[1].final_score);
            if pair[0].final_score == pair[1].final_score {
                prop_assert!(pair[0].candidate.id <= pair[1].candidate.id);
            }
        }
    }

    #[test]
    fn top_k_is_the_true_top_of_survivors(results in scored_results(), k in 0usize..40, min in 0.0f32..=1.0) {
        let criteria = FilterCriteria { min_score: Some(min), ..Default::default() };
        let survivors = filter(results.clone(), &criteria);
        let top = rank(results, &criteria, k);
        prop_assert_eq!(top.len(), k.min(survivors.len()));
        if let Some(lowest) = top.last() {
            let returned = top.len();
            let dropped = sort(survivors).into_iter().skip(returned);
            for d in dropped {
                prop_assert!(lowest.final_score >= d.final_score);
            }
        }
    }

    #[test]
    fn hybrid_query_vector_is_unit_length(text in vector(), image in vector(), tw in 0.0f32..=1.0) {
        let ctx = QueryContext::hybrid(Embedding::new(text), Embedding::new(image), tw, 1.0 - tw).expect("ctx");
        if let Ok(qv) = QueryVectorBuilder::build(&ctx) {
            prop_assert!((qv.search.norm() - 1.0).abs() < 1e-4);
        }
    }
}
