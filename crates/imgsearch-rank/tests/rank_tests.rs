use chrono::NaiveDate;
use imgsearch_core::types::attributes_from_json;
use imgsearch_core::{
    Candidate, CandidateColor, ColorBucket, Embedding, Error, FilterCriteria, Orientation, QueryContext, Rgb,
    ScoredResult, ScoringWeights, SearchMode,
};
use imgsearch_rank::{
    color_similarity, cosine_similarity, filter, fuse, fuse_with_report, rank, sort, QueryVectorBuilder,
};

fn candidate(id: &str, v: Vec<f32>, meta: serde_json::Value) -> Candidate {
    Candidate::new(id, v, attributes_from_json(&meta))
}

fn scored(id: &str, score: f32) -> ScoredResult {
    ScoredResult {
        candidate: candidate(id, vec![1.0, 0.0], serde_json::json!({})),
        image_score: 0.0,
        text_score: score,
        metadata_score: 0.0,
        final_score: score,
    }
}

fn unit_at(cos: f32) -> Vec<f32> { vec![cos, (1.0 - cos * cos).sqrt()] }

#[test]
fn cosine_basics() {
    let s = cosine_similarity(&[1.0, 0.0], &[0.0, 2.0]).expect("cos");
    assert!(s.abs() < 1e-6);
    let s = cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]).expect("cos");
    assert!((s - 1.0).abs() < 1e-6);
    let s = cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]).expect("cos");
    assert!((s + 1.0).abs() < 1e-6);
}

#[test]
fn cosine_rejects_mismatch_and_zero_vectors() {
    assert!(matches!(
        cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]),
        Err(Error::DimensionMismatch { expected: 2, actual: 3 })
    ));
    assert!(matches!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), Err(Error::DegenerateVector)));
}

#[test]
fn color_similarity_exact_near_and_far() {
    assert_eq!(color_similarity(&CandidateColor::Bucket(ColorBucket::Red), ColorBucket::Red), 1.0);
    // #ff3300 resolves to red, so it is an exact bucket match.
    let hex = CandidateColor::Rgb(Rgb::new(255, 51, 0));
    assert_eq!(color_similarity(&hex, ColorBucket::Red), 1.0);
    let near = color_similarity(&CandidateColor::Bucket(ColorBucket::Orange), ColorBucket::Red);
    assert!(near > 0.5 && near < 1.0, "orange vs red = {near}");
    assert_eq!(color_similarity(&CandidateColor::Bucket(ColorBucket::Black), ColorBucket::White), 0.0);
}

#[test]
fn text_only_builder_passes_through() {
    let e = Embedding::new(vec![0.2, 0.4, 0.1]);
    let qv = QueryVectorBuilder::build(&QueryContext::text_only(e.clone())).expect("build");
    assert_eq!(qv.mode, SearchMode::TextOnly);
    assert_eq!(qv.search, e);
    assert!(qv.image.is_none());
}

#[test]
fn hybrid_builder_blends_to_unit_length() {
    let ctx = QueryContext::hybrid(Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![0.0, 1.0]), 0.5, 0.5)
        .expect("ctx");
    let qv = QueryVectorBuilder::build(&ctx).expect("build");
    assert!((qv.search.norm() - 1.0).abs() < 1e-5);
    let expected = std::f32::consts::FRAC_1_SQRT_2;
    assert!((qv.search.as_slice()[0] - expected).abs() < 1e-5);
    assert!((qv.search.as_slice()[1] - expected).abs() < 1e-5);
}

#[test]
fn hybrid_builder_rejects_unusable_inputs() {
    let ctx = QueryContext::Hybrid {
        text: Embedding::new(vec![1.0, 0.0]),
        image: Embedding::new(vec![0.0, 1.0]),
        text_weight: 0.7,
        image_weight: 0.7,
    };
    assert!(matches!(QueryVectorBuilder::build(&ctx), Err(Error::InvalidQueryContext(_))));

    let opposite = QueryContext::hybrid(Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![-1.0, 0.0]), 0.5, 0.5)
        .expect("ctx");
    assert!(matches!(QueryVectorBuilder::build(&opposite), Err(Error::InvalidQueryContext(_))));

    let ragged = QueryContext::hybrid(Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![1.0]), 0.5, 0.5)
        .expect("ctx");
    assert!(matches!(QueryVectorBuilder::build(&ragged), Err(Error::InvalidQueryContext(_))));
}

#[test]
fn text_only_without_color_scores_on_text_alone() {
    let ctx = QueryContext::text_only(Embedding::new(vec![1.0, 0.0]));
    let candidates = vec![
        candidate("b", unit_at(0.3), serde_json::json!({"color": "red"})),
        candidate("a", unit_at(0.9), serde_json::json!({})),
    ];
    let fused = fuse_with_report(candidates, &ctx, &ScoringWeights::default(), None).expect("fuse");
    assert!((fused.weights.text_weight() - 1.0).abs() < 1e-6);
    assert_eq!(fused.weights.image_weight(), 0.0);
    for r in &fused.results {
        assert_eq!(r.final_score, r.text_score);
        assert_eq!(r.image_score, 0.0);
        assert_eq!(r.metadata_score, 0.0);
    }

    let ranked = sort(fused.results);
    assert_eq!(ranked[0].candidate.id, "a");
    assert!((ranked[0].final_score - 0.9).abs() < 1e-5);
    assert!((ranked[1].final_score - 0.3).abs() < 1e-5);

    let survivors = filter(ranked, &FilterCriteria { min_score: Some(0.5), ..Default::default() });
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].candidate.id, "a");
}

#[test]
fn target_color_adds_metadata_signal() {
    let ctx = QueryContext::text_only(Embedding::new(vec![1.0, 0.0]));
    let candidates = vec![
        candidate("red", unit_at(0.5), serde_json::json!({"color": "red"})),
        candidate("blue", unit_at(0.5), serde_json::json!({"color": "blue"})),
        candidate("none", unit_at(0.5), serde_json::json!({})),
    ];
    let weights = ScoringWeights::new(0.0, 0.5, 0.5).expect("weights");
    let results = fuse(candidates, &ctx, &weights, Some(ColorBucket::Red)).expect("fuse");
    assert_eq!(results[0].metadata_score, 1.0);
    assert!((results[0].final_score - 0.75).abs() < 1e-5);
    assert_eq!(results[1].metadata_score, 0.0);
    assert!((results[1].final_score - 0.25).abs() < 1e-5);
    assert_eq!(results[2].metadata_score, 0.0);
}

#[test]
fn hybrid_fusion_uses_both_signals() {
    let ctx = QueryContext::hybrid(Embedding::new(vec![1.0, 0.0]), Embedding::new(vec![0.0, 1.0]), 0.5, 0.5)
        .expect("ctx");
    let c = candidate("x", vec![0.0, 1.0], serde_json::json!({}));
    let weights = ScoringWeights::new(0.5, 0.5, 0.0).expect("weights");
    let results = fuse(vec![c], &ctx, &weights, None).expect("fuse");
    assert!((results[0].image_score - 1.0).abs() < 1e-6);
    assert!(results[0].text_score.abs() < 1e-6);
    assert!((results[0].final_score - 0.5).abs() < 1e-6);
}

#[test]
fn malformed_candidates_are_skipped_not_fatal() {
    let ctx = QueryContext::image_only(Embedding::new(vec![1.0, 0.0]));
    let candidates = vec![
        candidate("ok", vec![1.0, 0.0], serde_json::json!({})),
        candidate("short", vec![1.0], serde_json::json!({})),
        candidate("zero", vec![0.0, 0.0], serde_json::json!({})),
    ];
    let fused = fuse_with_report(candidates, &ctx, &ScoringWeights::default(), None).expect("fuse");
    assert_eq!(fused.results.len(), 1);
    assert_eq!(fused.results[0].candidate.id, "ok");
    let skipped: Vec<_> = fused.skipped.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(skipped, vec!["short", "zero"]);
}

#[test]
fn fusion_errors_when_present_signals_have_no_weight() {
    let ctx = QueryContext::text_only(Embedding::new(vec![1.0, 0.0]));
    let weights = ScoringWeights::new(1.0, 0.0, 0.0).expect("weights");
    let err = fuse(Vec::<Candidate>::new(), &ctx, &weights, None).unwrap_err();
    assert!(matches!(err, Error::InvalidWeights(_)));
}

#[test]
fn negative_similarity_is_clamped_to_zero() {
    let ctx = QueryContext::text_only(Embedding::new(vec![1.0, 0.0]));
    let c = candidate("opp", vec![-1.0, 0.0], serde_json::json!({}));
    let results = fuse(vec![c], &ctx, &ScoringWeights::default(), None).expect("fuse");
    assert!((results[0].text_score + 1.0).abs() < 1e-6);
    assert_eq!(results[0].final_score, 0.0);
}

#[test]
fn hard_filters_are_conjunctive() {
    let mk = |id: &str, score: f32, meta: serde_json::Value| ScoredResult {
        candidate: candidate(id, vec![1.0, 0.0], meta),
        image_score: 0.0,
        text_score: score,
        metadata_score: 0.0,
        final_score: score,
    };
    let results = vec![
        mk("a", 0.9, serde_json::json!({"color": "red", "width": 1600, "height": 900, "created_at": "2024-03-01T08:00:00Z"})),
        mk("b", 0.8, serde_json::json!({"color": "#ee1100", "orientation": "landscape", "created_at": "2024-06-15"})),
        mk("c", 0.7, serde_json::json!({"color": "red", "orientation": "portrait", "created_at": "2024-03-02"})),
        mk("d", 0.6, serde_json::json!({"color": "blue", "orientation": "landscape", "created_at": "2024-03-03"})),
        mk("e", 0.5, serde_json::json!({"color": "red", "orientation": "landscape"})),
    ];
    let criteria = FilterCriteria {
        min_score: None,
        color: Some(ColorBucket::Red),
        orientation: Some(Orientation::Landscape),
        date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
        date_to: NaiveDate::from_ymd_opt(2024, 6, 15),
    };
    let ids: Vec<_> = filter(results, &criteria).into_iter().map(|r| r.candidate.id).collect();
    // "e" has no created_at, so the date range does not apply to it.
    assert_eq!(ids, vec!["a", "b", "e"]);
}

#[test]
fn hard_filters_skip_absent_attributes_but_reject_bad_dates() {
    let mk = |id: &str, meta: serde_json::Value| ScoredResult {
        candidate: candidate(id, vec![1.0, 0.0], meta),
        image_score: 0.0,
        text_score: 0.5,
        metadata_score: 0.0,
        final_score: 0.5,
    };
    let results = || vec![mk("bad", serde_json::json!({"created_at": "garbage"})), mk("nodate", serde_json::json!({}))];
    let ids = |criteria: FilterCriteria| -> Vec<String> {
        filter(results(), &criteria).into_iter().map(|r| r.candidate.id).collect()
    };

    let dated = FilterCriteria { date_from: NaiveDate::from_ymd_opt(2024, 1, 1), ..Default::default() };
    assert_eq!(ids(dated), vec!["nodate"]);
    let red = FilterCriteria { color: Some(ColorBucket::Red), ..Default::default() };
    assert_eq!(ids(red), vec!["bad", "nodate"]);
    let landscape = FilterCriteria { orientation: Some(Orientation::Landscape), ..Default::default() };
    assert_eq!(ids(landscape), vec!["bad", "nodate"]);

    // Present but non-matching attributes are still rejected.
    let blue = mk("blue", serde_json::json!({"color": "blue", "width": 500, "height": 900}));
    let red_landscape = FilterCriteria {
        color: Some(ColorBucket::Red),
        orientation: Some(Orientation::Landscape),
        ..Default::default()
    };
    assert!(filter(vec![blue], &red_landscape).is_empty());
}

#[test]
fn empty_criteria_is_identity_then_sorted() {
    let results = vec![scored("b", 0.4), scored("c", 0.9), scored("a", 0.4)];
    let ranked = rank(results, &FilterCriteria::default(), 10);
    let ids: Vec<_> = ranked.iter().map(|r| r.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn rank_truncates_after_filtering() {
    let results = vec![scored("a", 0.95), scored("b", 0.2), scored("c", 0.8), scored("d", 0.6)];
    let criteria = FilterCriteria { min_score: Some(0.5), ..Default::default() };
    let ranked = rank(results, &criteria, 2);
    let ids: Vec<_> = ranked.iter().map(|r| r.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}
