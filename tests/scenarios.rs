
use pretty_assertions::assert_eq;
use rstest::rstest;

use ramus::*;

fn two_table_config() -> TAGEConfig {
    let mut cfg = TAGEConfig::new(TAGEBaseConfig {
        size: 16,
        ..Default::default()
    });
    for history_len in [4, 8] {
        cfg.add_component(TAGEComponentConfig {
            size: 64,
            history_len,
            ..Default::default()
        });
    }
    cfg
}

/// Predict and resolve a stream of branches, returning whether each
/// prediction was correct.
fn drive(p: &mut dyn BranchPredictor, stream: &[(usize, bool)]) -> Vec<bool> {
    stream.iter().map(|&(pc, taken)| {
        let predicted = p.predict(pc);
        p.resolve(pc, pc + 0x40, taken, BranchKind::DirectBranch);
        predicted == taken
    }).collect()
}

fn periodic(pc: usize, pattern: &str, n: usize) -> Vec<(usize, bool)> {
    let pattern = Outcome::vec_from_str(pattern);
    (0..n).map(|i| (pc, bool::from(pattern[i % pattern.len()]))).collect()
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(0xdead_beef)]
fn learns_period_five_pattern(#[case] seed: u64) {
    let mut cfg = two_table_config();
    cfg.seed = seed;
    let mut p = cfg.build().unwrap();

    let hits = drive(&mut p, &periodic(0x1000, "ttttn", 50));
    let correct = hits[30..].iter().filter(|h| **h).count();
    assert!(correct * 10 > 20 * 9, "only {}/20 correct", correct);
    assert!(p.stat.alcs > 0);
}

#[test]
fn all_invalid_falls_back_to_base() {
    let mut p = two_table_config().build().unwrap();
    for e in p.base.data.iter_mut() {
        e.set(7);
    }
    assert!(p.predict(0x1000));
    let ctx = p.context().unwrap();
    assert_eq!(ctx.provider, TAGEProvider::Base);
    assert_eq!(ctx.alt_provider, TAGEProvider::Base);
    assert_eq!(ctx.provider_outcome, Outcome::T);
}

#[test]
fn single_misprediction_allocates_one_entry() {
    let mut p = two_table_config().build().unwrap();
    assert!(!p.predict(0x1000));
    let ctx = p.context().unwrap().clone();

    // With empty history the hashes only depend on the address.
    assert_eq!(ctx.indices, vec![0, 0]);
    assert_eq!(ctx.tags, vec![0x04, 0x04]);

    p.resolve(0x1000, 0x1040, true, BranchKind::DirectBranch);
    assert_eq!(p.stat.alcs, 1);

    let valid: Vec<(usize, &TAGEEntry)> = p.comp.iter().enumerate()
        .flat_map(|(i, c)| c.data.iter().filter(|e| e.is_valid()).map(move |e| (i, e)))
        .collect();
    assert_eq!(valid.len(), 1);
    let (idx, entry) = valid[0];
    assert_eq!(entry, p.comp[idx].get_entry(ctx.indices[idx]));
    assert_eq!(entry.tag, Some(0x04));
    assert_eq!(entry.useful.value(), 0);
    assert_eq!(entry.predict(), Outcome::T);
}

#[test]
fn correct_prediction_does_not_allocate() {
    let mut p = two_table_config().build().unwrap();
    let hits = drive(&mut p, &periodic(0x1000, "n", 20));
    assert!(hits.iter().all(|h| *h));
    assert_eq!(p.stat.alcs, 0);
    assert_eq!(p.stat.failed_alcs, 0);
    assert_eq!(p.comp.iter().map(|c| c.num_valid_entries()).sum::<usize>(), 0);
    assert_eq!(p.stat.base_hits, 20);
}

#[test]
fn learns_loop_exit() {
    let mut cfg = TAGEConfig::new(TAGEBaseConfig {
        size: 64,
        ..Default::default()
    });
    for history_len in [4, 8, 16] {
        cfg.add_component(TAGEComponentConfig {
            size: 256,
            history_len,
            ..Default::default()
        });
    }
    let mut p = cfg.build().unwrap();

    // An inner loop branch with a trip count of seven, and the backwards
    // jump of the enclosing loop.
    let mut stream = Vec::new();
    for _ in 0..60 {
        for k in 0..7 {
            stream.push((0x1100, k < 6));
        }
        stream.push((0x1200, true));
    }
    let hits = drive(&mut p, &stream);
    let tail = &hits[hits.len() - 80..];
    assert!(tail.iter().all(|h| *h));
}

#[test]
fn neural_tage_learns_biased_branch() {
    let mut p = TAGEConfig::neural_tage().build().unwrap();
    let hits = drive(&mut p, &periodic(0x2000, "t", 100));
    assert!(hits[1..].iter().all(|h| *h));

    p.predict(0x2000);
    let ctx = p.context().unwrap();
    let vote = ctx.neural.unwrap();
    assert_eq!(vote.outcome(), Outcome::T);
    assert!(vote.is_confident(14));
    // The tables agree, so this is not an override.
    assert!(!ctx.is_neural_override());
    assert_eq!(p.stat.neural_overrides, 0);
}

#[test]
fn neural_overrides_are_counted() {
    let mut p = TAGEConfig::neural_tage().build().unwrap();
    let hits = drive(&mut p, &periodic(0x1000, "ttttn", 200));
    assert!(p.stat.neural_overrides > 0);
    assert!(p.stat.neural_override_hits <= p.stat.neural_overrides);
    assert_eq!(p.stat.clk, 200);
    assert_eq!(hits.len(), 200);
}

#[test]
fn presets_behind_trait_objects() {
    let mut preds: Vec<Box<dyn BranchPredictor>> = vec![
        Box::new(PredictorKind::Tage.preset().build().unwrap()),
        Box::new(PredictorKind::NeuralTage.preset().build().unwrap()),
    ];
    let names: Vec<&str> = preds.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["TAGE", "NeuralTAGE"]);
    for p in preds.iter_mut() {
        let hits = drive(p.as_mut(), &periodic(0x3000, "t", 10));
        assert!(hits[1..].iter().all(|h| *h));
    }
}

#[test]
fn orphan_resolve_is_tolerated() {
    let mut p = two_table_config().build().unwrap();
    p.resolve(0x1000, 0, true, BranchKind::DirectBranch);
    p.resolve(0x1000, 0, true, BranchKind::DirectBranch);
    assert_eq!(p.stat.orphan_resolves, 2);
    assert_eq!(p.stat.clk, 2);
    assert_eq!(p.stat.table_hits() + p.stat.table_miss(), 0);

    // Normal operation resumes.
    p.predict(0x1000);
    p.resolve(0x1000, 0, true, BranchKind::DirectBranch);
    assert_eq!(p.stat.table_hits() + p.stat.table_miss(), 1);
}

#[test]
fn json_config_builds() {
    let cfg = TAGEConfig::from_json(r#"{
        "base": { "size": 16 },
        "comp": [
            { "size": 64, "history_len": 4 },
            { "size": 64, "history_len": 8 }
        ],
        "seed": 7
    }"#).unwrap();
    assert_eq!(cfg.history_lengths(), vec![4, 8]);
    let mut p = cfg.build().unwrap();
    let hits = drive(&mut p, &periodic(0x1000, "ttttn", 50));
    assert!(hits[30..].iter().filter(|h| **h).count() >= 19);
}
