use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use saltdag::dag::{FINGERPRINT_LEN, compute_salt, fingerprint};
use saltdag::errors::SaltdagError;
use saltdag::pipeline::{Download, Preprocess, Train, TrainParams};
use saltdag::target::MemoryStore;
use saltdag::task::Task;
use saltdag::types::{ParamKind, ParamValue, Params, Schema};
use saltdag_test_utils::builders::TestTaskBuilder;

fn leaf(store: &MemoryStore, name: &str, version: &str) -> Arc<dyn Task> {
    TestTaskBuilder::new("Leaf", store)
        .version(version)
        .param("name", name)
        .build()
}

fn root_over(store: &MemoryStore, deps: &[Arc<dyn Task>]) -> Arc<dyn Task> {
    let mut builder = TestTaskBuilder::new("Root", store).param("size", 3);
    for dep in deps {
        builder = builder.requires(dep);
    }
    builder.build()
}

#[test]
fn fingerprint_is_short_hex_and_deterministic() {
    let store = MemoryStore::new();
    let a = fingerprint(&root_over(&store, &[leaf(&store, "x", "1.0")])).unwrap();
    let b = fingerprint(&root_over(&store, &[leaf(&store, "x", "1.0")])).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn dependency_declaration_order_does_not_matter() {
    let store = MemoryStore::new();
    let x = leaf(&store, "x", "1.0");
    let y = leaf(&store, "y", "1.0");

    let forward = fingerprint(&root_over(&store, &[x.clone(), y.clone()])).unwrap();
    let backward = fingerprint(&root_over(&store, &[y, x])).unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn identity_params_change_fingerprint_partition_params_do_not() {
    let store = MemoryStore::new();
    let shard = |lower: i64, source: &str| {
        TestTaskBuilder::new("Shard", &store)
            .param("source", source)
            .partition("lower", lower)
            .build()
    };

    let base = fingerprint(&shard(0, "a")).unwrap();
    assert_eq!(base, fingerprint(&shard(10, "a")).unwrap());
    assert_ne!(base, fingerprint(&shard(0, "b")).unwrap());
}

#[test]
fn leaf_version_bump_changes_every_ancestor() {
    let store = MemoryStore::new();
    let chain = |version: &str| {
        let l = leaf(&store, "x", version);
        let mid = TestTaskBuilder::new("Mid", &store).requires(&l).build();
        let top = TestTaskBuilder::new("Top", &store).requires(&mid).build();
        (mid, top)
    };

    let (mid_a, top_a) = chain("1.0");
    let (mid_b, top_b) = chain("1.1");
    assert_ne!(fingerprint(&mid_a).unwrap(), fingerprint(&mid_b).unwrap());
    assert_ne!(fingerprint(&top_a).unwrap(), fingerprint(&top_b).unwrap());
}

#[test]
fn download_version_bump_propagates_to_train() {
    let data_dir = std::path::PathBuf::from("data");
    let download = |version: &str| Download {
        version: version.to_string(),
        source: "urls.txt".to_string(),
        lower: 0,
        upper: 10,
        data_dir: data_dir.clone(),
    };
    let train = |dl: Download| -> Arc<dyn Task> {
        Arc::new(Train {
            version: "0.1.0".to_string(),
            hyper: TrainParams {
                batch_size: Some(32),
                test_split: Some(0.2),
                num_classes: Some(10),
                lr: Some(0.001),
                seed: Some(42),
                epochs: Some(5),
            },
            input: Preprocess {
                version: "0.1.0".to_string(),
                image_shape: vec![64, 32, 32, 5],
                shards: vec![dl],
                data_dir: data_dir.clone(),
            },
            data_dir: data_dir.clone(),
        })
    };

    let dl_a: Arc<dyn Task> = Arc::new(download("1.0"));
    let dl_b: Arc<dyn Task> = Arc::new(download("1.1"));
    assert_ne!(fingerprint(&dl_a).unwrap(), fingerprint(&dl_b).unwrap());

    let train_a = fingerprint(&train(download("1.0"))).unwrap();
    let train_b = fingerprint(&train(download("1.1"))).unwrap();
    assert_ne!(train_a, train_b);
}

#[test]
fn set_and_map_values_are_order_insensitive() {
    let schema = Schema::new()
        .param("tags", ParamKind::Set)
        .param("opts", ParamKind::Map);

    let map = |pairs: &[(&str, i64)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
            .collect::<BTreeMap<_, _>>()
    };

    let a = Params::new()
        .with("tags", ParamValue::set(["b", "a"]))
        .with("opts", map(&[("y", 2), ("x", 1)]));
    let b = Params::new()
        .with("tags", ParamValue::set(["a", "b", "a"]))
        .with("opts", map(&[("x", 1), ("y", 2)]));

    assert_eq!(
        compute_salt("K", "1", &schema, &a, &[]).unwrap(),
        compute_salt("K", "1", &schema, &b, &[]).unwrap()
    );
}

#[test]
fn bad_params_fail_before_hashing() {
    let store = MemoryStore::new();

    let missing = TestTaskBuilder::new("T", &store)
        .declare_param("lr", ParamKind::Float)
        .build();
    let undeclared = TestTaskBuilder::new("T", &store).undeclared_param("x", 1).build();
    let non_finite = TestTaskBuilder::new("T", &store).param("lr", f64::NAN).build();
    let mistyped = TestTaskBuilder::new("T", &store)
        .declare_param("n", ParamKind::Int)
        .undeclared_param("n", "ten")
        .build();

    for task in [missing, undeclared, non_finite, mistyped] {
        let err = fingerprint(&task).unwrap_err();
        assert!(matches!(err, SaltdagError::InvalidParam { .. }), "got {err}");
        assert!(err.is_configuration());
    }
}

proptest! {
    #[test]
    fn dependency_order_invariance(
        names in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
        rotate in 0usize..6,
    ) {
        let store = MemoryStore::new();
        let deps: Vec<Arc<dyn Task>> = names.iter().map(|n| leaf(&store, n, "1.0")).collect();
        let mut shuffled = deps.clone();
        let len = shuffled.len();
        shuffled.rotate_left(rotate % len);
        shuffled.reverse();

        let a = fingerprint(&root_over(&store, &deps)).unwrap();
        let b = fingerprint(&root_over(&store, &shuffled)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn distinct_identity_values_give_distinct_salts(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        let schema = Schema::new().param("n", ParamKind::Int);
        let sa = compute_salt("K", "1", &schema, &Params::new().with("n", a), &[]).unwrap();
        let sb = compute_salt("K", "1", &schema, &Params::new().with("n", b), &[]).unwrap();
        prop_assert_ne!(sa, sb);
    }
}
