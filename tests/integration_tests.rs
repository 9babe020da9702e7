use cmap::{ConcurrentMap, ConcurrentMapBuilder, Error};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Animal {
    name: String,
}

fn animal(name: &str) -> Animal {
    Animal {
        name: name.to_string(),
    }
}

#[test]
fn test_new_map_is_empty() {
    let map: ConcurrentMap<Animal> = ConcurrentMap::new(64).unwrap();
    assert_eq!(map.count(), 0);
    assert!(map.is_empty());
}

#[test]
fn test_set_and_count() {
    let map = ConcurrentMap::new(64).unwrap();
    map.set("elephant", animal("elephant"));
    map.set("monkey", animal("monkey"));

    assert_eq!(map.count(), 2);
    assert!(!map.is_empty());
}

#[test]
fn test_get() {
    let map = ConcurrentMap::new(64).unwrap();
    assert!(map.get("money").is_none());

    map.set("elephant", animal("elephant"));
    assert_eq!(map.get("elephant").unwrap().name, "elephant");

    // Last write wins
    map.set("elephant", animal("mammoth"));
    assert_eq!(map.get("elephant").unwrap().name, "mammoth");
}

#[test]
fn test_has() {
    let map = ConcurrentMap::new(64).unwrap();
    assert!(!map.has("money"));

    map.set("elephant", animal("elephant"));
    assert!(map.has("elephant"));
}

#[test]
fn test_remove() {
    let map = ConcurrentMap::new(64).unwrap();
    map.set("monkey", animal("monkey"));

    map.remove("monkey");
    assert_eq!(map.count(), 0);
    assert!(map.get("monkey").is_none());

    // Removing a missing key is a no-op
    map.remove("noone");
    assert_eq!(map.count(), 0);
}

#[test]
fn test_pop() {
    let map = ConcurrentMap::new(64).unwrap();
    map.set("monkey", animal("monkey"));

    assert_eq!(*map.pop("monkey").unwrap(), animal("monkey"));
    assert!(map.pop("monkey").is_none());
    assert!(map.get("monkey").is_none());
    assert_eq!(map.count(), 0);
}

#[test]
fn test_count_after_removals() {
    let map = ConcurrentMap::new(64).unwrap();
    for i in 0..100 {
        map.set(i.to_string(), animal(&i.to_string()));
    }
    assert_eq!(map.count(), 100);

    for i in 0..30 {
        map.remove(&i.to_string());
    }
    assert_eq!(map.count(), 70);
    assert_eq!(map.len(), 70);
}

#[test]
fn test_set_if_absent() {
    let map = ConcurrentMap::new(64).unwrap();

    assert!(map.set_if_absent("elephant", animal("elephant")));
    assert!(!map.set_if_absent("elephant", animal("monkey")));
    assert_eq!(map.get("elephant").unwrap().name, "elephant");
}

#[test]
fn test_set_if_present() {
    let map = ConcurrentMap::new(64).unwrap();

    // Absent key never swaps
    assert!(!map.set_if_present("cage", animal("lion"), &animal("tiger")));
    assert!(!map.has("cage"));

    map.set("cage", animal("tiger"));
    assert!(!map.set_if_present("cage", animal("lion"), &animal("puma")));
    assert_eq!(map.get("cage").unwrap().name, "tiger");

    assert!(map.set_if_present("cage", animal("lion"), &animal("tiger")));
    assert_eq!(map.get("cage").unwrap().name, "lion");
}

#[test]
fn test_add_if_present_vec() {
    let map: ConcurrentMap<Vec<Animal>> = ConcurrentMap::new(64).unwrap();

    assert!(!map.add_if_present("marine", vec![animal("dolphin")]).unwrap());
    assert!(map.add_if_present("marine", vec![animal("whale")]).unwrap());

    assert_eq!(
        *map.get("marine").unwrap(),
        vec![animal("dolphin"), animal("whale")]
    );
}

#[test]
fn test_add_if_present_json() {
    let map = ConcurrentMap::new(64).unwrap();

    // Absent: stored as given, not wrapped
    assert!(!map.add_if_present("solo", json!("dolphin")).unwrap());
    assert_eq!(*map.get("solo").unwrap(), json!("dolphin"));

    // Present but not a sequence: explicit error, value untouched
    assert_eq!(
        map.add_if_present("solo", json!("whale")).unwrap_err(),
        Error::NotAppendable {
            key: "solo".to_string()
        }
    );
    assert_eq!(*map.get("solo").unwrap(), json!("dolphin"));

    map.set("pod", json!(["dolphin"]));
    assert!(map.add_if_present("pod", json!("whale")).unwrap());
    assert_eq!(*map.get("pod").unwrap(), json!(["dolphin", "whale"]));
}

#[test]
fn test_upsert() {
    let push = |current: Option<&Vec<Animal>>, new: Vec<Animal>| -> Vec<Animal> {
        match current {
            Some(existing) => existing.iter().cloned().chain(new).collect(),
            None => new,
        }
    };

    let map = ConcurrentMap::new(64).unwrap();
    map.set("marine", vec![animal("dolphin")]);
    map.upsert("marine", vec![animal("whale")], push);
    map.upsert("predator", vec![animal("tiger")], push);
    map.upsert("predator", vec![animal("lion")], push);

    assert_eq!(map.count(), 2);
    assert_eq!(
        *map.get("marine").unwrap(),
        vec![animal("dolphin"), animal("whale")]
    );
    assert_eq!(
        *map.get("predator").unwrap(),
        vec![animal("tiger"), animal("lion")]
    );
}

#[test]
fn test_upsert_calls_combine_once_even_when_absent() {
    let map: ConcurrentMap<i32> = ConcurrentMap::new(8).unwrap();
    let mut calls = 0;
    let mut saw_absent = false;

    let stored = map.upsert("fresh", 5, |current, new| {
        calls += 1;
        saw_absent = current.is_none();
        new * 2
    });

    assert_eq!(calls, 1);
    assert!(saw_absent);
    assert_eq!(*stored, 10);
    assert_eq!(*map.get("fresh").unwrap(), 10);
}

#[test]
fn test_update() {
    let map = ConcurrentMap::new(64).unwrap();

    assert!(!map.update("marine", animal("whale")));
    assert!(!map.has("marine"));

    map.set("marine", animal("dolphin"));
    assert!(map.update("marine", animal("whale")));
    assert_eq!(map.get("marine").unwrap().name, "whale");
}

#[test]
fn test_update_with() {
    let map: ConcurrentMap<Vec<String>> = ConcurrentMap::new(64).unwrap();
    let mut calls = 0;

    let acted = map.update_with("marine", vec!["whale".to_string()], |_, new| {
        calls += 1;
        new
    });
    assert!(!acted);
    assert_eq!(calls, 0);
    assert!(!map.has("marine"));

    map.set("marine", vec!["dolphin".to_string()]);
    let acted = map.update_with("marine", vec!["whale".to_string()], |current, new| {
        current.iter().cloned().chain(new).collect()
    });
    assert!(acted);
    assert_eq!(*map.get("marine").unwrap(), vec!["dolphin", "whale"]);
}

#[test]
fn test_mset() {
    let map = ConcurrentMap::new(64).unwrap();
    map.mset(vec![
        ("elephant", animal("elephant")),
        ("monkey", animal("monkey")),
    ]);

    assert_eq!(map.count(), 2);
    assert_eq!(map.get("monkey").unwrap().name, "monkey");
}

#[test]
fn test_keys() {
    let map = ConcurrentMap::new(64).unwrap();
    for i in 0..100 {
        map.set(i.to_string(), animal(&i.to_string()));
    }

    let mut keys = map.keys();
    assert_eq!(keys.len(), 100);
    keys.sort_by_key(|k| k.parse::<u32>().unwrap());
    let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_clear() {
    let map = ConcurrentMap::new(8).unwrap();
    for i in 0..50 {
        map.set(i.to_string(), i);
    }
    map.clear();
    assert!(map.is_empty());
}

#[test]
fn test_builder() {
    let map = ConcurrentMapBuilder::new()
        .shard_count(8)
        .unwrap()
        .build::<i32>()
        .unwrap();

    map.set("test", 42);
    assert_eq!(*map.get("test").unwrap(), 42);
    assert_eq!(map.shard_count(), 8);
}

#[test]
fn test_builder_invalid_shard_count() {
    assert_eq!(
        ConcurrentMapBuilder::new().shard_count(0).unwrap_err(),
        Error::InvalidShardCount
    );
    // Non powers of two are fine
    assert!(ConcurrentMapBuilder::new().shard_count(7).is_ok());
}

#[test]
fn test_arc_sharing() {
    let map = ConcurrentMap::new(4).unwrap();

    map.set("key", "value");
    let arc1 = map.get("key").unwrap();
    let arc2 = map.get("key").unwrap();

    assert!(Arc::ptr_eq(&arc1, &arc2));
}

#[cfg(feature = "metrics")]
#[test]
fn test_stats_count_operations_across_shards() {
    let map = ConcurrentMap::new(8).unwrap();
    for i in 0..10 {
        map.set(i.to_string(), i);
    }
    for i in 0..20 {
        map.get(&i.to_string());
    }
    for i in 0..5 {
        map.remove(&i.to_string());
    }
    map.remove("absent");
    assert!(map.pop("5").is_some());

    let stats = map.stats();
    let reads: u64 = stats.operations.iter().map(|op| op.reads).sum();
    let writes: u64 = stats.operations.iter().map(|op| op.writes).sum();
    let removes: u64 = stats.operations.iter().map(|op| op.removes).sum();
    assert_eq!((reads, writes, removes), (10, 10, 6));
    assert_eq!(stats.size, 4);
}
