use crate::capability::Capabilities;
use crate::containers::{NodeList, NodeMap, NodeSet, OptionalSlot, Slot};
use crate::engine::Deduplicator;
use crate::fingerprint::FingerprintBuilder;
use crate::rules::{Child, Decompose, Layout, Leaf, Map, Record, Registry, Sequence, Set, SlotKey};
use crate::{DedupError, Handle};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Name(String);

struct Pair {
    left: Slot<Name>,
    right: Slot<Name>,
    weight: u32,
}

struct Chain {
    label: Slot<Name>,
    next: OptionalSlot<Chain>,
}

struct Frozen {
    inner: Arc<Name>,
}

struct Broken;

struct BrokenRule;

impl Decompose for BrokenRule {
    fn target(&self) -> TypeId {
        TypeId::of::<Broken>()
    }

    fn type_name(&self) -> &'static str {
        "Broken"
    }

    fn layout(&self) -> Layout {
        Layout::Record
    }

    fn children(&self, _node: &dyn Any) -> Result<Vec<Child>, DedupError> {
        Err(DedupError::Decomposition {
            type_name: "Broken",
            reason: "always fails".to_string(),
        })
    }

    fn replace_child(&self, _node: &dyn Any, _slot: &SlotKey, _value: Handle) -> Result<(), DedupError> {
        unreachable!()
    }

    fn intrinsic(&self, _node: &dyn Any, _fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError> {
        Ok(())
    }
}

fn name(value: &str) -> Arc<Name> {
    Arc::new(Name(value.to_string()))
}

fn pair(left: &str, right: &str, weight: u32) -> Arc<Pair> {
    Arc::new(Pair {
        left: Slot::new(name(left)),
        right: Slot::new(name(right)),
        weight,
    })
}

fn chain(label: &str) -> Arc<Chain> {
    Arc::new(Chain {
        label: Slot::new(name(label)),
        next: OptionalSlot::empty(),
    })
}

fn registry(traverse_pairs: bool) -> Result<Arc<Registry>, DedupError> {
    let mut caps = Capabilities::new();
    caps.register_slot::<Pair, Name>("left", |p| &p.left)
        .register_slot::<Pair, Name>("right", |p| &p.right)
        .register_slot::<Chain, Name>("label", |c| &c.label)
        .register_optional_slot::<Chain, Chain>("next", |c| &c.next)
        .register_field::<Frozen, _>("inner", |f| Some(f.inner.clone() as Handle));

    let mut pair_rule = Record::<Pair>::builder(&caps, "Pair")
        .field("left")
        .field("right")
        .intrinsic(|p, fp| {
            fp.push(p.weight);
        });
    if traverse_pairs {
        pair_rule = pair_rule.traverse_only();
    }

    let mut registry = Registry::new();
    registry
        .register(Leaf::<Name>::new("Name", |n, fp| {
            fp.push(n.0.as_str());
        }))
        .register(pair_rule.build()?)
        .register(Record::<Chain>::builder(&caps, "Chain").field("label").field("next").build()?)
        .register(Record::<Frozen>::builder(&caps, "Frozen").field("inner").build()?)
        .register(Sequence::<Name>::new())
        .register(Sequence::<Pair>::new())
        .register(Set::<Name>::new())
        .register(Map::<String, Name>::new())
        .register(BrokenRule);
    Ok(Arc::new(registry))
}

fn deduplicator(max_recursion: u32) -> anyhow::Result<Deduplicator> {
    Ok(Deduplicator::new(registry(false)?, max_recursion))
}

#[test_log::test]
fn structurally_equal_records_share_one_instance() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let first = pair("a", "b", 1);
    let second = pair("a", "b", 1);

    let first_result = dedup.deduplicate_arc(first.clone());
    assert!(Arc::ptr_eq(&first_result, &first));
    assert_eq!(dedup.index().successful(), 0);

    let second_result = dedup.deduplicate_arc(second.clone());
    assert!(Arc::ptr_eq(&second_result, &first));
    // Both names and the pair itself.
    assert_eq!(dedup.index().successful(), 3);
    // The replaced pair still had its children rewritten before it was dropped.
    assert!(second.left.points_to(&first.left.load()));
    Ok(())
}

#[test_log::test]
fn intrinsic_values_distinguish_records() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let first = pair("a", "b", 1);
    let heavier = pair("a", "b", 2);

    dedup.deduplicate_arc(first.clone());
    let result = dedup.deduplicate_arc(heavier.clone());
    assert!(Arc::ptr_eq(&result, &heavier));
    assert!(heavier.left.points_to(&first.left.load()));
    assert_eq!(dedup.index().trims(), 1);
    Ok(())
}

#[test_log::test]
fn duplicate_children_within_one_node_are_merged() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let twins = pair("x", "x", 0);
    dedup.deduplicate_arc(twins.clone());

    assert!(twins.left.points_to(&twins.right.load()));
    assert_eq!(dedup.index().successful(), 1);
    assert_eq!(dedup.index().trims(), 1);
    Ok(())
}

#[test_log::test]
fn deduplicating_a_root_again_reports_only_the_root() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let first = pair("a", "b", 1);
    let second = pair("a", "b", 1);
    dedup.deduplicate_arc(first.clone());
    dedup.deduplicate_arc(second.clone());

    let successful = dedup.index().successful();
    let trims = dedup.index().trims();
    let registered = dedup.index().len();

    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(first.clone()), &first));
    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(second), &first));
    assert_eq!(dedup.index().successful(), successful + 1);
    assert_eq!(dedup.index().trims(), trims);
    assert_eq!(dedup.index().len(), registered);
    Ok(())
}

#[test_log::test]
fn deduplication_is_idempotent() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let pairs = Arc::new(NodeList::new(vec![pair("a", "b", 1), pair("a", "b", 1)]));
    dedup.deduplicate_arc(pairs.clone());

    let (first, second) = (pairs.get(0).unwrap(), pairs.get(1).unwrap());
    assert!(Arc::ptr_eq(&first, &second));
    let successful = dedup.index().successful();
    let trims = dedup.index().trims();
    let registered = dedup.index().len();
    assert!(successful > 0);

    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(pairs.clone()), &pairs));
    assert!(Arc::ptr_eq(&pairs.get(1).unwrap(), &first));
    assert_eq!(dedup.index().successful(), successful);
    assert_eq!(dedup.index().trims(), trims);
    assert_eq!(dedup.index().len(), registered);
    Ok(())
}

#[test_log::test]
fn equal_sequences_are_replaced_as_a_whole() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let first = Arc::new(NodeList::from_values(["A", "B", "C"].map(|s| Name(s.to_string()))));
    let second = Arc::new(NodeList::from_values(["A", "B", "C"].map(|s| Name(s.to_string()))));

    dedup.deduplicate_arc(first.clone());
    let before = dedup.index().successful();
    let result = dedup.deduplicate_arc(second.clone());

    assert!(Arc::ptr_eq(&result, &first));
    // Three elements and the list.
    assert_eq!(dedup.index().successful(), before + 4);
    for index in 0..3 {
        let (a, b) = (first.get(index), second.get(index));
        assert!(Arc::ptr_eq(a.as_ref().unwrap(), b.as_ref().unwrap()));
    }
    Ok(())
}

#[test_log::test]
fn sequences_over_shared_leaves_only_replace_the_container() -> anyhow::Result<()> {
    let mut dedup = deduplicator(10)?;
    let leaves = [name("A"), name("B"), name("C")];
    let first = Arc::new(NodeList::new(leaves.to_vec()));
    let second = Arc::new(NodeList::new(leaves.to_vec()));

    dedup.deduplicate_arc(first.clone());
    assert_eq!(dedup.index().successful(), 0);

    let result = dedup.deduplicate_arc(second);
    assert!(Arc::ptr_eq(&result, &first));
    assert_eq!(dedup.index().successful(), 1);
    assert_eq!(dedup.index().trims(), 0);
    Ok(())
}

#[test_log::test]
fn sequences_compare_positionally() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let first = Arc::new(NodeList::from_values(["A", "B"].map(|s| Name(s.to_string()))));
    let reversed = Arc::new(NodeList::from_values(["B", "A"].map(|s| Name(s.to_string()))));

    dedup.deduplicate_arc(first);
    let result = dedup.deduplicate_arc(reversed.clone());
    assert!(Arc::ptr_eq(&result, &reversed));
    Ok(())
}

#[test_log::test]
fn unordered_containers_ignore_insertion_order() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;

    let first_set = Arc::new(NodeSet::new(vec![name("x"), name("y"), name("z")]));
    let second_set = Arc::new(NodeSet::new(vec![name("z"), name("x"), name("y")]));
    dedup.deduplicate_arc(first_set.clone());
    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(second_set), &first_set));

    let first_map = Arc::new(NodeMap::from_values([
        ("north".to_string(), Name("x".to_string())),
        ("south".to_string(), Name("y".to_string())),
    ]));
    let second_map = Arc::new(NodeMap::from_values([
        ("south".to_string(), Name("y".to_string())),
        ("north".to_string(), Name("x".to_string())),
    ]));
    let swapped_map = Arc::new(NodeMap::from_values([
        ("north".to_string(), Name("y".to_string())),
        ("south".to_string(), Name("x".to_string())),
    ]));

    dedup.deduplicate_arc(first_map.clone());
    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(second_map), &first_map));
    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(swapped_map.clone()), &swapped_map));
    Ok(())
}

#[test_log::test]
fn set_members_collapse_onto_their_canonical_twin() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let shared = name("x");
    assert_eq!(NodeSet::new(vec![shared.clone(), shared.clone()]).len(), 1);

    let twins = Arc::new(NodeSet::new(vec![name("x"), name("x")]));
    dedup.deduplicate_arc(twins.clone());
    assert_eq!(twins.len(), 1);

    let single = Arc::new(NodeSet::new(vec![name("x")]));
    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(single), &twins));

    let pair_of_names = Arc::new(NodeSet::new(vec![name("x"), name("y")]));
    assert!(Arc::ptr_eq(&dedup.deduplicate_arc(pair_of_names.clone()), &pair_of_names));
    assert_eq!(pair_of_names.len(), 2);
    Ok(())
}

#[test_log::test]
fn cycles_terminate_and_stay_intact() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let a = chain("ring");
    let b = chain("ring");
    a.next.store(Some(b.clone()));
    b.next.store(Some(a.clone()));

    let result = dedup.deduplicate_arc(a.clone());
    assert!(Arc::ptr_eq(&result, &a));

    let next = a.next.load().unwrap();
    assert!(Arc::ptr_eq(&next, &b));
    assert!(Arc::ptr_eq(&next.next.load().unwrap(), &a));
    assert!(a.label.points_to(&b.label.load()));

    // Break the cycle so the test does not leak.
    a.next.store(None);
    Ok(())
}

#[test_log::test]
fn self_reference_is_preserved() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let node = chain("self");
    node.next.store(Some(node.clone()));

    let result = dedup.deduplicate_arc(node.clone());
    assert!(Arc::ptr_eq(&result, &node));
    assert!(Arc::ptr_eq(&node.next.load().unwrap(), &node));
    assert_eq!(dedup.index().successful(), 0);

    node.next.store(None);
    Ok(())
}

#[test_log::test]
fn nodes_beyond_the_depth_limit_are_left_alone() -> anyhow::Result<()> {
    let mut dedup = deduplicator(0)?;
    let first = chain("a");
    let second = chain("a");
    first.next.store(Some(chain("b")));
    second.next.store(Some(chain("b")));

    dedup.deduplicate_arc(first.clone());
    let result = dedup.deduplicate_arc(second.clone());

    assert!(Arc::ptr_eq(&result, &second));
    assert!(!second.label.points_to(&first.label.load()));
    assert_eq!(dedup.index().successful(), 0);
    assert_eq!(dedup.index().trims(), 0);
    Ok(())
}

#[test_log::test]
fn depth_limit_applies_per_level() -> anyhow::Result<()> {
    let mut dedup = deduplicator(1)?;
    let first = chain("a");
    let second = chain("a");
    first.next.store(Some(chain("b")));
    second.next.store(Some(chain("b")));

    dedup.deduplicate_arc(first.clone());
    dedup.deduplicate_arc(second.clone());

    // Depth 1 (labels and next) is processed, depth 2 (the label of next) is not.
    assert!(second.label.points_to(&first.label.load()));
    let (first_next, second_next) = (first.next.load().unwrap(), second.next.load().unwrap());
    assert!(!Arc::ptr_eq(&first_next, &second_next));
    assert!(!second_next.label.points_to(&first_next.label.load()));
    Ok(())
}

#[test_log::test]
fn unwritable_slots_keep_their_child() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let shared = name("value");
    let first = Arc::new(Frozen { inner: shared.clone() });
    let other = name("value");
    let second = Arc::new(Frozen { inner: other.clone() });

    dedup.deduplicate_arc(first.clone());
    let result = dedup.deduplicate_arc(second.clone());

    assert!(Arc::ptr_eq(&second.inner, &other));
    assert_eq!(dedup.index().failures(), 1);
    // Still structurally equal, so the node as a whole can be replaced.
    assert!(Arc::ptr_eq(&result, &first));
    Ok(())
}

#[test_log::test]
fn failing_rules_leave_the_node_unmodified() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let broken = Arc::new(Broken);

    let result = dedup.deduplicate_arc(broken.clone());
    assert!(Arc::ptr_eq(&result, &broken));
    assert_eq!(dedup.index().failures(), 1);
    assert!(dedup.index().is_empty());
    Ok(())
}

#[test_log::test]
fn traverse_only_keeps_identity_but_rewrites_children() -> anyhow::Result<()> {
    let mut dedup = Deduplicator::new(registry(true)?, 6);
    let first = pair("a", "b", 1);
    let second = pair("a", "b", 1);

    dedup.deduplicate_arc(first.clone());
    let result = dedup.deduplicate_arc(second.clone());

    assert!(Arc::ptr_eq(&result, &second));
    assert!(second.left.points_to(&first.left.load()));
    assert!(second.right.points_to(&first.right.load()));
    assert_eq!(dedup.index().successful(), 2);
    assert_eq!(dedup.index().trims(), 1);
    Ok(())
}

#[test_log::test]
fn types_without_rules_are_leaves() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let value = Arc::new(HashMap::<u8, u8>::new());

    let result = dedup.deduplicate_arc(value.clone());
    assert!(Arc::ptr_eq(&result, &value));
    assert!(dedup.index().is_empty());
    assert!(matches!(
        dedup.seed(value),
        Err(DedupError::UnsupportedType { .. })
    ));
    Ok(())
}

#[test_log::test]
fn seeded_nodes_become_canonical() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let seeded = name("a");
    dedup.seed(seeded.clone())?;

    let later = pair("a", "b", 1);
    dedup.deduplicate_arc(later.clone());
    assert!(later.left.points_to(&seeded));
    Ok(())
}

#[test_log::test]
fn seeding_equal_keys_is_not_a_replacement() -> anyhow::Result<()> {
    let mut dedup = deduplicator(6)?;
    let first = name("minecraft:stone");
    let second = name("minecraft:stone");

    dedup.seed(first.clone())?;
    let canonical = dedup.seed(second)?;
    assert!(Arc::ptr_eq(&canonical.downcast::<Name>().unwrap(), &first));
    assert_eq!(dedup.summary().full_replacements, 0);
    assert_eq!(dedup.summary().canonical_instances, 1);
    Ok(())
}
