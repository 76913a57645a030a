//! Tree building over generated shapes, and precondition handling.

use rstest::rstest;

use nestedset::domain::{verify_forest, DomainError, TreeBuilder};
use nestedset::util::testing;
use nestedset::{Category, ErrorKind, MemoryStore, NestedSetManager, NodeId, NodeInfo};

/// Full tree with `fanout` children per node down to `depth`, numbered in preorder.
fn generate(root_id: i64, fanout: usize, depth: u32, next_id: &mut i64) -> Vec<Category> {
    fn walk(rows: &mut Vec<Category>, root_id: i64, fanout: usize, depth: u32, level: u32, counter: &mut i64, next_id: &mut i64) {
        let position = rows.len();
        let left = *counter;
        *counter += 1;
        rows.push(Category::at(format!("n{}", *next_id), root_id, left, 0, level).with_id(*next_id));
        *next_id += 1;
        if level < depth {
            for _ in 0..fanout {
                walk(rows, root_id, fanout, depth, level + 1, counter, next_id);
            }
        }
        rows[position].right = *counter;
        *counter += 1;
    }

    let mut rows = Vec::new();
    let mut counter = 1;
    walk(&mut rows, root_id, fanout, depth, 0, &mut counter, next_id);
    rows
}

fn manager_for(rows: Vec<Category>) -> NestedSetManager<Category, MemoryStore<Category>> {
    testing::init_test_setup();
    let store = MemoryStore::new();
    store.seed(rows).unwrap();
    NestedSetManager::new(store)
}

#[rstest]
#[case(1, 5)]
#[case(2, 4)]
#[case(3, 3)]
#[case(5, 2)]
fn given_generated_tree_when_fetched_then_nested_set_properties_hold(#[case] fanout: usize, #[case] depth: u32) {
    let rows = generate(1, fanout, depth, &mut 1);
    let count = rows.len();
    let mut manager = manager_for(rows);

    let root = manager.fetch_tree(Some(1)).unwrap();

    let root_info = manager.info(root).unwrap().clone();
    assert_eq!(root_info.width(), 2 * count as i64);
    let descendants = manager.registry().linked_descendants(root, None).unwrap();
    assert_eq!(descendants.len(), count - 1);
    for &node in &descendants {
        let info = manager.info(node).unwrap();
        let parent = manager.registry().linked_parent(node).unwrap().unwrap();
        let parent_info = manager.info(parent).unwrap();
        assert!(info.left() < info.right());
        assert!(parent_info.left() < info.left() && info.right() < parent_info.right());
        assert_eq!(info.level(), parent_info.level() + 1);

        let children = manager.registry().linked_children(node).unwrap();
        for pair in children.windows(2) {
            let (a, b) = (manager.info(pair[0]).unwrap(), manager.info(pair[1]).unwrap());
            assert!(a.right() < b.left());
        }
        assert_eq!(children.is_empty(), info.is_leaf());
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
fn given_max_level_when_building_then_cut_off_nodes_unlinked(#[case] max_level: u32) {
    let mut manager = manager_for(generate(1, 2, 3, &mut 1));

    let list = manager.fetch_tree_as_list(Some(1), Some(max_level)).unwrap();
    manager.build_tree(&list, Some(max_level)).unwrap();

    assert_eq!(list.len(), (1 << (max_level + 1)) - 1);
    for &node in &list {
        let level = manager.info(node).unwrap().level();
        let children = manager.registry().linked_children(node);
        if level < max_level {
            assert_eq!(children.map(<[NodeId]>::len), Some(2));
        } else {
            assert!(children.is_none());
        }
    }
    // lazily resolvable below the cut-off
    let deepest = list[list.len() - 1];
    assert_eq!(manager.children(deepest).unwrap().len(), 2);
}

#[rstest]
fn given_forest_when_verifying_then_counts_every_tree() {
    let mut next_id = 1;
    let mut rows = generate(1, 2, 2, &mut next_id);
    rows.extend(generate(2, 3, 1, &mut next_id));
    let total = rows.len();
    let refs: Vec<&Category> = rows.iter().collect();

    let stats = verify_forest(&refs).unwrap();

    assert_eq!((stats.trees, stats.nodes), (2, total));
    let links = TreeBuilder::new().link(&refs).unwrap();
    assert_eq!(links.tops, vec![0, 7]);
}

#[rstest]
fn given_unsorted_list_when_building_then_rejected_without_partial_links() {
    let mut manager = manager_for(generate(1, 2, 2, &mut 1));
    let mut list = manager.fetch_tree_as_list(Some(1), None).unwrap();
    list.swap(1, 2);

    let err = manager.build_tree(&list, None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(list.iter().all(|&id| manager.registry().linked_children(id).is_none()));
}

#[rstest]
#[case::missing_id(vec![Category::at("root", 1, 1, 4, 0), Category::at("A", 1, 2, 3, 1).with_id(2)])]
#[case::bad_range(vec![Category::at("root", 1, 1, 4, 0).with_id(1), Category::at("A", 1, 3, 2, 1).with_id(2)])]
#[case::escapes_parent(vec![Category::at("root", 1, 1, 4, 0).with_id(1), Category::at("A", 1, 2, 5, 1).with_id(2)])]
#[case::wrong_level(vec![Category::at("root", 1, 1, 4, 0).with_id(1), Category::at("A", 1, 2, 3, 2).with_id(2)])]
#[case::duplicate_id(vec![Category::at("root", 1, 1, 4, 0).with_id(1), Category::at("A", 1, 2, 3, 1).with_id(1)])]
fn given_broken_rows_when_linking_then_integrity_error(#[case] rows: Vec<Category>) {
    let refs: Vec<&Category> = rows.iter().collect();

    let err = TreeBuilder::new().link(&refs).unwrap_err();

    assert!(err.is_integrity(), "{err:?} should be an integrity violation");
    assert!(!matches!(err, DomainError::InvalidOperation(_)));
}

#[rstest]
fn given_gap_in_ranges_when_verifying_then_width_mismatch() {
    let rows = [
        Category::at("root", 1, 1, 6, 0).with_id(1),
        Category::at("A", 1, 2, 3, 1).with_id(2),
    ];
    let refs: Vec<&Category> = rows.iter().collect();

    let err = verify_forest(&refs).unwrap_err();

    assert!(matches!(err, DomainError::WidthMismatch { id: 1, .. }));
}
