use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;

use devloop::fs::mock::MockFileSystem;
use devloop::watch::{is_hidden, WatchSet};
use devloop_test_utils::RecordingRegistry;

// Directory names: mostly plain, some hidden, from a small alphabet so that
// siblings collide and trees get some depth.
fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-c]{1,2}",
        1 => "\\.[a-c]{1,2}",
    ]
}

// Each tree is a list of relative directory paths below /proj.
fn tree_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(proptest::collection::vec(segment(), 1..5), 0..20)
}

fn build(tree: &[Vec<String>]) -> (MockFileSystem, Vec<PathBuf>) {
    let fs = MockFileSystem::new();
    fs.add_dir("/proj");
    let mut all = vec![PathBuf::from("/proj")];
    for segments in tree {
        let mut path = PathBuf::from("/proj");
        for seg in segments {
            path.push(seg);
            all.push(path.clone());
        }
        fs.add_dir(&path);
    }
    all.sort();
    all.dedup();
    (fs, all)
}

fn has_hidden_component(path: &Path) -> bool {
    path.ancestors().any(is_hidden)
}

proptest! {
    #[test]
    fn watched_set_is_exactly_the_visible_directories(tree in tree_strategy()) {
        let (fs, all) = build(&tree);
        let set = WatchSet::new(Box::new(RecordingRegistry::new()), Arc::new(fs), Vec::new());

        set.watch(Path::new("/proj")).unwrap();

        let expected: Vec<PathBuf> = all
            .into_iter()
            .filter(|p| !has_hidden_component(p))
            .collect();
        prop_assert_eq!(set.snapshot(), expected);
    }

    #[test]
    fn unwatch_leaves_no_descendants(tree in tree_strategy(), pick in any::<prop::sample::Index>()) {
        let (fs, _) = build(&tree);
        let set = WatchSet::new(Box::new(RecordingRegistry::new()), Arc::new(fs), Vec::new());
        set.watch(Path::new("/proj")).unwrap();

        let watched = set.snapshot();
        let target = pick.get(&watched).clone();
        let before = watched.len();

        let removed = set.unwatch(&target);

        prop_assert!(removed >= 1);
        prop_assert_eq!(set.len(), before - removed);
        prop_assert!(set.snapshot().iter().all(|p| !p.starts_with(&target)));
    }
}
