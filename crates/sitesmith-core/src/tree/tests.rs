//! Tests for the tree module.

use std::collections::HashSet;

use super::*;
use crate::models::{Step, StepStatus};

fn fold(steps: Vec<Step>) -> (FileTree, Vec<Step>, FoldReport) {
    let mut steps = steps;
    let mut tree = FileTree::new();
    let report = tree.apply_steps(&mut steps);
    (tree, steps, report)
}

fn assert_invariants(tree: &FileTree) {
    let mut seen = HashSet::new();
    for node in tree.walk() {
        assert!(seen.insert(node.path.clone()), "duplicate path {}", node.path);
    }

    for file in tree.files() {
        let segments: Vec<_> = file.relative_path().split('/').collect();
        let mut prefix = String::new();
        for segment in &segments[..segments.len() - 1] {
            prefix = format!("{prefix}/{segment}");
            let ancestor = tree
                .get(&prefix)
                .unwrap_or_else(|| panic!("missing ancestor {prefix} of {}", file.path));
            assert!(ancestor.is_folder(), "{prefix} should be a folder");
        }
    }
}

#[test]
fn test_single_file_creates_folder_chain() {
    let (tree, steps, report) = fold(vec![Step::create_file("src/App.tsx", "console.log(\"hi\")")]);

    assert_eq!(tree.roots().len(), 1);
    let src = &tree.roots()[0];
    assert_eq!(src.name, "src");
    assert_eq!(src.path, "/src");
    assert!(src.is_folder());

    let app = &src.children()[0];
    assert_eq!(app.name, "App.tsx");
    assert_eq!(app.path, "/src/App.tsx");
    assert_eq!(app.content(), Some("console.log(\"hi\")"));

    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(report.created, vec!["/src/App.tsx"]);
    assert!(report.tree_changed());
}

#[test]
fn test_later_step_for_same_path_wins() {
    let (mut tree, _, _) = fold(vec![Step::create_file("src/App.tsx", "first")]);

    let mut second = vec![Step::create_file("src/App.tsx", "second")];
    let report = tree.apply_steps(&mut second);

    assert_eq!(report.updated, vec!["/src/App.tsx"]);
    assert_eq!(tree.file_count(), 1);
    assert_eq!(tree.get("/src/App.tsx").unwrap().content(), Some("second"));
    assert_invariants(&tree);
}

#[test]
fn test_applying_same_step_twice_is_idempotent() {
    let step = Step::create_file("a/b/c.txt", "same");
    let (once, _, _) = fold(vec![step.clone()]);
    let (twice, _, report) = fold(vec![step.clone(), step]);

    assert_eq!(once, twice);
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.unchanged, vec!["/a/b/c.txt"]);
}

#[test]
fn test_invalid_path_rejects_only_that_step() {
    let (tree, steps, report) = fold(vec![
        Step::create_file("ok/one.txt", "1"),
        Step::create_file("", "nope"),
        Step::create_file("a//b", "nope"),
        Step::create_file("ok/two.txt", "2"),
    ]);

    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(steps[1].status, StepStatus::Error);
    assert_eq!(steps[2].status, StepStatus::Error);
    assert_eq!(steps[3].status, StepStatus::Completed);
    assert!(steps[1].error.as_deref().unwrap().contains("empty"));

    assert_eq!(report.rejected.len(), 2);
    assert!(matches!(
        report.rejected[0].error,
        crate::error::BuildError::InvalidPath { .. }
    ));
    assert_eq!(tree.file_count(), 2);
    assert_invariants(&tree);
}

#[test]
fn test_run_command_does_not_touch_tree() {
    let (tree, steps, report) = fold(vec![Step::run_command("npm install")]);

    assert!(tree.is_empty());
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(report.commands, vec![(0, "npm install".to_string())]);
    assert!(!report.tree_changed());
}

#[test]
fn test_completed_steps_are_not_reapplied() {
    let mut steps = vec![Step::create_file("a.txt", "v1")];
    let mut tree = FileTree::new();
    tree.apply_steps(&mut steps);

    // A later overwrite followed by a replay of the full history
    tree.upsert_file("a.txt", "v2").unwrap();
    let report = tree.apply_steps(&mut steps);

    assert!(report.is_empty());
    assert_eq!(tree.get("a.txt").unwrap().content(), Some("v2"));
}

#[test]
fn test_file_folder_collisions_are_rejected() {
    let (tree, steps, _) = fold(vec![
        Step::create_file("a", "file a"),
        Step::create_file("a/b.txt", "needs a as folder"),
        Step::create_file("c/d.txt", "d"),
        Step::create_file("c", "needs c as file"),
    ]);

    assert_eq!(
        steps.iter().map(|s| s.status).collect::<Vec<_>>(),
        vec![
            StepStatus::Completed,
            StepStatus::Error,
            StepStatus::Completed,
            StepStatus::Error
        ]
    );
    assert_eq!(tree.get("a").unwrap().content(), Some("file a"));
    assert!(tree.get("c").unwrap().is_folder());
    assert_invariants(&tree);
}

#[test]
fn test_invariants_hold_for_mixed_history() {
    let paths = [
        "package.json",
        "src/main.tsx",
        "src/App.tsx",
        "src/components/Button.tsx",
        "src/components/ui/Card.tsx",
        "public/index.html",
        "src/App.tsx",
        "src/components/Button.tsx",
        "x//y",
        "tsconfig.json",
    ];
    let steps = paths
        .iter()
        .enumerate()
        .map(|(i, p)| Step::create_file(*p, format!("content {i}")))
        .collect();
    let (tree, _, report) = fold(steps);

    assert_invariants(&tree);
    assert_eq!(tree.file_count(), 7);
    assert_eq!(tree.folder_count(), 4);
    assert_eq!(report.updated.len(), 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(
        tree.get("src/components/Button.tsx").unwrap().content(),
        Some("content 7")
    );
}

#[test]
fn test_walk_is_depth_first_preorder() {
    let (tree, _, _) = fold(vec![
        Step::create_file("a/x.txt", "x"),
        Step::create_file("b.txt", "b"),
        Step::create_file("a/y.txt", "y"),
    ]);
    let order: Vec<_> = tree.walk().map(|n| n.path.as_str()).collect();
    assert_eq!(order, vec!["/a", "/a/x.txt", "/a/y.txt", "/b.txt"]);
}
