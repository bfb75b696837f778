#![no_main]

use cellhive_layout::{AncestorSpan, Axis, CellId, ChildrenMax, Edge, Hive, HiveConfig, length};
use libfuzzer_sys::fuzz_target;
use std::rc::Rc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let width = f64::from(data[0]) * 8.0;
    let height = f64::from(data[1]) * 8.0;
    let mut hive = Hive::with_config(HiveConfig::default().with_viewport(width, height));
    let mut cells: Vec<CellId> = vec![hive.root()];

    // Each op is 2 bytes: opcode, operand.
    for op in data[2..].chunks_exact(2) {
        let pick = |n: u8| cells[usize::from(n) % cells.len()];
        match op[0] % 5 {
            0 => {
                let parent = pick(op[1]);
                let percent = f64::from(op[1] % 101);
                if let Ok(cell) = hive.new_region(|b| {
                    b.x(length(0.0), Rc::new(AncestorSpan::percent(percent)))
                        .y(length(0.0), length(f64::from(op[1])))
                        .child_of(parent)
                        .finish()
                }) {
                    cells.push(cell);
                }
            }
            1 => {
                let parent = pick(op[1]);
                if let Ok(cell) = hive.new_region(|b| {
                    b.x(length(f64::from(op[1])), length(f64::from(op[1]) * 2.0))
                        .y(length(0.0), Rc::new(ChildrenMax::new()))
                        .child_of(parent)
                        .finish()
                }) {
                    cells.push(cell);
                }
            }
            2 => {
                let child = pick(op[1]);
                let parent = pick(op[1].rotate_left(3));
                // Rejected edits must leave the tree intact.
                let _ = hive.tree_mut().append_child(parent, child);
            }
            3 => {
                let child = pick(op[1]);
                if let Some(parent) = hive.tree().parent(child) {
                    let _ = hive.tree_mut().remove_child(parent, child);
                }
            }
            _ => {
                hive.set_viewport_size(f64::from(op[1]) * 4.0, height);
            }
        }
    }

    let _ = hive.layout();

    let tree = hive.tree();
    assert_eq!(tree.parent(hive.root()), None, "root was attached");
    for &cell in &cells {
        for &child in tree.children(cell) {
            assert_eq!(tree.parent(child), Some(cell), "dangling child link");
        }
        assert!(!tree.ancestors(cell).any(|a| a == cell), "tree cycle");
        // Tare tracks the parent's near edge.
        if let Some(parent) = tree.parent(cell) {
            for axis in [Axis::X, Axis::Y] {
                let near = tree.absolute_value(parent.coordinate(axis, Edge::Alpha));
                let tare = tree.coordinate(cell.coordinate(axis, Edge::Beta)).map(|c| c.tare());
                assert_eq!(tare, Some(near), "tare out of sync");
            }
        }
    }
});
