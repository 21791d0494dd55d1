//! Fuzz target for the layer merge engine.
//!
//! Each input string that parses as a JSON object becomes one layer.
//! Folding a prefix first and the rest onto it must give the same tree
//! as folding everything at once.

#![no_main]

use arbitrary::Arbitrary;
use envstack_config::merge::{fold_layers, fold_layers_with, strip_force_markers, StackResolver};
use envstack_config::tree::into_tree;
use envstack_config::Tree;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    layers: Vec<String>,
    split: u8,
}

fuzz_target!(|input: Input| {
    let layers: Vec<Tree> = input
        .layers
        .iter()
        .filter_map(|text| serde_json::from_str::<serde_json::Value>(text).ok())
        .filter_map(into_tree)
        .collect();
    let split = usize::from(input.split).min(layers.len());

    let whole = fold_layers(&layers);
    let prefix = fold_layers(&layers[..split]);
    let resumed = fold_layers_with(&StackResolver::default(), prefix, &layers[split..]);
    assert_eq!(whole, resumed);

    let _ = strip_force_markers(&whole);
});
