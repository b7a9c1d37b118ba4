//! Randomized wrapper lifetime sequences
//!
//! Whatever mix of node creation, wrapping, releasing, tree surgery and
//! collection runs, a node never has more than one live wrapper handle and
//! no live handle points at a freed node.

use std::collections::HashMap;
use std::rc::Rc;

use arbor_dom::{Document, DocumentInit, DomError, EngineState, NodeId, WrapperId};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

const DEFAULT_WRAPPER_PROPTEST_CASES: u32 = 128;

fn wrapper_proptest_cases() -> u32 {
    std::env::var("ARBOR_WRAPPER_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_WRAPPER_PROPTEST_CASES)
}

#[derive(Clone, Debug)]
enum Action {
    Create,
    Wrap(usize),
    ReleaseWrapper(usize),
    Append(usize, usize),
    Remove(usize),
    Retain(usize),
    Collect,
    Open,
}

fn action_strategy() -> BoxedStrategy<Action> {
    prop_oneof![
        4 => Just(Action::Create),
        5 => any::<usize>().prop_map(Action::Wrap),
        4 => any::<usize>().prop_map(Action::ReleaseWrapper),
        4 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Action::Append(a, b)),
        3 => any::<usize>().prop_map(Action::Remove),
        1 => any::<usize>().prop_map(Action::Retain),
        2 => Just(Action::Collect),
        1 => Just(Action::Open),
    ]
    .boxed()
}

struct Model {
    doc: Document,
    nodes: Vec<NodeId>,
    handles: Vec<WrapperId>,
}

impl Model {
    fn new() -> Self {
        let doc = Document::new(Rc::new(EngineState::default()), DocumentInit::new());
        let nodes = doc.body().into_iter().collect();
        Self {
            doc,
            nodes,
            handles: Vec::new(),
        }
    }

    fn pick(&self, index: usize) -> Option<NodeId> {
        (!self.nodes.is_empty()).then(|| self.nodes[index % self.nodes.len()])
    }

    fn run(&mut self, action: &Action) {
        match *action {
            Action::Create => {
                if let Ok(id) = self.doc.create_element("div") {
                    self.nodes.push(id);
                }
            }
            Action::Wrap(i) => {
                if let Some(id) = self.pick(i) {
                    if let Ok(handle) = self.doc.wrapper_for(id) {
                        if !self.handles.contains(&handle) {
                            self.handles.push(handle);
                        }
                    }
                }
            }
            Action::ReleaseWrapper(i) => {
                if !self.handles.is_empty() {
                    let handle = self.handles[i % self.handles.len()];
                    self.doc.release_wrapper(handle);
                }
            }
            Action::Append(a, b) => {
                if let (Some(parent), Some(child)) = (self.pick(a), self.pick(b)) {
                    // Hierarchy errors and stale ids are expected here
                    let _ = self.doc.append_child(parent, child);
                }
            }
            Action::Remove(i) => {
                if let Some(id) = self.pick(i) {
                    if let Some(parent) = self.doc.tree().parent(id) {
                        let _ = self.doc.remove_child(parent, id);
                    }
                }
            }
            Action::Retain(i) => {
                if let Some(id) = self.pick(i) {
                    let _ = self.doc.retain(id);
                }
            }
            Action::Collect => {
                self.doc.collect_garbage();
            }
            Action::Open => {
                let _ = self.doc.open();
            }
        }
    }

    fn check(&self, step: usize, action: &Action) -> TestCaseResult {
        let mut live: HashMap<NodeId, Vec<WrapperId>> = HashMap::new();
        for &handle in &self.handles {
            match self.doc.node_for(handle) {
                Ok(node) => {
                    prop_assert!(
                        self.doc.is_alive(node),
                        "handle {handle:?} resolves to freed node after step {step}: {action:?}"
                    );
                    live.entry(node).or_default().push(handle);
                }
                Err(err) => prop_assert!(matches!(err, DomError::InvalidState(_))),
            }
        }
        for (node, handles) in &live {
            prop_assert_eq!(
                handles.len(),
                1,
                "node {} has several live wrappers after step {}: {:?}",
                node,
                step,
                action
            );
            prop_assert_eq!(self.doc.existing_wrapper(*node), Some(handles[0]));
        }
        prop_assert_eq!(self.doc.live_wrapper_count(), live.len());
        Ok(())
    }
}

fn assert_single_wrapper_per_node(actions: &[Action]) -> TestCaseResult {
    let mut model = Model::new();
    for (step, action) in actions.iter().enumerate() {
        model.run(action);
        model.check(step, action)?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: wrapper_proptest_cases(),
        .. ProptestConfig::default()
    })]

    #[test]
    fn at_most_one_live_wrapper_per_node(actions in vec(action_strategy(), 1..=40)) {
        assert_single_wrapper_per_node(&actions)?;
    }
}
