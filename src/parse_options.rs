//! Per-run parser state.
//!
//! [`ParseOptions`] aggregates everything a parse needs: the dispatch
//! handlers, the item and node factories, the merged option tree, the tags
//! object, the deferred node lists consumed by postprocessors, and the frame
//! stack of nested sub-parses. It is created once per configured parser
//! instance; [`ParseOptions::clear`] resets only the ephemeral fields
//! between independent top-level parses, so handlers, factories and options
//! persist.

use crate::configuration::ParserConfiguration;
use crate::error::ParseResult;
use crate::map_handler::SubHandlers;
use crate::node::MmlNode;
use crate::node_factory::NodeFactory;
use crate::options::OptionList;
use crate::stack::StackItemFactory;
use crate::tags::Tags;
use crate::types::KeyMap;

/// Pre/postprocessor run once per completed top-level parse.
pub type ProcessorFn = fn(&mut ParseOptions) -> ParseResult<()>;

pub(crate) struct Processor {
    pub priority: i32,
    pub seq: usize,
    pub run: ProcessorFn,
}

/// The state bag for one configured parser instance.
#[derive(Default)]
pub struct ParseOptions {
    /// The merge engine that assembled this instance; consulted again for
    /// dynamic package loading.
    pub configuration: ParserConfiguration,
    /// Token dispatch, one scan list per handler type.
    pub handlers: SubHandlers,
    /// Stack-item constructors.
    pub item_factory: StackItemFactory,
    /// Output-node constructors.
    pub node_factory: NodeFactory,
    /// The merged option tree.
    pub options: OptionList,
    /// Equation numbering state.
    pub tags: Tags,
    /// Root of the last completed parse.
    pub root: Option<MmlNode>,
    /// Whether the last parse ended in an error.
    pub error: bool,
    node_lists: KeyMap<String, Vec<MmlNode>>,
    parsers: Vec<String>,
    pub(crate) preprocessors: Vec<Processor>,
    pub(crate) postprocessors: Vec<Processor>,
    processor_seq: usize,
}

impl ParseOptions {
    /// Record entry into a nested sub-parse. Frames unwind strictly LIFO.
    pub fn push_parser(&mut self, input: &str) {
        self.parsers.push(input.to_owned());
    }

    /// Record exit from the innermost sub-parse.
    pub fn pop_parser(&mut self) {
        self.parsers.pop();
    }

    /// Depth of the nested-parser stack (0 when idle).
    #[must_use]
    pub fn parser_depth(&self) -> usize {
        self.parsers.len()
    }

    /// Append `node` to the named deferred list. When the node's kind
    /// differs from the list name the node is stamped with the list name,
    /// so tree copies can re-join the lists they came from.
    pub fn add_node(&mut self, property: &str, node: &MmlNode) {
        if node.kind() != property {
            node.add_list(property);
        }
        self.node_lists
            .entry(property.to_owned())
            .or_default()
            .push(node.clone());
    }

    /// The named list, filtered down to nodes still attached to `root`.
    ///
    /// Nodes discarded mid-parse are dropped from the stored list
    /// permanently as a side effect; a later call never resurrects them
    /// even if the node is re-inserted somewhere else.
    pub fn get_list(&mut self, property: &str) -> Vec<MmlNode> {
        let Some(list) = self.node_lists.get_mut(property) else {
            return Vec::new();
        };
        if let Some(root) = &self.root {
            list.retain(|node| in_tree(node, root));
        }
        list.clone()
    }

    /// Remove the given nodes from the named list.
    pub fn remove_from_list(&mut self, property: &str, nodes: &[MmlNode]) {
        if let Some(list) = self.node_lists.get_mut(property) {
            list.retain(|node| !nodes.iter().any(|n| n.ptr_eq(node)));
        }
    }

    /// Register a preprocessor at the given priority.
    pub fn add_preprocessor(&mut self, priority: i32, run: ProcessorFn) {
        self.processor_seq += 1;
        self.preprocessors.push(Processor {
            priority,
            seq: self.processor_seq,
            run,
        });
    }

    /// Register a postprocessor at the given priority.
    pub fn add_postprocessor(&mut self, priority: i32, run: ProcessorFn) {
        self.processor_seq += 1;
        self.postprocessors.push(Processor {
            priority,
            seq: self.processor_seq,
            run,
        });
    }

    pub(crate) fn run_preprocessors(&mut self) -> ParseResult<()> {
        for run in sorted_runs(&mut self.preprocessors) {
            run(self)?;
        }
        Ok(())
    }

    pub(crate) fn run_postprocessors(&mut self) -> ParseResult<()> {
        for run in sorted_runs(&mut self.postprocessors) {
            run(self)?;
        }
        Ok(())
    }

    /// Reset the ephemeral per-parse fields for a fresh top-level parse.
    /// Handlers, factories, options and processors persist.
    pub fn clear(&mut self) {
        self.root = None;
        self.error = false;
        self.node_lists.clear();
        self.parsers.clear();
        self.tags.reset();
    }
}

fn sorted_runs(processors: &mut [Processor]) -> Vec<ProcessorFn> {
    processors.sort_by_key(|p| (p.priority, p.seq));
    processors.iter().map(|p| p.run).collect()
}

fn in_tree(node: &MmlNode, root: &MmlNode) -> bool {
    let mut current = node.clone();
    loop {
        if current.ptr_eq(root) {
            return true;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}
