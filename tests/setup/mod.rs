//! Shared spec-test scaffolding.

use std::sync::Once;

use mathtex::{Interrupt, MathTex, MmlNode, TexError};

static INIT: Once = Once::new();

/// Initialize logging once for the whole test binary.
pub fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Run one named spec case.
pub fn it(description: &str, body: impl FnOnce()) {
    init();
    log::info!("it {description}");
    body();
}

/// A parser configured with the base package only.
pub fn mathtex() -> MathTex {
    MathTex::new(&["base"]).expect("base configures")
}

/// Parse `input` with a fresh base-only parser, expecting success.
pub fn parse_ok(input: &str) -> MmlNode {
    match mathtex().parse(input) {
        Ok(node) => node,
        Err(err) => panic!("expected {input:?} to parse, got {err}"),
    }
}

/// Parse `input` with a fresh base-only parser, expecting a failure.
pub fn parse_err(input: &str) -> TexError {
    match mathtex().parse(input) {
        Ok(node) => panic!("expected {input:?} to fail, got {node}"),
        Err(Interrupt::Error(err)) => err,
        Err(Interrupt::Retry(retry)) => panic!("expected {input:?} to fail, got retry {retry}"),
    }
}

/// The kinds of a node's children, in order.
pub fn child_kinds(node: &MmlNode) -> Vec<String> {
    node.children().iter().map(MmlNode::kind).collect()
}

/// The `text` content of a token node.
pub fn text_of(node: &MmlNode) -> String {
    node.get_property("text").map(|v| v.to_string()).unwrap_or_default()
}
