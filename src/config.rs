//! Pipeline configuration, threaded from the CLI into [`crate::pipeline`].

use typed_builder::TypedBuilder;

/// Behavior knobs for one run of the pipeline, independent of where they
/// came from (CLI flags today; nothing stops a future caller building
/// one directly).
#[derive(Debug, Clone, TypedBuilder)]
pub struct RunConfig {
    pub base: String,
    pub patched: String,
    pub output: String,
    #[builder(default = false)]
    pub verbose: bool,
    #[builder(default = false)]
    pub inventory: bool,
}
