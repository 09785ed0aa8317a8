//! Test utilities for engine testing.

#[cfg(test)]
pub mod utils {
    use crate::hardware::config::EngineConfig;
    use crate::hardware::engine::Engine;
    use crate::hardware::genome::Genome;
    use crate::hardware::inst_set::InstSet;
    use crate::hardware::loader::parse_genome;
    use std::sync::Arc;

    /// The full built-in catalog, nops first.
    pub fn builtin() -> Arc<InstSet> {
        Arc::new(InstSet::builtin())
    }

    /// Assembles a genome from whitespace-separated instruction names.
    pub fn genome(set: &InstSet, source: &str) -> Genome {
        parse_genome(set, source).expect("test genome must assemble")
    }

    /// Configuration loose enough for short hand-written genomes.
    pub fn small_config() -> EngineConfig {
        EngineConfig {
            min_genome_size: 1,
            max_threads: 4,
            ..EngineConfig::default()
        }
    }

    /// Engine over the built-in catalog with [`small_config`].
    pub fn engine_from(source: &str) -> Engine {
        engine_with(source, small_config())
    }

    pub fn engine_with(source: &str, config: EngineConfig) -> Engine {
        let set = builtin();
        let g = genome(&set, source);
        Engine::new(set, config, &g).expect("test engine must build")
    }
}
