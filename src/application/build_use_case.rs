// ============================================================
// Layer 2 - BuildUseCase
// ============================================================
// Builds every PU task of a benchmark:
//
//   for topic in --task-topics         (e.g. D000328.D008875)
//     for lp in --task-sizes-lp        (e.g. 20 50 100)
//       for u in --task-sizes-u        (e.g. 100000)
//         query 2 × lp labeled positives (half go to valid/test)
//         split, write {out}/L{lp}_U{u}/{topic}/
//
// The requested pool size is 2 × u. The similarity query decides
// how many documents U really gets; a smaller pool is reported
// and recorded as U_target_size, never an error.
//
// One ChaCha8 stream seeded by --seed is threaded through every
// task in loop order, so the same flags rebuild the same bytes.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::corpus::{assemble_splits, CorpusBuilder};
use crate::domain::query::{Conjunction, MinimumShouldMatch};
use crate::domain::traits::SearchIndex;
use crate::infra::{corpus_store::CorpusStore, elastic::ElasticClient, mesh_map::MeshMap};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub es_url:               String,
    pub index_name:           String,
    pub scroll_lifetime:      String,
    pub output_path:          String,
    pub task_sizes_lp:        Vec<usize>,
    pub task_sizes_u:         Vec<usize>,
    pub mesh_map_path:        String,
    pub task_topics:          Vec<String>,
    pub minimum_should_match: String,
    pub seed:                 u64,
}

/// Task grid after parsing and validating the raw flags
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub conjunctions:         Vec<Conjunction>,
    pub lp_sizes:             Vec<usize>,
    pub u_sizes:              Vec<usize>,
    pub minimum_should_match: MinimumShouldMatch,
}

impl TaskPlan {
    pub fn from_config(cfg: &BuildConfig) -> Result<Self> {
        let conjunctions = cfg
            .task_topics
            .iter()
            .map(|t| Conjunction::parse_topic(t))
            .collect::<Result<Vec<_>, _>>()?;
        let minimum_should_match = cfg.minimum_should_match.parse()?;
        Ok(Self {
            conjunctions,
            lp_sizes: cfg.task_sizes_lp.clone(),
            u_sizes:  cfg.task_sizes_u.clone(),
            minimum_should_match,
        })
    }
}

pub struct BuildUseCase {
    config: BuildConfig,
}

impl BuildUseCase {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<PathBuf>> {
        let cfg  = &self.config;
        let plan = TaskPlan::from_config(cfg)?;
        let mesh = MeshMap::load(&cfg.mesh_map_path)?;

        let client = ElasticClient::new(&cfg.es_url, &cfg.index_name)
            .with_context(|| format!("Cannot connect to '{}'", cfg.es_url))?
            .with_scroll_lifetime(&cfg.scroll_lifetime);
        tracing::info!("Querying index '{}' at {}", client.index_name(), cfg.es_url);

        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        build_tasks(&client, &plan, &mesh, &CorpusStore::new(&cfg.output_path), &mut rng)
    }
}

/// Build and write every task of `plan`, returning the task directories
pub fn build_tasks<S, R>(
    index: &S,
    plan:  &TaskPlan,
    mesh:  &MeshMap,
    store: &CorpusStore,
    rng:   &mut R,
) -> Result<Vec<PathBuf>>
where
    S: SearchIndex + ?Sized,
    R: rand::Rng + ?Sized,
{
    let builder  = CorpusBuilder::new(index);
    let mut dirs = Vec::new();

    for conjunction in &plan.conjunctions {
        let names = mesh.names_for(conjunction)?;
        tracing::info!("Topic {} ({})", conjunction, names.join(", "));

        for &lp in &plan.lp_sizes {
            for &u in &plan.u_sizes {
                let task = builder
                    .build_pu_task(conjunction, 2 * lp, plan.minimum_should_match, rng)
                    .with_context(|| format!("Task L{lp}_U{u} for {conjunction}"))?;

                let u_target = 2 * u;
                if task.unlabeled.len() < u_target {
                    tracing::warn!(
                        "Unlabeled pool for {} has {} documents, {} requested",
                        conjunction,
                        task.unlabeled.len(),
                        u_target
                    );
                }

                let corpus = assemble_splits(task, conjunction, names.clone(), Some(u_target), rng)
                    .with_context(|| format!("Task L{lp}_U{u} for {conjunction}"))?;
                tracing::info!(
                    "L{}_U{}: precision={:.4} recall={:.4}",
                    lp, u, corpus.metadata.precision, corpus.metadata.recall
                );

                let dir = store.task_dir(lp, u, conjunction);
                store.write(&dir, &corpus)?;
                dirs.push(dir);
            }
        }
    }
    Ok(dirs)
}
