// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the four subcommands: `index`, `build`, `train` and
// `evaluate`, with all their configurable flags.
//
// clap's derive macros generate help text (--help), errors for
// missing args and string → number conversion.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    build_use_case::BuildConfig,
    evaluate_use_case::EvaluateConfig,
    index_use_case::IndexConfig,
    train_use_case::TrainConfig,
};
use crate::ml::loss::LossKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// (Re)create the PubMed index from JSONL or baseline XML dumps
    Index(IndexArgs),

    /// Build PU tasks (train/valid/test + metadata) from the index
    Build(BuildArgs),

    /// Train a PU classifier (nnPU by default)
    Train(TrainArgs),

    /// Score a split with a trained checkpoint
    Evaluate(EvaluateArgs),
}

/// Flags shared by every command that talks to Elasticsearch
#[derive(Args, Debug, Clone)]
pub struct EsArgs {
    /// Elasticsearch base URL
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = "http://localhost:9200")]
    pub es_url: String,

    /// Name of the PubMed index
    #[arg(long, default_value = "pubmed_index")]
    pub index_name: String,
}

// ─── index ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub es: EsArgs,

    /// Directory of *.jsonl, *.xml or *.xml.gz PubMed dumps
    #[arg(long, default_value = "data/pubmed")]
    pub dump_dir: String,
}

impl From<IndexArgs> for IndexConfig {
    fn from(a: IndexArgs) -> Self {
        IndexConfig {
            es_url:     a.es.es_url,
            index_name: a.es.index_name,
            dump_dir:   a.dump_dir,
        }
    }
}

// ─── build ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub es: EsArgs,

    /// Root directory for the generated tasks
    #[arg(long)]
    pub output_path: String,

    /// Labeled positive sizes; each task queries twice as many
    /// so valid and test get their share
    #[arg(long, num_args = 1.., default_values_t = [20, 50, 100])]
    pub task_sizes_lp: Vec<usize>,

    /// Unlabeled pool sizes; the requested pool is twice as large
    #[arg(long, num_args = 1.., default_values_t = [100000])]
    pub task_sizes_u: Vec<usize>,

    /// JSON object mapping MeSH ids to descriptor names
    #[arg(long)]
    pub mesh_map_path: String,

    /// Topics as period-separated MeSH ids, e.g. D000328.D008875
    #[arg(long, num_args = 1.., required = true)]
    pub task_topics: Vec<String>,

    /// Similarity threshold: a percentage (15%) or a term count (3)
    #[arg(long, default_value = "15%")]
    pub minimum_should_match: String,

    /// How long the engine keeps a scroll cursor alive between pages
    #[arg(long, default_value = "10m")]
    pub scroll_lifetime: String,

    /// Seed for every shuffle of the build
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl From<BuildArgs> for BuildConfig {
    fn from(a: BuildArgs) -> Self {
        BuildConfig {
            es_url:               a.es.es_url,
            index_name:           a.es.index_name,
            scroll_lifetime:      a.scroll_lifetime,
            output_path:          a.output_path,
            task_sizes_lp:        a.task_sizes_lp,
            task_sizes_u:         a.task_sizes_u,
            mesh_map_path:        a.mesh_map_path,
            task_topics:          a.task_topics,
            minimum_should_match: a.minimum_should_match,
            seed:                 a.seed,
        }
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training split: path?label=<field>[&size=N&limit=N&max_length=N&evaluation=bool]
    #[arg(long)]
    pub train: String,

    /// Validation split, same format as --train
    #[arg(long)]
    pub valid: String,

    /// Directory for weights, tokenizer, config and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Share of positives in the unlabeled pool. The PU losses read
    /// it from the task's metadata.json when omitted; pn uses it
    /// only to weight the classes
    #[arg(long)]
    pub prior: Option<f64>,

    /// Negative risk tolerated before the correction kicks in
    #[arg(long, default_value_t = 0.0)]
    pub beta: f64,

    /// Gradient scale of the correction step
    #[arg(long, default_value_t = 1.0)]
    pub gamma: f64,

    /// Training objective
    #[arg(long, value_enum, default_value_t = LossArg::Nnpu)]
    pub loss: LossArg,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// How many times the minority class may be replayed per chunk
    #[arg(long, default_value_t = 1)]
    pub cycle_limit: usize,

    /// Schedule the train split in chunks of this many instances
    #[arg(long)]
    pub max_instances_in_memory: Option<usize>,

    /// Cap on batch length × longest padded instance
    #[arg(long)]
    pub maximum_samples_per_batch: Option<usize>,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, default_value_t = 128)]
    pub d_embed: usize,

    #[arg(long, default_value_t = 128)]
    pub d_hidden: usize,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Upper bound on the word-level vocabulary, special tokens included
    #[arg(long, default_value_t = 30000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train:          a.train,
            valid:          a.valid,
            checkpoint_dir: a.checkpoint_dir,
            prior:          a.prior,
            loss:           a.loss.into(),
            beta:           a.beta,
            gamma:          a.gamma,
            batch_size:                a.batch_size,
            cycle_limit:               a.cycle_limit,
            max_instances_in_memory:   a.max_instances_in_memory,
            maximum_samples_per_batch: a.maximum_samples_per_batch,
            epochs:         a.epochs,
            lr:             a.lr,
            d_embed:        a.d_embed,
            d_hidden:       a.d_hidden,
            dropout:        a.dropout,
            vocab_size:     a.vocab_size,
            seed:           a.seed,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossArg {
    /// Non-negative PU risk
    Nnpu,
    /// Unbiased PU risk without the non-negativity correction
    Upu,
    /// Cross-entropy on the noisy labels, weighted [π, 1-π] when --prior is set
    Pn,
}

impl From<LossArg> for LossKind {
    fn from(a: LossArg) -> Self {
        match a {
            LossArg::Nnpu => LossKind::Nnpu,
            LossArg::Upu  => LossKind::Upu,
            LossArg::Pn   => LossKind::Pn,
        }
    }
}

// ─── evaluate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Split to score, same format as `train --train`
    #[arg(long)]
    pub split: String,

    /// Directory the model was trained into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            checkpoint_dir: a.checkpoint_dir,
            split:          a.split,
            batch_size:     a.batch_size,
        }
    }
}
