/// Tunables shared by every index's pipeline tasks, sourced from the
/// `search` section of configuration (§6).
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub bulk_indexing: bool,
    pub flush_interval_secs: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions { batch_size: 1000, bulk_indexing: true, flush_interval_secs: 5 }
    }
}
