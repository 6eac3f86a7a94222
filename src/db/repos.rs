pub mod activity;
pub mod clients;
pub mod history;
pub mod settings;

/// Attribution and retention for writes that leave an activity trail.
#[derive(Debug, Clone, Copy)]
pub struct Audit<'a> {
    pub actor: &'a str,
    /// Activity rows to keep after the write.
    pub keep: u32,
}
