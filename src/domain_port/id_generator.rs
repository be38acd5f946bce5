/// Source of unpredictable, collision-resistant identifiers for session ids
/// and refresh-token ids. Must never be sequential.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}
